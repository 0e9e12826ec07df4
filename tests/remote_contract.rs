//! Contract tests for the Alpha Vantage client wired into the gateway.
//!
//! A fake transport answers by `function` query parameter so the real
//! parsing, breaker and filter paths run end to end without a network.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use stockpulse_core::{
    AlphaVantageClient, CacheStore, CircuitState, FixedClock, FreshnessLabel, GatewayConfig,
    HttpClient, HttpError, HttpRequest, HttpResponse, InMemoryCacheStore, MarketDataClient,
    MarketDataGateway, RemoteError,
};
use time::macros::datetime;

const MOVERS: &str = r#"{
    "metadata": "Top gainers, losers, and most actively traded US tickers",
    "last_updated": "2024-03-05 16:15:59 US/Eastern",
    "top_gainers": [
        {"ticker": "SMCI", "price": "871.5", "change_amount": "97.1", "change_percentage": "12.54%", "volume": "13200000"},
        {"ticker": "TEST", "price": "3.1", "change_amount": "1.2", "change_percentage": "63.1%", "volume": "90000"},
        {"ticker": "WXYZ", "price": "n/a", "change_amount": "1.0", "change_percentage": "9%", "volume": "100"}
    ],
    "top_losers": [
        {"ticker": "PLUG", "price": "3.40", "change_amount": "-0.61", "change_percentage": "-15.21%", "volume": "41000000"},
        {"ticker": "GHOST", "price": "0", "change_amount": "-1.00", "change_percentage": "-100%", "volume": "500"}
    ],
    "most_actively_traded": [
        {"ticker": "TSLA", "price": "180.74", "change_amount": "-7.4", "change_percentage": "-3.93%", "volume": "119000000"}
    ]
}"#;

struct RoutedHttpClient {
    routes: HashMap<&'static str, Result<HttpResponse, HttpError>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl RoutedHttpClient {
    fn new() -> Self {
        Self {
            routes: HashMap::new(),
            requests: Mutex::new(Vec::new()),
        }
    }

    fn route(mut self, function: &'static str, response: Result<HttpResponse, HttpError>) -> Self {
        self.routes.insert(function, response);
        self
    }

    fn request_count(&self) -> usize {
        self.requests.lock().expect("request log lock").len()
    }

    fn last_request(&self) -> Option<HttpRequest> {
        self.requests.lock().expect("request log lock").last().cloned()
    }
}

impl HttpClient for RoutedHttpClient {
    fn execute<'a>(
        &'a self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
        let response = request
            .query_value("function")
            .and_then(|function| self.routes.get(function).cloned())
            .unwrap_or_else(|| Err(HttpError::new("no route")));
        self.requests.lock().expect("request log lock").push(request);
        Box::pin(async move { response })
    }
}

struct Wiring {
    gateway: MarketDataGateway,
    client: Arc<AlphaVantageClient>,
    http: Arc<RoutedHttpClient>,
    cache: Arc<InMemoryCacheStore>,
}

fn wire(http: RoutedHttpClient) -> Wiring {
    let http = Arc::new(http);
    let client = Arc::new(AlphaVantageClient::new(http.clone()));
    let cache = Arc::new(InMemoryCacheStore::new());
    let gateway = MarketDataGateway::new(
        client.clone(),
        cache.clone(),
        GatewayConfig::default().with_api_key("secret-key"),
    )
    .with_clock(Arc::new(FixedClock::new(datetime!(2024-03-05 21:20 UTC))));
    Wiring {
        gateway,
        client,
        http,
        cache,
    }
}

#[tokio::test]
async fn movers_payload_is_parsed_filtered_and_cached() {
    // Given: a movers payload with string numbers, a placeholder and broken rows
    let wiring = wire(RoutedHttpClient::new().route(
        "TOP_GAINERS_LOSERS",
        Ok(HttpResponse::ok_json(MOVERS)),
    ));

    // When
    let snapshot = wiring.gateway.get_snapshot(false).await;

    // Then: only real, priced, traded tickers survive
    assert_eq!(snapshot.freshness, FreshnessLabel::Live);
    let tickers = snapshot
        .quotes()
        .map(|quote| quote.ticker.as_str().to_owned())
        .collect::<Vec<_>>();
    assert_eq!(tickers, ["SMCI", "PLUG", "TSLA"]);
    assert_eq!(snapshot.gainers[0].change_percent, 12.54);
    assert_eq!(snapshot.most_active[0].volume, 119_000_000);
    assert_eq!(wiring.cache.count().await.expect("count"), 3);

    // And: the request carried the key without leaking it into logs
    let request = wiring.http.last_request().expect("one request");
    assert_eq!(request.query_value("apikey"), Some("secret-key"));
    assert!(!request.redacted_url().contains("secret-key"));
}

#[tokio::test]
async fn throttling_notice_falls_back_without_tripping_the_breaker() {
    // Given: the provider answers 200 with a rate-limit note
    let note = r#"{"Note": "Thank you for using Alpha Vantage! Our standard API rate limit is 25 requests per day."}"#;
    let wiring = wire(RoutedHttpClient::new().route("TOP_GAINERS_LOSERS", Ok(HttpResponse::ok_json(note))));

    // When
    let direct = wiring.client.fetch_rankings("secret-key").await;
    let snapshot = wiring.gateway.get_snapshot(false).await;

    // Then
    assert!(matches!(direct, Err(RemoteError::RateLimited(_))));
    assert_eq!(snapshot.freshness, FreshnessLabel::Simulated);
    assert_eq!(wiring.client.circuit_state(), CircuitState::Closed);
}

#[tokio::test]
async fn repeated_transport_failures_open_the_circuit() {
    // Given: a transport that always fails
    let wiring = wire(RoutedHttpClient::new());

    // When: four snapshot refreshes run
    for _ in 0..4 {
        let snapshot = wiring.gateway.get_snapshot(true).await;
        assert!(!snapshot.is_empty());
    }

    // Then: the fourth was rejected locally and never hit the transport
    assert_eq!(wiring.client.circuit_state(), CircuitState::Open);
    assert_eq!(wiring.http.request_count(), 3);
}

#[tokio::test]
async fn overview_with_none_fields_passes_through_gateway() {
    // Given
    let body = r#"{
        "Symbol": "IBM",
        "Name": "International Business Machines",
        "Description": "Technology and consulting.",
        "Sector": "TECHNOLOGY",
        "Industry": "COMPUTER & OFFICE EQUIPMENT",
        "MarketCapitalization": "166000000000",
        "52WeekHigh": "199.18",
        "52WeekLow": "129.18",
        "PERatio": "None",
        "DividendYield": "-",
        "EPS": "8.14",
        "RevenuePerShareTTM": "67.97"
    }"#;
    let wiring = wire(RoutedHttpClient::new().route("OVERVIEW", Ok(HttpResponse::ok_json(body))));

    // When
    let overview = wiring
        .gateway
        .get_company_overview("IBM")
        .await
        .expect("overview");

    // Then
    assert_eq!(overview.name, "International Business Machines");
    assert_eq!(overview.market_cap, Some(166_000_000_000.0));
    assert_eq!(overview.pe_ratio, None);
    assert_eq!(overview.dividend_yield, None);
    assert_eq!(overview.eps, Some(8.14));
}

#[tokio::test]
async fn unknown_symbol_quote_surfaces_not_found() {
    // Given
    let body = r#"{"Error Message": "Invalid API call. Please retry or visit the documentation."}"#;
    let wiring = wire(RoutedHttpClient::new().route("GLOBAL_QUOTE", Ok(HttpResponse::ok_json(body))));

    // When
    let result = wiring.gateway.get_single_quote("QWERT").await;

    // Then: no simulated quote stands in
    assert!(matches!(
        result,
        Err(stockpulse_core::GatewayError::Remote(RemoteError::NotFound(_)))
    ));
    assert_eq!(wiring.client.circuit_state(), CircuitState::Closed);
}

#[tokio::test]
async fn daily_history_feeds_the_series_path() {
    // Given: 35 trading days in provider order (newest first)
    let mut entries = Vec::new();
    let mut day = time::macros::date!(2024 - 01 - 01);
    for index in 0..35 {
        entries.push(format!(
            r#""{day}": {{"1. open": "1", "2. high": "1", "3. low": "1", "4. close": "{close}", "5. volume": "1000"}}"#,
            close = 50 + index
        ));
        day = day.next_day().expect("next day");
    }
    entries.reverse();
    let body = format!(
        r#"{{"Meta Data": {{"2. Symbol": "IBM"}}, "Time Series (Daily)": {{{}}}}}"#,
        entries.join(",")
    );
    let wiring = wire(RoutedHttpClient::new().route("TIME_SERIES_DAILY", Ok(HttpResponse::ok_json(body))));

    // When
    let series = wiring
        .gateway
        .get_daily_series("IBM")
        .await
        .expect("series");

    // Then: the newest thirty closes, oldest first
    assert_eq!(series.points().len(), 30);
    assert_eq!(series.points()[0].price, 55.0);
    assert_eq!(series.last().price, 84.0);
    assert_eq!(series.last().date, time::macros::date!(2024 - 02 - 04));
}
