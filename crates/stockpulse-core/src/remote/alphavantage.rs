use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::circuit_breaker::{CallOutcome, CircuitBreaker, CircuitState};
use crate::domain::parse_date;
use crate::http_client::{HttpClient, HttpRequest, ReqwestHttpClient};
use crate::remote::{
    DailyBar, DailySeries, MarketDataClient, RemoteFuture, RemoteQuote, RemoteRankings,
};
use crate::throttling::RateBudget;
use crate::{CompanyOverview, RemoteError};

pub const ALPHAVANTAGE_BASE_URL: &str = "https://www.alphavantage.co/query";

/// Body keys Alpha Vantage uses for throttling notices on a 200 response.
const NOTICE_KEYS: &[&str] = &["Note", "Information"];
const ERROR_KEY: &str = "Error Message";

/// Alpha Vantage REST client.
///
/// One circuit breaker and one rate budget are shared by all four endpoints
/// and by every clone of the client.
#[derive(Clone)]
pub struct AlphaVantageClient {
    http_client: Arc<dyn HttpClient>,
    base_url: String,
    timeout_ms: u64,
    circuit_breaker: Arc<CircuitBreaker>,
    budget: RateBudget,
}

impl Default for AlphaVantageClient {
    fn default() -> Self {
        Self::new(Arc::new(ReqwestHttpClient::default()))
    }
}

impl AlphaVantageClient {
    pub fn new(http_client: Arc<dyn HttpClient>) -> Self {
        Self {
            http_client,
            base_url: String::from(ALPHAVANTAGE_BASE_URL),
            timeout_ms: 10_000,
            circuit_breaker: Arc::new(CircuitBreaker::default()),
            budget: RateBudget::alphavantage_free_tier(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn with_circuit_breaker(mut self, circuit_breaker: Arc<CircuitBreaker>) -> Self {
        self.circuit_breaker = circuit_breaker;
        self
    }

    pub fn with_rate_budget(mut self, budget: RateBudget) -> Self {
        self.budget = budget;
        self
    }

    pub fn circuit_state(&self) -> CircuitState {
        self.circuit_breaker.state()
    }

    /// Issue one query under the circuit breaker and the request budget.
    async fn query(
        &self,
        function: &'static str,
        symbol: Option<&str>,
        api_key: &str,
    ) -> Result<Map<String, Value>, RemoteError> {
        if api_key.trim().is_empty() {
            return Err(RemoteError::MissingApiKey);
        }

        let permit = self.circuit_breaker.permit()?;
        if let Err(wait) = self.budget.acquire() {
            permit.release();
            return Err(RemoteError::RateLimited(format!(
                "local request budget exhausted; next slot in {:.1}s",
                wait.as_secs_f64()
            )));
        }

        let result = self.exchange(function, symbol, api_key).await;
        permit.settle(call_outcome(&result));
        result
    }

    /// Send the request and classify the response body.
    ///
    /// Alpha Vantage reports throttling, unknown symbols and empty results
    /// inside 200 responses, so the body is inspected before decoding.
    async fn exchange(
        &self,
        function: &'static str,
        symbol: Option<&str>,
        api_key: &str,
    ) -> Result<Map<String, Value>, RemoteError> {
        let mut request = HttpRequest::get(&self.base_url)
            .with_query("function", function)
            .with_timeout_ms(self.timeout_ms);
        if let Some(symbol) = symbol {
            request = request.with_query("symbol", symbol);
        }
        let request = request.with_query("apikey", api_key);
        tracing::debug!(url = %request.redacted_url(), "alphavantage request");

        let response = self.http_client.execute(request).await.map_err(|error| {
            if error.is_timeout() {
                RemoteError::Timeout {
                    timeout_ms: self.timeout_ms,
                }
            } else {
                RemoteError::Transport(error.message().to_owned())
            }
        })?;

        if !response.is_success() {
            return Err(RemoteError::Status {
                status: response.status,
            });
        }

        let body: Value = serde_json::from_str(&response.body).map_err(|error| {
            RemoteError::Malformed(format!("{function} body is not JSON: {error}"))
        })?;
        let Value::Object(object) = body else {
            return Err(RemoteError::Malformed(format!(
                "{function} body is not a JSON object"
            )));
        };

        if let Some(notice) = NOTICE_KEYS.iter().find_map(|key| object.get(*key)) {
            tracing::warn!(function, "alphavantage throttling notice");
            return Err(RemoteError::RateLimited(text_of(notice)));
        }
        if let Some(message) = object.get(ERROR_KEY) {
            return Err(RemoteError::NotFound(text_of(message)));
        }
        if object.is_empty() {
            return Err(RemoteError::Empty);
        }

        Ok(object)
    }

    async fn rankings(&self, api_key: &str) -> Result<RemoteRankings, RemoteError> {
        let body = self.query("TOP_GAINERS_LOSERS", None, api_key).await?;
        let response: TopMoversResponse = decode(body, "TOP_GAINERS_LOSERS")?;

        let rankings = RemoteRankings {
            gainers: mover_rows(&response.top_gainers),
            losers: mover_rows(&response.top_losers),
            most_active: mover_rows(&response.most_actively_traded),
            last_updated: response.last_updated,
        };
        let dropped = response.top_gainers.len()
            + response.top_losers.len()
            + response.most_actively_traded.len()
            - rankings.total_len();
        if dropped > 0 {
            tracing::debug!(dropped, "dropped unparsable ranking rows");
        }
        Ok(rankings)
    }

    async fn quote(&self, symbol: &str, api_key: &str) -> Result<RemoteQuote, RemoteError> {
        let body = self.query("GLOBAL_QUOTE", Some(symbol), api_key).await?;
        let response: GlobalQuoteResponse = decode(body, "GLOBAL_QUOTE")?;

        let row = response
            .quote
            .filter(|row| !row.is_empty())
            .ok_or_else(|| RemoteError::NotFound(format!("no quote for '{symbol}'")))?;

        let field = |name: &str| {
            row.get(name).and_then(lenient_number).ok_or_else(|| {
                RemoteError::Malformed(format!("GLOBAL_QUOTE field '{name}' missing or invalid"))
            })
        };

        Ok(RemoteQuote {
            symbol: row
                .get("01. symbol")
                .map(text_of)
                .unwrap_or_else(|| symbol.to_owned()),
            price: field("05. price")?,
            change_amount: field("09. change")?,
            change_percent: field("10. change percent")?,
            volume: volume_of(field("06. volume")?),
        })
    }

    async fn overview(&self, symbol: &str, api_key: &str) -> Result<CompanyOverview, RemoteError> {
        let body = self.query("OVERVIEW", Some(symbol), api_key).await?;
        let response: OverviewResponse = decode(body, "OVERVIEW")?;

        Ok(CompanyOverview {
            symbol: if response.symbol.is_empty() {
                symbol.to_owned()
            } else {
                response.symbol
            },
            name: response.name,
            description: response.description,
            sector: response.sector,
            industry: response.industry,
            market_cap: optional_number(&response.market_cap),
            week_52_high: optional_number(&response.week_52_high),
            week_52_low: optional_number(&response.week_52_low),
            pe_ratio: optional_number(&response.pe_ratio),
            dividend_yield: optional_number(&response.dividend_yield),
            eps: optional_number(&response.eps),
            revenue_per_share: optional_number(&response.revenue_per_share),
        })
    }

    async fn daily_series(&self, symbol: &str, api_key: &str) -> Result<DailySeries, RemoteError> {
        let body = self.query("TIME_SERIES_DAILY", Some(symbol), api_key).await?;

        let series = body
            .iter()
            .find(|(key, _)| key.starts_with("Time Series"))
            .and_then(|(_, value)| value.as_object())
            .ok_or_else(|| {
                RemoteError::Malformed(String::from("TIME_SERIES_DAILY has no time series"))
            })?;

        let bars: DailySeries = series
            .iter()
            .filter_map(|(date, bar)| Some((parse_date(date)?, daily_bar(bar)?)))
            .collect::<BTreeMap<_, _>>();

        if bars.is_empty() {
            return Err(RemoteError::Empty);
        }
        Ok(bars)
    }
}

impl MarketDataClient for AlphaVantageClient {
    fn fetch_rankings<'a>(&'a self, api_key: &'a str) -> RemoteFuture<'a, RemoteRankings> {
        Box::pin(self.rankings(api_key))
    }

    fn fetch_quote<'a>(
        &'a self,
        symbol: &'a str,
        api_key: &'a str,
    ) -> RemoteFuture<'a, RemoteQuote> {
        Box::pin(self.quote(symbol, api_key))
    }

    fn fetch_overview<'a>(
        &'a self,
        symbol: &'a str,
        api_key: &'a str,
    ) -> RemoteFuture<'a, CompanyOverview> {
        Box::pin(self.overview(symbol, api_key))
    }

    fn fetch_daily_series<'a>(
        &'a self,
        symbol: &'a str,
        api_key: &'a str,
    ) -> RemoteFuture<'a, DailySeries> {
        Box::pin(self.daily_series(symbol, api_key))
    }
}

#[derive(Debug, Deserialize)]
struct TopMoversResponse {
    #[serde(default)]
    last_updated: Option<String>,
    #[serde(default)]
    top_gainers: Vec<Value>,
    #[serde(default)]
    top_losers: Vec<Value>,
    #[serde(default)]
    most_actively_traded: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct GlobalQuoteResponse {
    #[serde(rename = "Global Quote", default)]
    quote: Option<Map<String, Value>>,
}

#[derive(Debug, Deserialize)]
struct OverviewResponse {
    #[serde(rename = "Symbol", default)]
    symbol: String,
    #[serde(rename = "Name", default)]
    name: String,
    #[serde(rename = "Description", default)]
    description: String,
    #[serde(rename = "Sector", default)]
    sector: String,
    #[serde(rename = "Industry", default)]
    industry: String,
    #[serde(rename = "MarketCapitalization", default)]
    market_cap: Option<Value>,
    #[serde(rename = "52WeekHigh", default)]
    week_52_high: Option<Value>,
    #[serde(rename = "52WeekLow", default)]
    week_52_low: Option<Value>,
    #[serde(rename = "PERatio", default)]
    pe_ratio: Option<Value>,
    #[serde(rename = "DividendYield", default)]
    dividend_yield: Option<Value>,
    #[serde(rename = "EPS", default)]
    eps: Option<Value>,
    #[serde(rename = "RevenuePerShareTTM", default)]
    revenue_per_share: Option<Value>,
}

fn decode<T>(body: Map<String, Value>, function: &str) -> Result<T, RemoteError>
where
    T: for<'de> Deserialize<'de>,
{
    serde_json::from_value(Value::Object(body))
        .map_err(|error| RemoteError::Malformed(format!("{function}: {error}")))
}

fn mover_rows(rows: &[Value]) -> Vec<RemoteQuote> {
    rows.iter().filter_map(mover_row).collect()
}

fn mover_row(row: &Value) -> Option<RemoteQuote> {
    let number = |name: &str| row.get(name).and_then(lenient_number);
    Some(RemoteQuote {
        symbol: row.get("ticker")?.as_str()?.to_owned(),
        price: number("price")?,
        change_amount: number("change_amount")?,
        change_percent: number("change_percentage")?,
        volume: volume_of(number("volume")?),
    })
}

fn daily_bar(value: &Value) -> Option<DailyBar> {
    let number = |name: &str| value.get(name).and_then(lenient_number);
    Some(DailyBar {
        open: number("1. open")?,
        high: number("2. high")?,
        low: number("3. low")?,
        close: number("4. close")?,
        volume: volume_of(number("5. volume")?),
    })
}

/// Accepts JSON numbers and numeric strings such as `"12.5%"` or `"1,024"`.
fn lenient_number(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(number) => number.as_f64()?,
        Value::String(text) => {
            let cleaned = text.trim().trim_end_matches('%').replace(',', "");
            cleaned.parse::<f64>().ok()?
        }
        _ => return None,
    };
    parsed.is_finite().then_some(parsed)
}

/// Alpha Vantage writes missing figures as `"None"` or `"-"`.
fn optional_number(value: &Option<Value>) -> Option<f64> {
    value.as_ref().and_then(lenient_number)
}

fn volume_of(raw: f64) -> u64 {
    if raw <= 0.0 {
        0
    } else {
        raw.round() as u64
    }
}

/// Breaker verdict for one exchange: anything the provider answered in
/// words keeps the circuit healthy.
fn call_outcome<T>(result: &Result<T, RemoteError>) -> CallOutcome {
    match result {
        Ok(_) | Err(RemoteError::NotFound(_) | RemoteError::Empty) => CallOutcome::Answered,
        Err(RemoteError::RateLimited(_)) => CallOutcome::Throttled,
        Err(_) => CallOutcome::Failed,
    }
}

fn text_of(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http_client::{HttpError, HttpResponse};
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::Mutex;

    struct ScriptedHttpClient {
        response: Result<HttpResponse, HttpError>,
        requests: Mutex<Vec<HttpRequest>>,
    }

    impl ScriptedHttpClient {
        fn body(body: &str) -> Arc<Self> {
            Arc::new(Self {
                response: Ok(HttpResponse::ok_json(body)),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                response: Err(HttpError::new("connection refused")),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn requests(&self) -> Vec<HttpRequest> {
            self.requests.lock().expect("request log lock").clone()
        }
    }

    impl HttpClient for ScriptedHttpClient {
        fn execute<'a>(
            &'a self,
            request: HttpRequest,
        ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
            self.requests.lock().expect("request log lock").push(request);
            let response = self.response.clone();
            Box::pin(async move { response })
        }
    }

    #[tokio::test]
    async fn blank_key_never_reaches_transport() {
        let http = ScriptedHttpClient::body("{}");
        let client = AlphaVantageClient::new(http.clone());

        let error = client.fetch_rankings("  ").await.expect_err("missing key");
        assert_eq!(error, RemoteError::MissingApiKey);
        assert!(http.requests().is_empty());
    }

    #[tokio::test]
    async fn quote_request_carries_function_symbol_and_key() {
        let http = ScriptedHttpClient::body(
            r#"{"Global Quote": {"01. symbol": "IBM", "05. price": "181.20", "06. volume": "3500000", "09. change": "-1.10", "10. change percent": "-0.6034%"}}"#,
        );
        let client = AlphaVantageClient::new(http.clone());

        let quote = client.fetch_quote("IBM", "key-1").await.expect("quote");
        assert_eq!(quote.symbol, "IBM");
        assert_eq!(quote.price, 181.20);
        assert_eq!(quote.change_percent, -0.6034);
        assert_eq!(quote.volume, 3_500_000);

        let requests = http.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].query_value("function"), Some("GLOBAL_QUOTE"));
        assert_eq!(requests[0].query_value("symbol"), Some("IBM"));
        assert_eq!(requests[0].query_value("apikey"), Some("key-1"));
    }

    #[tokio::test]
    async fn throttling_notice_maps_to_rate_limited() {
        let http = ScriptedHttpClient::body(
            r#"{"Information": "Thank you for using Alpha Vantage! Our standard API rate limit is 25 requests per day."}"#,
        );
        let client = AlphaVantageClient::new(http);

        let error = client.fetch_rankings("key").await.expect_err("throttled");
        assert!(matches!(error, RemoteError::RateLimited(_)));
    }

    #[tokio::test]
    async fn error_message_maps_to_not_found_and_empty_object_to_empty() {
        let not_found = AlphaVantageClient::new(ScriptedHttpClient::body(
            r#"{"Error Message": "Invalid API call."}"#,
        ));
        assert!(matches!(
            not_found.fetch_overview("ZZZ", "key").await,
            Err(RemoteError::NotFound(_))
        ));

        let empty = AlphaVantageClient::new(ScriptedHttpClient::body("{}"));
        assert_eq!(
            empty.fetch_overview("ZZZ", "key").await,
            Err(RemoteError::Empty)
        );
    }

    #[tokio::test]
    async fn unparsable_ranking_rows_are_dropped() {
        let http = ScriptedHttpClient::body(
            r#"{
                "last_updated": "2024-05-02 16:15:59 US/Eastern",
                "top_gainers": [
                    {"ticker": "ABCD", "price": "4.10", "change_amount": "1.60", "change_percentage": "64.0%", "volume": "1200300"},
                    {"ticker": "BAD", "price": "n/a", "change_amount": "0", "change_percentage": "0%", "volume": "1"}
                ],
                "top_losers": [],
                "most_actively_traded": [
                    {"ticker": "SPY", "price": 512.3, "change_amount": -1.2, "change_percentage": "-0.23%", "volume": 81000000}
                ]
            }"#,
        );
        let client = AlphaVantageClient::new(http);

        let rankings = client.fetch_rankings("key").await.expect("rankings");
        assert_eq!(rankings.gainers.len(), 1);
        assert_eq!(rankings.gainers[0].change_percent, 64.0);
        assert_eq!(rankings.most_active[0].volume, 81_000_000);
        assert!(rankings.losers.is_empty());
        assert_eq!(
            rankings.last_updated.as_deref(),
            Some("2024-05-02 16:15:59 US/Eastern")
        );
    }

    #[tokio::test]
    async fn overview_treats_none_and_dash_as_absent() {
        let http = ScriptedHttpClient::body(
            r#"{"Symbol": "IBM", "Name": "International Business Machines", "Description": "", "Sector": "TECHNOLOGY", "Industry": "COMPUTER", "MarketCapitalization": "166000000000", "52WeekHigh": "199.18", "52WeekLow": "125.70", "PERatio": "None", "DividendYield": "0.0365", "EPS": "-", "RevenuePerShareTTM": "67.59"}"#,
        );
        let client = AlphaVantageClient::new(http);

        let overview = client.fetch_overview("IBM", "key").await.expect("overview");
        assert_eq!(overview.name, "International Business Machines");
        assert_eq!(overview.market_cap, Some(166_000_000_000.0));
        assert_eq!(overview.pe_ratio, None);
        assert_eq!(overview.eps, None);
        assert_eq!(overview.revenue_per_share, Some(67.59));
    }

    #[tokio::test]
    async fn daily_series_is_keyed_by_date() {
        let http = ScriptedHttpClient::body(
            r#"{"Meta Data": {}, "Time Series (Daily)": {
                "2024-05-02": {"1. open": "10", "2. high": "11", "3. low": "9.5", "4. close": "10.5", "5. volume": "1000"},
                "2024-05-01": {"1. open": "9", "2. high": "10", "3. low": "8.5", "4. close": "9.8", "5. volume": "900"},
                "garbage": {"1. open": "1"}
            }}"#,
        );
        let client = AlphaVantageClient::new(http);

        let series = client.fetch_daily_series("IBM", "key").await.expect("series");
        assert_eq!(series.len(), 2);
        let (first_date, first_bar) = series.iter().next().expect("first bar");
        assert_eq!(first_date.to_string(), "2024-05-01");
        assert_eq!(first_bar.close, 9.8);
    }

    #[tokio::test]
    async fn circuit_opens_after_three_transport_failures() {
        let http = ScriptedHttpClient::failing();
        let client = AlphaVantageClient::new(http.clone());

        for _ in 0..3 {
            assert!(matches!(
                client.fetch_rankings("key").await,
                Err(RemoteError::Transport(_))
            ));
        }
        assert_eq!(client.circuit_state(), CircuitState::Open);
        assert_eq!(
            client.fetch_rankings("key").await,
            Err(RemoteError::CircuitOpen)
        );
        assert_eq!(http.requests().len(), 3);
    }

    #[tokio::test]
    async fn throttled_trial_keeps_the_circuit_open() {
        let breaker = Arc::new(CircuitBreaker::new(1, std::time::Duration::ZERO));
        breaker
            .permit()
            .expect("closed circuit admits")
            .settle(CallOutcome::Failed);
        let http = ScriptedHttpClient::body(r#"{"Information": "API rate limit reached."}"#);
        let client = AlphaVantageClient::new(http.clone()).with_circuit_breaker(breaker.clone());

        let result = client.fetch_rankings("key").await;

        assert!(matches!(result, Err(RemoteError::RateLimited(_))));
        assert_eq!(client.circuit_state(), CircuitState::Open);
        assert_eq!(breaker.consecutive_failures(), 1);
        assert_eq!(http.requests().len(), 1);
    }

    #[tokio::test]
    async fn unknown_symbol_answer_closes_a_half_open_circuit() {
        let breaker = Arc::new(CircuitBreaker::new(1, std::time::Duration::ZERO));
        breaker
            .permit()
            .expect("closed circuit admits")
            .settle(CallOutcome::Failed);
        let http = ScriptedHttpClient::body(r#"{"Error Message": "Invalid API call."}"#);
        let client = AlphaVantageClient::new(http).with_circuit_breaker(breaker);

        let result = client.fetch_quote("QWERT", "key").await;

        assert!(matches!(result, Err(RemoteError::NotFound(_))));
        assert_eq!(client.circuit_state(), CircuitState::Closed);
    }

    #[tokio::test]
    async fn sixth_call_in_a_minute_is_rejected_locally() {
        let http = ScriptedHttpClient::body(r#"{"top_gainers": []}"#);
        let client = AlphaVantageClient::new(http.clone());

        for _ in 0..5 {
            assert!(client.fetch_rankings("key").await.is_ok());
        }
        assert!(matches!(
            client.fetch_rankings("key").await,
            Err(RemoteError::RateLimited(_))
        ));
        assert_eq!(http.requests().len(), 5);
    }
}
