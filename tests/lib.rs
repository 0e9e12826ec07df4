//! Shared fakes for the stockpulse behaviour suites.
//!
//! A scripted remote, a fixed-clock gateway harness and row builders, so each
//! suite reads as given/when/then against the public API only.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use stockpulse_core::remote::{DailySeries, RemoteFuture};
use stockpulse_core::{
    CachedStockRecord, CompanyOverview, FixedClock, GatewayConfig, InMemoryCacheStore,
    MarketDataClient, MarketDataGateway, RemoteError, RemoteQuote, RemoteRankings,
};
use time::macros::datetime;
use time::OffsetDateTime;

/// Tuesday 2024-03-05 10:30 in the market's UTC-5 offset.
pub const MARKET_OPEN: OffsetDateTime = datetime!(2024-03-05 15:30 UTC);

/// A remote client that replays canned answers and counts calls.
pub struct ScriptedRemote {
    rankings: Result<RemoteRankings, RemoteError>,
    quote: Result<RemoteQuote, RemoteError>,
    overview: Result<CompanyOverview, RemoteError>,
    series: Result<DailySeries, RemoteError>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl ScriptedRemote {
    /// Every operation fails with a transport error.
    pub fn failing() -> Self {
        let down = || RemoteError::Transport("connection refused".to_owned());
        Self {
            rankings: Err(down()),
            quote: Err(down()),
            overview: Err(down()),
            series: Err(down()),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_rankings(mut self, rankings: RemoteRankings) -> Self {
        self.rankings = Ok(rankings);
        self
    }

    pub fn with_quote(mut self, quote: RemoteQuote) -> Self {
        self.quote = Ok(quote);
        self
    }

    pub fn with_overview(mut self, overview: CompanyOverview) -> Self {
        self.overview = Ok(overview);
        self
    }

    pub fn with_series(mut self, series: DailySeries) -> Self {
        self.series = Ok(series);
        self
    }

    /// Hold every answer back for `delay`.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn answer<'a, T>(&'a self, scripted: &'a Result<T, RemoteError>) -> RemoteFuture<'a, T>
    where
        T: Clone + Send + Sync + 'a,
    {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Box::pin(async move {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            scripted.clone()
        })
    }
}

impl MarketDataClient for ScriptedRemote {
    fn fetch_rankings<'a>(&'a self, _api_key: &'a str) -> RemoteFuture<'a, RemoteRankings> {
        self.answer(&self.rankings)
    }

    fn fetch_quote<'a>(&'a self, _symbol: &'a str, _api_key: &'a str) -> RemoteFuture<'a, RemoteQuote> {
        self.answer(&self.quote)
    }

    fn fetch_overview<'a>(
        &'a self,
        _symbol: &'a str,
        _api_key: &'a str,
    ) -> RemoteFuture<'a, CompanyOverview> {
        self.answer(&self.overview)
    }

    fn fetch_daily_series<'a>(
        &'a self,
        _symbol: &'a str,
        _api_key: &'a str,
    ) -> RemoteFuture<'a, DailySeries> {
        self.answer(&self.series)
    }
}

/// Everything a gateway test needs to poke at.
pub struct Harness {
    pub gateway: MarketDataGateway,
    pub remote: Arc<ScriptedRemote>,
    pub cache: Arc<InMemoryCacheStore>,
    pub clock: Arc<FixedClock>,
}

impl Harness {
    pub fn new(remote: ScriptedRemote, config: GatewayConfig) -> Self {
        let remote = Arc::new(remote);
        let cache = Arc::new(InMemoryCacheStore::new());
        let clock = Arc::new(FixedClock::new(MARKET_OPEN));
        let gateway = MarketDataGateway::new(remote.clone(), cache.clone(), config)
            .with_clock(clock.clone());
        Self {
            gateway,
            remote,
            cache,
            clock,
        }
    }

    /// Gateway with a usable API key.
    pub fn live(remote: ScriptedRemote) -> Self {
        Self::new(remote, GatewayConfig::default().with_api_key("demo-key"))
    }

    pub fn now_millis(&self) -> i64 {
        (MARKET_OPEN.unix_timestamp_nanos() / 1_000_000) as i64
    }
}

pub fn raw(symbol: &str, price: f64, change_percent: f64, volume: u64) -> RemoteQuote {
    RemoteQuote {
        symbol: symbol.to_owned(),
        price,
        change_amount: price * change_percent / 100.0,
        change_percent,
        volume,
    }
}

pub fn cached_row(symbol: &str, change_percent: f64, last_updated_epoch: i64) -> CachedStockRecord {
    CachedStockRecord {
        symbol: symbol.to_owned(),
        name: format!("{symbol} Corp"),
        price: 50.0,
        change: change_percent / 2.0,
        change_percent,
        volume: 1_000_000,
        last_updated_epoch,
        in_watchlist: false,
    }
}

pub fn overview_named(symbol: &str, name: &str) -> CompanyOverview {
    CompanyOverview {
        symbol: symbol.to_owned(),
        name: name.to_owned(),
        description: String::new(),
        sector: String::new(),
        industry: String::new(),
        market_cap: None,
        week_52_high: None,
        week_52_low: None,
        pe_ratio: None,
        dividend_yield: None,
        eps: None,
        revenue_per_share: None,
    }
}
