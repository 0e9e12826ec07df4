//! # Market Data Gateway
//!
//! Orchestrates the cache, the remote provider and the simulation engine.
//!
//! ## Snapshot pipeline
//!
//! 1. Unless a refresh is forced, a cache whose last snapshot cycle is
//!    younger than the freshness window answers directly (`cached`). Only
//!    whole-snapshot writes start a cycle; single-quote writes refresh
//!    their row without making the cache fresh.
//! 2. With a usable API key the remote rankings are fetched under a timeout,
//!    filtered per list, written back and returned (`live`).
//! 3. Without a key, or when the remote fails or filters down to nothing,
//!    the engine generates a snapshot which is written back and returned
//!    (`simulated`).
//! 4. If that pipeline still fails, any cached rows are served regardless of
//!    age before a bare simulation pass is returned.
//!
//! The snapshot path therefore never returns an error. Overview and series
//! lookups fall back to the engine; a single quote has no fallback and
//! surfaces remote errors to the caller, who is expected to hold its own
//! last-resort data.

use std::collections::{BTreeMap, HashSet};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use stockpulse_warehouse::CachedStockRecord;
use time::OffsetDateTime;
use tokio::sync::mpsc;
use tokio::task::JoinSet;

use crate::cache::{CacheFuture, CacheStore};
use crate::clock::{Clock, SystemClock};
use crate::config::GatewayConfig;
use crate::filter::{admit, filter_rankings, snapshot_from_cache};
use crate::remote::{DailySeries, MarketDataClient};
use crate::simulation::{MarketSentiment, MarketSimulationEngine, NewsEffect, SimulatedSnapshot};
use crate::state::{observe, observe_infallible, FetchState};
use crate::{
    ChartPoint, CompanyOverview, FreshnessLabel, GatewayError, PriceSeries, Quote,
    RankingSnapshot, RemoteError, SERIES_LEN,
};

const FALLBACK_BASE_PRICE: f64 = 100.0;

/// Engine metadata attached to simulated snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SimulationSession {
    pub sentiment: MarketSentiment,
    pub news: NewsEffect,
}

/// A snapshot together with how it was produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SnapshotReport {
    pub snapshot: RankingSnapshot,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<SimulationSession>,
}

impl SnapshotReport {
    fn plain(snapshot: RankingSnapshot) -> Self {
        Self {
            snapshot,
            session: None,
        }
    }

    fn simulated(pass: SimulatedSnapshot) -> Self {
        Self {
            snapshot: pass.snapshot,
            session: Some(SimulationSession {
                sentiment: pass.sentiment,
                news: pass.news,
            }),
        }
    }
}

/// Row count and age of the cache.
///
/// `age_ms` and `fresh` follow the last snapshot cycle, not the newest row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub rows: usize,
    pub newest_epoch_ms: Option<i64>,
    pub last_snapshot_epoch_ms: Option<i64>,
    pub age_ms: Option<i64>,
    pub fresh: bool,
}

/// Layered data gateway. Cheap to clone; clones share every collaborator.
#[derive(Clone)]
pub struct MarketDataGateway {
    remote: Arc<dyn MarketDataClient>,
    cache: Arc<dyn CacheStore>,
    engine: MarketSimulationEngine,
    clock: Arc<dyn Clock>,
    config: GatewayConfig,
}

impl MarketDataGateway {
    pub fn new(
        remote: Arc<dyn MarketDataClient>,
        cache: Arc<dyn CacheStore>,
        config: GatewayConfig,
    ) -> Self {
        Self {
            remote,
            cache,
            engine: MarketSimulationEngine::default(),
            clock: Arc::new(SystemClock),
            config,
        }
    }

    pub fn with_engine(mut self, engine: MarketSimulationEngine) -> Self {
        self.engine = engine;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn engine(&self) -> &MarketSimulationEngine {
        &self.engine
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn cache(&self) -> &Arc<dyn CacheStore> {
        &self.cache
    }

    /// Current instant in the market's offset.
    pub fn market_now(&self) -> OffsetDateTime {
        self.clock.now().to_offset(self.config.market_offset)
    }

    /// Aggregate rankings. Never fails.
    pub async fn get_snapshot(&self, force_refresh: bool) -> RankingSnapshot {
        self.get_snapshot_report(force_refresh).await.snapshot
    }

    /// Aggregate rankings plus simulation metadata when the engine produced them.
    pub async fn get_snapshot_report(&self, force_refresh: bool) -> SnapshotReport {
        if !force_refresh {
            if let Some(snapshot) = self.fresh_cached_snapshot().await {
                tracing::debug!(quotes = snapshot.total_len(), "serving fresh cache");
                return SnapshotReport::plain(snapshot);
            }
        }

        match self.refresh_snapshot().await {
            Ok(report) => report,
            Err(error) => {
                tracing::warn!(%error, "snapshot refresh failed; trying cache at any age");
                if let Some(snapshot) = self.any_cached_snapshot().await {
                    return SnapshotReport::plain(snapshot);
                }
                SnapshotReport::simulated(self.engine.generate_snapshot(self.market_now()))
            }
        }
    }

    async fn refresh_snapshot(&self) -> Result<SnapshotReport, GatewayError> {
        match self.config.usable_api_key() {
            Some(api_key) => match self.fetch_live_snapshot(api_key).await {
                Ok(snapshot) if !snapshot.is_empty() => {
                    self.cache_snapshot(&snapshot).await;
                    tracing::info!(quotes = snapshot.total_len(), "serving live rankings");
                    return Ok(SnapshotReport::plain(snapshot));
                }
                Ok(_) => tracing::info!("remote rankings empty after filtering; simulating"),
                Err(error) => tracing::warn!(
                    code = error.code(),
                    %error,
                    "remote rankings unavailable; simulating"
                ),
            },
            None => tracing::debug!("no API key configured; simulating"),
        }

        let pass = self.engine.generate_snapshot(self.market_now());
        if pass.snapshot.is_empty() {
            return Err(GatewayError::EmptySimulation);
        }
        self.cache_snapshot(&pass.snapshot).await;
        Ok(SnapshotReport::simulated(pass))
    }

    async fn fetch_live_snapshot(&self, api_key: &str) -> Result<RankingSnapshot, RemoteError> {
        let raw = self
            .bounded(self.remote.fetch_rankings(api_key))
            .await?;
        if raw.is_empty() {
            return Err(RemoteError::Empty);
        }
        Ok(filter_rankings(
            &raw,
            FreshnessLabel::Live,
            self.config.max_per_list,
        ))
    }

    /// Rows written by the last snapshot cycle, or since, while that cycle
    /// is inside the freshness window.
    async fn fresh_cached_snapshot(&self) -> Option<RankingSnapshot> {
        let cycle = self
            .cache_read("latest_snapshot_cycle", self.cache.latest_snapshot_cycle())
            .await??;
        let age_ms = self.clock.now_epoch_millis() - cycle;
        if age_ms >= millis(self.config.freshness_window) {
            tracing::debug!(age_ms, "cache is stale");
            return None;
        }

        let rows = self.cache_read("get_all", self.cache.get_all()).await?;
        let recent = rows
            .into_iter()
            .filter(|row| row.last_updated_epoch >= cycle)
            .collect::<Vec<_>>();
        let snapshot = snapshot_from_cache(&recent, FreshnessLabel::Cached, self.config.max_per_list);
        (!snapshot.is_empty()).then_some(snapshot)
    }

    async fn any_cached_snapshot(&self) -> Option<RankingSnapshot> {
        let rows = self.cache_read("get_all", self.cache.get_all()).await?;
        let snapshot = snapshot_from_cache(&rows, FreshnessLabel::Cached, self.config.max_per_list);
        (!snapshot.is_empty()).then_some(snapshot)
    }

    /// Write a whole snapshot back and start a new freshness cycle.
    async fn cache_snapshot(&self, snapshot: &RankingSnapshot) {
        let now = self.clock.now_epoch_millis();
        if !self.write_back(snapshot.quotes(), now).await {
            return;
        }
        if let Err(error) = self.cache.record_snapshot_cycle(now).await {
            tracing::warn!(%error, "cache cycle mark failed");
        }
    }

    /// Upsert `quotes` then prune past the retention ceiling. Failures are
    /// logged and swallowed; returns whether the rows were written.
    async fn write_back<'q>(&self, quotes: impl Iterator<Item = &'q Quote>, now: i64) -> bool {
        let mut seen = HashSet::new();
        let records = quotes
            .filter(|quote| seen.insert(quote.ticker.as_str().to_owned()))
            .map(|quote| self.record_for(quote, now))
            .collect::<Vec<_>>();

        let written = match self.cache.bulk_upsert(records).await {
            Ok(written) => {
                tracing::debug!(written, "cached quotes");
                true
            }
            Err(error) => {
                tracing::warn!(%error, "cache write failed");
                false
            }
        };

        let cutoff = now.saturating_sub(millis(self.config.retention));
        match self.cache.delete_older_than(cutoff).await {
            Ok(0) => {}
            Ok(pruned) => tracing::debug!(pruned, "pruned expired cache rows"),
            Err(error) => tracing::warn!(%error, "cache prune failed"),
        }
        written
    }

    fn record_for(&self, quote: &Quote, now: i64) -> CachedStockRecord {
        let symbol = quote.ticker.as_str();
        CachedStockRecord {
            symbol: symbol.to_owned(),
            name: self
                .engine
                .directory()
                .get(symbol)
                .map_or_else(|| symbol.to_owned(), |profile| profile.name.clone()),
            price: quote.price,
            change: quote.change_amount,
            change_percent: quote.change_percent,
            volume: quote.volume,
            last_updated_epoch: now,
            in_watchlist: false,
        }
    }

    /// One live quote. No simulated fallback: errors reach the caller.
    pub async fn get_single_quote(&self, symbol: &str) -> Result<Quote, GatewayError> {
        let api_key = self
            .config
            .usable_api_key()
            .ok_or(RemoteError::MissingApiKey)?;

        let raw = self.bounded(self.remote.fetch_quote(symbol, api_key)).await?;
        let quote = admit(&raw).ok_or_else(|| {
            RemoteError::Malformed(format!("quote for '{symbol}' failed validation"))
        })?;

        let now = self.clock.now_epoch_millis();
        self.write_back(std::iter::once(&quote), now).await;
        Ok(quote)
    }

    /// Remote overview, else the engine's. Fails only for symbols the
    /// directory does not know.
    pub async fn get_company_overview(&self, symbol: &str) -> Result<CompanyOverview, GatewayError> {
        if let Some(api_key) = self.config.usable_api_key() {
            match self.bounded(self.remote.fetch_overview(symbol, api_key)).await {
                Ok(overview) if overview.has_meaningful_name(symbol) => return Ok(overview),
                Ok(_) => tracing::debug!(symbol, "remote overview has no real name; simulating"),
                Err(error) => tracing::warn!(
                    symbol,
                    code = error.code(),
                    %error,
                    "remote overview unavailable; simulating"
                ),
            }
        }

        self.engine
            .generate_company_overview(symbol)
            .ok_or_else(|| GatewayError::UnknownSymbol {
                symbol: symbol.to_owned(),
            })
    }

    /// 30 daily closes from the remote, else a synthetic walk anchored at
    /// the best-known price.
    pub async fn get_daily_series(&self, symbol: &str) -> Result<PriceSeries, GatewayError> {
        if let Some(api_key) = self.config.usable_api_key() {
            match self
                .bounded(self.remote.fetch_daily_series(symbol, api_key))
                .await
            {
                Ok(bars) => match series_from_bars(&bars) {
                    Some(series) => return Ok(series),
                    None => tracing::debug!(symbol, bars = bars.len(), "remote history too short"),
                },
                Err(error) => tracing::warn!(
                    symbol,
                    code = error.code(),
                    %error,
                    "remote history unavailable; simulating"
                ),
            }
        }

        let base_price = self.base_price(symbol).await;
        let today = self.market_now().date();
        Ok(self
            .engine
            .generate_daily_series(symbol, base_price, today)?)
    }

    /// Cached price, else the directory band midpoint, else 100.
    pub async fn base_price(&self, symbol: &str) -> f64 {
        let key = symbol.trim().to_ascii_uppercase();
        let cached = self
            .cache_read("get_by_symbol", self.cache.get_by_symbol(&key))
            .await
            .flatten()
            .map(|row| row.price)
            .filter(|price| price.is_finite() && *price > 0.0);

        cached
            .or_else(|| self.engine.directory().get(&key).map(|profile| profile.mid_price()))
            .unwrap_or(FALLBACK_BASE_PRICE)
    }

    /// Resolve display names concurrently. Symbols with no meaningful name
    /// are left out.
    pub async fn company_names(&self, symbols: &[String]) -> BTreeMap<String, String> {
        let mut tasks = JoinSet::new();
        for symbol in symbols {
            let gateway = self.clone();
            let symbol = symbol.trim().to_ascii_uppercase();
            tasks.spawn(async move {
                let name = gateway.display_name(&symbol).await;
                (symbol, name)
            });
        }

        let mut names = BTreeMap::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((symbol, Some(name))) => {
                    names.insert(symbol, name);
                }
                Ok((symbol, None)) => tracing::debug!(%symbol, "no display name"),
                Err(error) => tracing::warn!(%error, "name lookup task failed"),
            }
        }
        names
    }

    async fn display_name(&self, symbol: &str) -> Option<String> {
        let cached = self
            .cache_read("get_by_symbol", self.cache.get_by_symbol(symbol))
            .await
            .flatten()
            .map(|row| row.name)
            .filter(|name| !name.trim().is_empty() && !name.eq_ignore_ascii_case(symbol));
        if cached.is_some() {
            return cached;
        }

        if let Some(profile) = self.engine.directory().get(symbol) {
            return Some(profile.name.clone());
        }

        self.get_company_overview(symbol)
            .await
            .ok()
            .filter(|overview| overview.has_meaningful_name(symbol))
            .map(|overview| overview.name)
    }

    pub async fn cache_stats(&self) -> Result<CacheStats, GatewayError> {
        let rows = self.cache.count().await?;
        let newest_epoch_ms = self.cache.most_recent_timestamp().await?;
        let last_snapshot_epoch_ms = self.cache.latest_snapshot_cycle().await?;
        let age_ms = last_snapshot_epoch_ms.map(|cycle| self.clock.now_epoch_millis() - cycle);
        let fresh = age_ms.is_some_and(|age| age < millis(self.config.freshness_window));
        Ok(CacheStats {
            rows,
            newest_epoch_ms,
            last_snapshot_epoch_ms,
            age_ms,
            fresh,
        })
    }

    /// Prune rows past the retention ceiling on demand.
    pub async fn prune_expired(&self) -> Result<usize, GatewayError> {
        let cutoff = self
            .clock
            .now_epoch_millis()
            .saturating_sub(millis(self.config.retention));
        Ok(self.cache.delete_older_than(cutoff).await?)
    }

    pub fn observe_snapshot(&self, force_refresh: bool) -> mpsc::Receiver<FetchState<RankingSnapshot>> {
        let gateway = self.clone();
        observe_infallible(async move { gateway.get_snapshot(force_refresh).await })
    }

    pub fn observe_single_quote(&self, symbol: impl Into<String>) -> mpsc::Receiver<FetchState<Quote>> {
        let gateway = self.clone();
        let symbol = symbol.into();
        observe(async move { gateway.get_single_quote(&symbol).await })
    }

    pub fn observe_company_overview(
        &self,
        symbol: impl Into<String>,
    ) -> mpsc::Receiver<FetchState<CompanyOverview>> {
        let gateway = self.clone();
        let symbol = symbol.into();
        observe(async move { gateway.get_company_overview(&symbol).await })
    }

    pub fn observe_daily_series(&self, symbol: impl Into<String>) -> mpsc::Receiver<FetchState<PriceSeries>> {
        let gateway = self.clone();
        let symbol = symbol.into();
        observe(async move { gateway.get_daily_series(&symbol).await })
    }

    async fn bounded<T, F>(&self, call: F) -> Result<T, RemoteError>
    where
        F: Future<Output = Result<T, RemoteError>>,
    {
        let timeout = self.config.remote_timeout;
        tokio::time::timeout(timeout, call)
            .await
            .unwrap_or(Err(RemoteError::Timeout {
                timeout_ms: timeout.as_millis() as u64,
            }))
    }

    async fn cache_read<T>(&self, operation: &'static str, call: CacheFuture<'_, T>) -> Option<T> {
        match call.await {
            Ok(value) => Some(value),
            Err(error) => {
                tracing::warn!(operation, %error, "cache error treated as miss");
                None
            }
        }
    }
}

/// Latest 30 positive closes, oldest first.
fn series_from_bars(bars: &DailySeries) -> Option<PriceSeries> {
    let closes = bars
        .iter()
        .filter(|(_, bar)| bar.close.is_finite() && bar.close > 0.0)
        .collect::<Vec<_>>();
    if closes.len() < SERIES_LEN {
        return None;
    }

    let points = closes[closes.len() - SERIES_LEN..]
        .iter()
        .map(|(date, bar)| ChartPoint::new(**date, bar.close))
        .collect::<Result<Vec<_>, _>>()
        .ok()?;
    PriceSeries::new(points).ok()
}

fn millis(duration: Duration) -> i64 {
    i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
}
