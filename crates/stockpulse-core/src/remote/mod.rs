//! Contract for the upstream market-data provider.
//!
//! Payloads here are raw: tickers are untrusted strings and numbers are not
//! yet checked for sign. The gateway's validity filter turns them into domain
//! values.

mod alphavantage;

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};
use time::Date;

use crate::{CompanyOverview, RemoteError};

pub use alphavantage::{AlphaVantageClient, ALPHAVANTAGE_BASE_URL};

/// Boxed future returned by every [`MarketDataClient`] operation.
pub type RemoteFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, RemoteError>> + Send + 'a>>;

/// One unvalidated quote row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteQuote {
    pub symbol: String,
    pub price: f64,
    pub change_amount: f64,
    pub change_percent: f64,
    pub volume: u64,
}

/// Gainers, losers and most-active rows as the provider ranked them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemoteRankings {
    pub gainers: Vec<RemoteQuote>,
    pub losers: Vec<RemoteQuote>,
    pub most_active: Vec<RemoteQuote>,
    pub last_updated: Option<String>,
}

impl RemoteRankings {
    pub fn total_len(&self) -> usize {
        self.gainers.len() + self.losers.len() + self.most_active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total_len() == 0
    }
}

/// One daily OHLCV bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailyBar {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

/// Daily bars keyed by trading date, oldest first.
pub type DailySeries = BTreeMap<Date, DailyBar>;

/// Upstream provider operations. Every call takes the API key explicitly;
/// implementations never retry.
pub trait MarketDataClient: Send + Sync {
    fn fetch_rankings<'a>(&'a self, api_key: &'a str) -> RemoteFuture<'a, RemoteRankings>;

    fn fetch_quote<'a>(&'a self, symbol: &'a str, api_key: &'a str)
        -> RemoteFuture<'a, RemoteQuote>;

    fn fetch_overview<'a>(
        &'a self,
        symbol: &'a str,
        api_key: &'a str,
    ) -> RemoteFuture<'a, CompanyOverview>;

    fn fetch_daily_series<'a>(
        &'a self,
        symbol: &'a str,
        api_key: &'a str,
    ) -> RemoteFuture<'a, DailySeries>;
}
