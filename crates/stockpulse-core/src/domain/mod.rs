//! # Domain Models
//!
//! Value types returned by the gateway and the simulation engine.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Ticker`] | Validated exchange ticker (`^[A-Z0-9+\-]{1,5}$`, not reserved) |
//! | [`Quote`] | Price, change and volume for one ticker |
//! | [`RankingSnapshot`] | Gainers, losers and most-active lists plus a freshness label |
//! | [`CompanyOverview`] | Company fundamentals |
//! | [`ChartPoint`] / [`PriceSeries`] | 30-point daily price history |
//!
//! All constructors enforce their invariants and return [`crate::ValidationError`]
//! on violation; values are immutable once built.

mod chart;
mod overview;
mod quote;
mod ticker;

pub(crate) use chart::parse_date;
pub use chart::{ChartPoint, PriceSeries, SERIES_LEN};
pub use overview::CompanyOverview;
pub use quote::{FreshnessLabel, Quote, RankingSnapshot, MAX_RANKED};
pub use ticker::{is_reserved, Ticker, RESERVED_TICKERS};
