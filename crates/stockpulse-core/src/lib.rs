//! # Stockpulse Core
//!
//! Market data for the stockpulse tracker: a deterministic market simulator,
//! a layered data gateway and a fail-closed symbol validator.
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`cache`] | Cache store trait with in-memory and DuckDB-backed stores |
//! | [`circuit_breaker`] | Circuit breaker for the remote provider |
//! | [`clock`] | Injectable wall clock |
//! | [`config`] | Environment-driven gateway and validator settings |
//! | [`directory`] | Built-in company directory |
//! | [`domain`] | Value types (Ticker, Quote, RankingSnapshot, PriceSeries) |
//! | [`error`] | Core error types |
//! | [`filter`] | Validity filter for remote quotes |
//! | [`gateway`] | Cache, remote and simulation layering |
//! | [`http_client`] | HTTP client abstraction |
//! | [`remote`] | Remote provider trait and Alpha Vantage client |
//! | [`simulation`] | Deterministic market simulation engine |
//! | [`state`] | Loading/success/error progress streams |
//! | [`throttling`] | Request budget for the free-tier provider |
//! | [`validator`] | Two-stage ticker admission |
//! | [`watchlist`] | Watchlist over the cache |
//!
//! ## Data flow
//!
//! ```text
//! caller ──▶ MarketDataGateway ──▶ CacheStore (fresh rows)
//!                  │
//!                  ├──▶ MarketDataClient ──▶ filter ──▶ write-back
//!                  │
//!                  └──▶ MarketSimulationEngine (fallback)
//! ```
//!
//! Snapshot reads never fail: when every upstream layer is unavailable the
//! simulator answers.

pub mod cache;
pub mod circuit_breaker;
pub mod clock;
pub mod config;
pub mod directory;
pub mod domain;
pub mod error;
pub mod filter;
pub mod gateway;
pub mod http_client;
pub mod remote;
pub mod simulation;
pub mod state;
pub mod throttling;
pub mod validator;
pub mod watchlist;

pub use cache::{CacheStore, InMemoryCacheStore, WarehouseCacheStore};
pub use circuit_breaker::{CallOutcome, CallPermit, CircuitBreaker, CircuitState};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{GatewayConfig, ValidatorConfig};
pub use directory::{CompanyDirectory, CompanyProfile, Sector};
pub use domain::*;
pub use error::{CacheError, GatewayError, RemoteError, SymbolRejection, ValidationError};
pub use gateway::{CacheStats, MarketDataGateway, SimulationSession, SnapshotReport};
pub use http_client::{HttpClient, HttpError, HttpRequest, HttpResponse, ReqwestHttpClient};
pub use remote::{AlphaVantageClient, MarketDataClient, RemoteQuote, RemoteRankings};
pub use simulation::{MarketSentiment, MarketSimulationEngine, NewsEffect, SimulatedSnapshot};
pub use state::FetchState;
pub use stockpulse_warehouse::{CachedStockRecord, Warehouse, WarehouseConfig};
pub use throttling::RateBudget;
pub use validator::{SymbolValidator, Verification, VerifiedSymbol};
pub use watchlist::Watchlist;
