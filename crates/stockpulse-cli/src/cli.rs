//! CLI argument definitions for stockpulse.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `snapshot` | Gainers, losers and most-active rankings |
//! | `quote` | Live quote for one symbol |
//! | `overview` | Company fundamentals |
//! | `series` | 30-day closing prices |
//! | `validate` | Check whether a ticker is real |
//! | `watchlist` | Manage the persistent watchlist |
//! | `cache` | Inspect or prune the local cache |
//! | `simulate` | Run the market simulator at a given instant |
//!
//! # Examples
//!
//! ```bash
//! stockpulse snapshot --pretty
//! stockpulse --offline series NVDA
//! stockpulse simulate --at 2024-03-05T10:15:00-05:00
//! ```

use clap::{Args, Parser, Subcommand};

/// Stock rankings, quotes and fundamentals with a simulated fallback.
///
/// Reads the Alpha Vantage key from STOCKPULSE_ALPHAVANTAGE_API_KEY or
/// ALPHAVANTAGE_API_KEY. Without a key every read is answered from the cache
/// or the market simulator.
#[derive(Debug, Parser)]
#[command(name = "stockpulse", author, version, about)]
pub struct Cli {
    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    /// Never call the remote provider, even when a key is configured.
    #[arg(long, global = true, default_value_t = false)]
    pub offline: bool,

    /// Remote request timeout in milliseconds. Overrides the environment.
    #[arg(long, global = true)]
    pub timeout_ms: Option<u64>,

    /// Use a throwaway in-memory cache instead of the DuckDB warehouse.
    #[arg(long, global = true, default_value_t = false)]
    pub memory: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Gainers, losers and most-active rankings.
    Snapshot(SnapshotArgs),
    /// Live quote for one symbol. Fails without a usable API key.
    Quote(SymbolArgs),
    /// Company fundamentals, simulated when the provider has none.
    Overview(SymbolArgs),
    /// 30 daily closing prices.
    Series(SymbolArgs),
    /// Check whether a ticker exists. Exits with code 3 when it does not.
    Validate(SymbolArgs),
    /// Manage the persistent watchlist.
    Watchlist(WatchlistArgs),
    /// Inspect or prune the local cache.
    Cache(CacheArgs),
    /// Run the market simulator without touching the cache.
    Simulate(SimulateArgs),
}

#[derive(Debug, Args)]
pub struct SnapshotArgs {
    /// Skip the fresh-cache short circuit.
    #[arg(long, default_value_t = false)]
    pub refresh: bool,
}

#[derive(Debug, Args)]
pub struct SymbolArgs {
    pub symbol: String,
}

#[derive(Debug, Args)]
pub struct WatchlistArgs {
    #[command(subcommand)]
    pub command: WatchlistCommand,
}

#[derive(Debug, Subcommand)]
pub enum WatchlistCommand {
    /// Validate a symbol and add it.
    Add(SymbolArgs),
    Remove(SymbolArgs),
    List,
}

#[derive(Debug, Args)]
pub struct CacheArgs {
    #[command(subcommand)]
    pub command: CacheCommand,
}

#[derive(Debug, Subcommand)]
pub enum CacheCommand {
    /// Row count and age of the newest row.
    Stats,
    /// Delete rows past the retention window. Watchlist rows are kept.
    Prune,
}

#[derive(Debug, Args)]
pub struct SimulateArgs {
    /// Instant to simulate, RFC 3339. Defaults to now.
    #[arg(long)]
    pub at: Option<String>,
}
