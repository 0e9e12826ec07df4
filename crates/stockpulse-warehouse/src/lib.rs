//! # Stockpulse Warehouse
//!
//! DuckDB-backed persistence for the stockpulse quote cache.
//!
//! ## Overview
//!
//! The warehouse owns a single table, `stock_cache`, keyed by ticker symbol.
//! Rows are written by the market-data gateway after every successful fetch
//! (live or simulated) and pruned once they age past the retention ceiling.
//!
//! - Per-key upserts are idempotent and last-write-wins on market fields
//! - The `in_watchlist` flag is only changed through [`Warehouse::set_watchlist`]
//! - Pruning never removes watchlist rows
//! - `snapshot_cycles` records when a full ranking snapshot was last written,
//!   so single-row writes never make the cache look fresh
//! - All values are bound as query parameters
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use stockpulse_warehouse::{CachedStockRecord, Warehouse};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let warehouse = Warehouse::open_default()?;
//!
//!     warehouse.upsert_records(&[CachedStockRecord {
//!         symbol: "AAPL".to_string(),
//!         name: "Apple Inc.".to_string(),
//!         price: 189.5,
//!         change: 1.25,
//!         change_percent: 0.66,
//!         volume: 52_000_000,
//!         last_updated_epoch: 1_700_000_000_000,
//!         in_watchlist: false,
//!     }])?;
//!
//!     println!("{} cached rows", warehouse.count()?);
//!     Ok(())
//! }
//! ```

pub mod duckdb;
pub mod migrations;

use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use ::duckdb::{Connection, Row, ToSql};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use duckdb::{DuckDbConnectionManager, PooledConnection};

/// Errors that can occur during warehouse operations.
#[derive(Debug, Error)]
pub enum WarehouseError {
    /// `DuckDB` database error.
    #[error(transparent)]
    DuckDb(#[from] ::duckdb::Error),

    /// I/O error (file system operations).
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A stored row could not be mapped back into a record.
    #[error("corrupt cache row for '{symbol}': {reason}")]
    CorruptRow { symbol: String, reason: String },
}

/// Configuration for the warehouse database.
#[derive(Debug, Clone)]
pub struct WarehouseConfig {
    /// Root directory for stockpulse data.
    pub home: PathBuf,
    /// Path to the `DuckDB` database file.
    pub db_path: PathBuf,
    /// Maximum number of idle connections kept in the pool.
    pub max_pool_size: usize,
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        Self::in_home(resolve_stockpulse_home())
    }
}

impl WarehouseConfig {
    /// Configuration rooted at an explicit home directory.
    pub fn in_home(home: impl Into<PathBuf>) -> Self {
        let home = home.into();
        let db_path = home.join("cache").join("stocks.duckdb");
        Self {
            home,
            db_path,
            max_pool_size: 4,
        }
    }
}

/// One cached quote row.
///
/// `last_updated_epoch` is milliseconds since the Unix epoch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedStockRecord {
    pub symbol: String,
    pub name: String,
    pub price: f64,
    pub change: f64,
    pub change_percent: f64,
    pub volume: u64,
    pub last_updated_epoch: i64,
    pub in_watchlist: bool,
}

/// The persistent quote cache.
#[derive(Clone)]
pub struct Warehouse {
    manager: DuckDbConnectionManager,
}

const SELECT_COLUMNS: &str = "symbol, name, price, change_amount, change_percent, volume, \
                              last_updated, in_watchlist";

impl Warehouse {
    /// Open a warehouse with default configuration.
    pub fn open_default() -> Result<Self, WarehouseError> {
        Self::open(WarehouseConfig::default())
    }

    /// Open a warehouse with the specified configuration.
    pub fn open(config: WarehouseConfig) -> Result<Self, WarehouseError> {
        if let Some(parent) = config.db_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let manager = DuckDbConnectionManager::open(config.db_path.clone(), config.max_pool_size)?;
        let warehouse = Self { manager };
        warehouse.initialize()?;
        Ok(warehouse)
    }

    /// Apply pending schema migrations.
    pub fn initialize(&self) -> Result<(), WarehouseError> {
        let connection = self.manager.acquire()?;
        migrations::apply_migrations(&connection)?;
        Ok(())
    }

    /// Get the path to the database file.
    pub fn db_path(&self) -> &Path {
        self.manager.db_path()
    }

    /// Upsert rows in a single transaction.
    ///
    /// When the batch names a symbol more than once the last occurrence wins.
    /// Existing rows keep their `in_watchlist` flag; new rows take the flag
    /// from the record.
    pub fn upsert_records(&self, rows: &[CachedStockRecord]) -> Result<usize, WarehouseError> {
        if rows.is_empty() {
            return Ok(0);
        }

        // DuckDB rejects touching the same key twice inside one transaction.
        let mut latest = BTreeMap::new();
        for row in rows {
            latest.insert(row.symbol.as_str(), row);
        }

        let connection = self.manager.acquire()?;
        connection.execute_batch("BEGIN TRANSACTION")?;
        let result = (|| -> Result<usize, WarehouseError> {
            for row in latest.values() {
                let volume = i64::try_from(row.volume).unwrap_or(i64::MAX);
                let params: [&dyn ToSql; 8] = [
                    &row.symbol,
                    &row.name,
                    &row.price,
                    &row.change,
                    &row.change_percent,
                    &volume,
                    &row.last_updated_epoch,
                    &row.in_watchlist,
                ];
                connection.execute(
                    "INSERT INTO stock_cache \
                     (symbol, name, price, change_amount, change_percent, volume, last_updated, in_watchlist) \
                     VALUES (?, ?, ?, ?, ?, ?, ?, ?) \
                     ON CONFLICT (symbol) DO UPDATE SET \
                     name = excluded.name, \
                     price = excluded.price, \
                     change_amount = excluded.change_amount, \
                     change_percent = excluded.change_percent, \
                     volume = excluded.volume, \
                     last_updated = excluded.last_updated",
                    params.as_slice(),
                )?;
            }
            Ok(latest.len())
        })();

        finalize_transaction(&connection, result)
    }

    /// Delete non-watchlist rows last updated before `cutoff_epoch` (ms).
    pub fn delete_older_than(&self, cutoff_epoch: i64) -> Result<usize, WarehouseError> {
        let connection = self.manager.acquire()?;
        let params: [&dyn ToSql; 1] = [&cutoff_epoch];
        let deleted = connection.execute(
            "DELETE FROM stock_cache WHERE last_updated < ? AND NOT in_watchlist",
            params.as_slice(),
        )?;
        connection.execute(
            "DELETE FROM snapshot_cycles WHERE written_at < ?",
            params.as_slice(),
        )?;
        if deleted > 0 {
            tracing::debug!(deleted, cutoff_epoch, "pruned stale cache rows");
        }
        Ok(deleted)
    }

    /// Number of cached rows.
    pub fn count(&self) -> Result<usize, WarehouseError> {
        let connection = self.manager.acquire()?;
        let count: i64 =
            connection.query_row("SELECT COUNT(*) FROM stock_cache", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    /// Timestamp (ms) of the most recently updated row, if any.
    pub fn most_recent_timestamp(&self) -> Result<Option<i64>, WarehouseError> {
        let connection = self.manager.acquire()?;
        let latest: Option<i64> = connection.query_row(
            "SELECT MAX(last_updated) FROM stock_cache",
            [],
            |row| row.get(0),
        )?;
        Ok(latest)
    }

    /// Record that a full ranking snapshot was written at `written_at` (ms).
    pub fn record_snapshot_cycle(&self, written_at: i64) -> Result<(), WarehouseError> {
        let connection = self.manager.acquire()?;
        let params: [&dyn ToSql; 1] = [&written_at];
        connection.execute(
            "INSERT INTO snapshot_cycles (written_at) VALUES (?)",
            params.as_slice(),
        )?;
        Ok(())
    }

    /// When the latest full ranking snapshot was written (ms), if ever.
    pub fn latest_snapshot_cycle(&self) -> Result<Option<i64>, WarehouseError> {
        let connection = self.manager.acquire()?;
        let latest: Option<i64> = connection.query_row(
            "SELECT MAX(written_at) FROM snapshot_cycles",
            [],
            |row| row.get(0),
        )?;
        Ok(latest)
    }

    /// Look up one row by symbol.
    pub fn record(&self, symbol: &str) -> Result<Option<CachedStockRecord>, WarehouseError> {
        let connection = self.manager.acquire()?;
        let sql = format!("SELECT {SELECT_COLUMNS} FROM stock_cache WHERE symbol = ?");
        let params: [&dyn ToSql; 1] = [&symbol];
        let mut records = query_records(&connection, sql.as_str(), params.as_slice())?;
        Ok(records.pop())
    }

    /// All rows ordered by symbol.
    pub fn records(&self) -> Result<Vec<CachedStockRecord>, WarehouseError> {
        let connection = self.manager.acquire()?;
        let sql = format!("SELECT {SELECT_COLUMNS} FROM stock_cache ORDER BY symbol");
        query_records(&connection, sql.as_str(), &[])
    }

    /// Rows flagged as watchlist members, ordered by symbol.
    pub fn watchlist(&self) -> Result<Vec<CachedStockRecord>, WarehouseError> {
        let connection = self.manager.acquire()?;
        let sql =
            format!("SELECT {SELECT_COLUMNS} FROM stock_cache WHERE in_watchlist ORDER BY symbol");
        query_records(&connection, sql.as_str(), &[])
    }

    /// Set the watchlist flag for an existing row. Returns `false` when no row
    /// exists for `symbol`.
    pub fn set_watchlist(&self, symbol: &str, in_watchlist: bool) -> Result<bool, WarehouseError> {
        let connection = self.manager.acquire()?;
        let params: [&dyn ToSql; 2] = [&in_watchlist, &symbol];
        let updated = connection.execute(
            "UPDATE stock_cache SET in_watchlist = ? WHERE symbol = ?",
            params.as_slice(),
        )?;
        Ok(updated > 0)
    }
}

fn query_records(
    connection: &Connection,
    sql: &str,
    params: &[&dyn ToSql],
) -> Result<Vec<CachedStockRecord>, WarehouseError> {
    let mut statement = connection.prepare(sql)?;
    let mut rows = statement.query(params)?;
    let mut records = Vec::new();
    while let Some(row) = rows.next()? {
        records.push(record_from_row(row)?);
    }
    Ok(records)
}

fn record_from_row(row: &Row<'_>) -> Result<CachedStockRecord, WarehouseError> {
    let symbol: String = row.get(0)?;
    let volume: i64 = row.get(5)?;
    let volume = u64::try_from(volume).map_err(|_| WarehouseError::CorruptRow {
        symbol: symbol.clone(),
        reason: format!("negative volume {volume}"),
    })?;

    Ok(CachedStockRecord {
        name: row.get(1)?,
        price: row.get(2)?,
        change: row.get(3)?,
        change_percent: row.get(4)?,
        volume,
        last_updated_epoch: row.get(6)?,
        in_watchlist: row.get(7)?,
        symbol,
    })
}

/// Finalize a transaction, committing on success or rolling back on failure.
fn finalize_transaction<T>(
    connection: &Connection,
    result: Result<T, WarehouseError>,
) -> Result<T, WarehouseError> {
    match result {
        Ok(value) => {
            connection.execute_batch("COMMIT")?;
            Ok(value)
        }
        Err(error) => {
            let _ = connection.execute_batch("ROLLBACK");
            Err(error)
        }
    }
}

fn resolve_stockpulse_home() -> PathBuf {
    if let Some(path) = env::var_os("STOCKPULSE_HOME") {
        let path = PathBuf::from(path);
        if !path.as_os_str().is_empty() {
            return path;
        }
    }

    if let Some(home) = env::var_os("HOME") {
        return PathBuf::from(home).join(".stockpulse");
    }

    PathBuf::from(".stockpulse")
}
