//! Quote cache contract and its two stores.
//!
//! The gateway is the only writer. Writes are per-symbol upserts, so
//! concurrent writers converge on last-write-wins without extra locking.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use stockpulse_warehouse::{CachedStockRecord, Warehouse, WarehouseConfig};

use crate::CacheError;

/// Boxed future returned by every [`CacheStore`] operation.
pub type CacheFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, CacheError>> + Send + 'a>>;

/// Persistent quote cache.
///
/// Market-data upserts never change an existing row's `in_watchlist` flag;
/// only [`CacheStore::set_watchlist`] does. Pruning skips watchlist rows.
pub trait CacheStore: Send + Sync {
    fn upsert<'a>(&'a self, record: CachedStockRecord) -> CacheFuture<'a, ()>;

    fn bulk_upsert<'a>(&'a self, records: Vec<CachedStockRecord>) -> CacheFuture<'a, usize>;

    /// Remove non-watchlist rows last updated before `cutoff_epoch_ms`.
    fn delete_older_than<'a>(&'a self, cutoff_epoch_ms: i64) -> CacheFuture<'a, usize>;

    fn count<'a>(&'a self) -> CacheFuture<'a, usize>;

    fn most_recent_timestamp<'a>(&'a self) -> CacheFuture<'a, Option<i64>>;

    /// Mark that a full ranking snapshot was written at `written_at_ms`.
    fn record_snapshot_cycle<'a>(&'a self, written_at_ms: i64) -> CacheFuture<'a, ()>;

    /// When the latest full ranking snapshot was written. Pruning forgets
    /// cycles older than the cutoff.
    fn latest_snapshot_cycle<'a>(&'a self) -> CacheFuture<'a, Option<i64>>;

    fn get_by_symbol<'a>(&'a self, symbol: &'a str) -> CacheFuture<'a, Option<CachedStockRecord>>;

    fn get_all<'a>(&'a self) -> CacheFuture<'a, Vec<CachedStockRecord>>;

    /// Flag or unflag an existing row. Returns false when no row exists.
    fn set_watchlist<'a>(&'a self, symbol: &'a str, in_watchlist: bool) -> CacheFuture<'a, bool>;

    fn watchlist<'a>(&'a self) -> CacheFuture<'a, Vec<CachedStockRecord>>;
}

/// Process-local store backed by a tokio `RwLock`.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCacheStore {
    rows: Arc<tokio::sync::RwLock<HashMap<String, CachedStockRecord>>>,
    last_cycle: Arc<tokio::sync::RwLock<Option<i64>>>,
}

impl InMemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn put(&self, records: Vec<CachedStockRecord>) -> usize {
        let mut rows = self.rows.write().await;
        let written = records.len();
        for mut record in records {
            if let Some(existing) = rows.get(&record.symbol) {
                record.in_watchlist = existing.in_watchlist;
            }
            rows.insert(record.symbol.clone(), record);
        }
        written
    }
}

impl CacheStore for InMemoryCacheStore {
    fn upsert<'a>(&'a self, record: CachedStockRecord) -> CacheFuture<'a, ()> {
        Box::pin(async move {
            self.put(vec![record]).await;
            Ok(())
        })
    }

    fn bulk_upsert<'a>(&'a self, records: Vec<CachedStockRecord>) -> CacheFuture<'a, usize> {
        Box::pin(async move { Ok(self.put(records).await) })
    }

    fn delete_older_than<'a>(&'a self, cutoff_epoch_ms: i64) -> CacheFuture<'a, usize> {
        Box::pin(async move {
            let mut rows = self.rows.write().await;
            let before = rows.len();
            rows.retain(|_, row| row.in_watchlist || row.last_updated_epoch >= cutoff_epoch_ms);
            let mut last_cycle = self.last_cycle.write().await;
            if last_cycle.is_some_and(|written_at| written_at < cutoff_epoch_ms) {
                *last_cycle = None;
            }
            Ok(before - rows.len())
        })
    }

    fn count<'a>(&'a self) -> CacheFuture<'a, usize> {
        Box::pin(async move { Ok(self.rows.read().await.len()) })
    }

    fn most_recent_timestamp<'a>(&'a self) -> CacheFuture<'a, Option<i64>> {
        Box::pin(async move {
            let rows = self.rows.read().await;
            Ok(rows.values().map(|row| row.last_updated_epoch).max())
        })
    }

    fn record_snapshot_cycle<'a>(&'a self, written_at_ms: i64) -> CacheFuture<'a, ()> {
        Box::pin(async move {
            let mut last_cycle = self.last_cycle.write().await;
            *last_cycle = (*last_cycle).max(Some(written_at_ms));
            Ok(())
        })
    }

    fn latest_snapshot_cycle<'a>(&'a self) -> CacheFuture<'a, Option<i64>> {
        Box::pin(async move { Ok(*self.last_cycle.read().await) })
    }

    fn get_by_symbol<'a>(&'a self, symbol: &'a str) -> CacheFuture<'a, Option<CachedStockRecord>> {
        Box::pin(async move { Ok(self.rows.read().await.get(symbol).cloned()) })
    }

    fn get_all<'a>(&'a self) -> CacheFuture<'a, Vec<CachedStockRecord>> {
        Box::pin(async move {
            let rows = self.rows.read().await;
            let mut all = rows.values().cloned().collect::<Vec<_>>();
            all.sort_by(|left, right| left.symbol.cmp(&right.symbol));
            Ok(all)
        })
    }

    fn set_watchlist<'a>(&'a self, symbol: &'a str, in_watchlist: bool) -> CacheFuture<'a, bool> {
        Box::pin(async move {
            let mut rows = self.rows.write().await;
            Ok(match rows.get_mut(symbol) {
                Some(row) => {
                    row.in_watchlist = in_watchlist;
                    true
                }
                None => false,
            })
        })
    }

    fn watchlist<'a>(&'a self) -> CacheFuture<'a, Vec<CachedStockRecord>> {
        Box::pin(async move {
            let all = self.get_all().await?;
            Ok(all.into_iter().filter(|row| row.in_watchlist).collect())
        })
    }
}

/// DuckDB-backed store. Every call runs on tokio's blocking pool.
#[derive(Clone)]
pub struct WarehouseCacheStore {
    warehouse: Warehouse,
}

impl WarehouseCacheStore {
    pub fn new(warehouse: Warehouse) -> Self {
        Self { warehouse }
    }

    pub fn open(config: WarehouseConfig) -> Result<Self, CacheError> {
        Ok(Self::new(Warehouse::open(config)?))
    }

    pub fn warehouse(&self) -> &Warehouse {
        &self.warehouse
    }

    async fn run<T, F>(&self, operation: F) -> Result<T, CacheError>
    where
        T: Send + 'static,
        F: FnOnce(&Warehouse) -> Result<T, stockpulse_warehouse::WarehouseError> + Send + 'static,
    {
        let warehouse = self.warehouse.clone();
        tokio::task::spawn_blocking(move || operation(&warehouse))
            .await
            .map_err(|error| CacheError::Join(error.to_string()))?
            .map_err(CacheError::from)
    }
}

impl CacheStore for WarehouseCacheStore {
    fn upsert<'a>(&'a self, record: CachedStockRecord) -> CacheFuture<'a, ()> {
        Box::pin(async move {
            self.run(move |warehouse| warehouse.upsert_records(&[record]))
                .await
                .map(|_| ())
        })
    }

    fn bulk_upsert<'a>(&'a self, records: Vec<CachedStockRecord>) -> CacheFuture<'a, usize> {
        Box::pin(self.run(move |warehouse| warehouse.upsert_records(&records)))
    }

    fn delete_older_than<'a>(&'a self, cutoff_epoch_ms: i64) -> CacheFuture<'a, usize> {
        Box::pin(self.run(move |warehouse| warehouse.delete_older_than(cutoff_epoch_ms)))
    }

    fn count<'a>(&'a self) -> CacheFuture<'a, usize> {
        Box::pin(self.run(Warehouse::count))
    }

    fn most_recent_timestamp<'a>(&'a self) -> CacheFuture<'a, Option<i64>> {
        Box::pin(self.run(Warehouse::most_recent_timestamp))
    }

    fn record_snapshot_cycle<'a>(&'a self, written_at_ms: i64) -> CacheFuture<'a, ()> {
        Box::pin(self.run(move |warehouse| warehouse.record_snapshot_cycle(written_at_ms)))
    }

    fn latest_snapshot_cycle<'a>(&'a self) -> CacheFuture<'a, Option<i64>> {
        Box::pin(self.run(Warehouse::latest_snapshot_cycle))
    }

    fn get_by_symbol<'a>(&'a self, symbol: &'a str) -> CacheFuture<'a, Option<CachedStockRecord>> {
        let symbol = symbol.to_owned();
        Box::pin(self.run(move |warehouse| warehouse.record(&symbol)))
    }

    fn get_all<'a>(&'a self) -> CacheFuture<'a, Vec<CachedStockRecord>> {
        Box::pin(self.run(Warehouse::records))
    }

    fn set_watchlist<'a>(&'a self, symbol: &'a str, in_watchlist: bool) -> CacheFuture<'a, bool> {
        let symbol = symbol.to_owned();
        Box::pin(self.run(move |warehouse| warehouse.set_watchlist(&symbol, in_watchlist)))
    }

    fn watchlist<'a>(&'a self) -> CacheFuture<'a, Vec<CachedStockRecord>> {
        Box::pin(self.run(Warehouse::watchlist))
    }
}
