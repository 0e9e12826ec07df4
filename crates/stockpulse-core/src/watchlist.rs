use stockpulse_warehouse::CachedStockRecord;

use crate::validator::{SymbolValidator, VerifiedSymbol};
use crate::SymbolRejection;

/// Watchlist backed by the quote cache's `in_watchlist` flag.
///
/// Only symbols the validator admits can be flagged.
#[derive(Clone)]
pub struct Watchlist {
    validator: SymbolValidator,
}

impl Watchlist {
    pub fn new(validator: SymbolValidator) -> Self {
        Self { validator }
    }

    /// Validate, make sure a cache row exists, then flag it.
    pub async fn add(&self, symbol: &str) -> Result<VerifiedSymbol, SymbolRejection> {
        let verified = self.validator.validate(symbol.trim()).await?;
        let gateway = self.validator.gateway();
        let cache = gateway.cache();

        if cache.get_by_symbol(&verified.symbol).await?.is_none() {
            let name = verified.name.clone().unwrap_or_else(|| {
                gateway
                    .engine()
                    .directory()
                    .get(&verified.symbol)
                    .map_or_else(|| verified.symbol.clone(), |profile| profile.name.clone())
            });
            let price = gateway.base_price(&verified.symbol).await;
            cache
                .upsert(CachedStockRecord {
                    symbol: verified.symbol.clone(),
                    name,
                    price,
                    change: 0.0,
                    change_percent: 0.0,
                    volume: 0,
                    last_updated_epoch: gateway.market_now().unix_timestamp() * 1_000,
                    in_watchlist: true,
                })
                .await?;
        }

        cache.set_watchlist(&verified.symbol, true).await?;
        tracing::info!(symbol = %verified.symbol, "added to watchlist");
        Ok(verified)
    }

    /// Unflag a symbol. Returns false when it was not cached.
    pub async fn remove(&self, symbol: &str) -> Result<bool, SymbolRejection> {
        let symbol = symbol.trim().to_ascii_uppercase();
        Ok(self
            .validator
            .gateway()
            .cache()
            .set_watchlist(&symbol, false)
            .await?)
    }

    pub async fn list(&self) -> Result<Vec<CachedStockRecord>, SymbolRejection> {
        Ok(self.validator.gateway().cache().watchlist().await?)
    }
}
