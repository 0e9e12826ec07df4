//! Ticker admission for the persistent watchlist.
//!
//! Validation fails closed: a symbol is admitted only when a fresh snapshot
//! lists it or an overview gives it a real company name. Timeouts, errors and
//! placeholder answers are all rejections.

use std::future::Future;

use serde::Serialize;

use crate::config::ValidatorConfig;
use crate::gateway::MarketDataGateway;
use crate::{is_reserved, SymbolRejection};

const MAX_SYMBOL_LEN: usize = 10;

/// Which existence check admitted the symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verification {
    Snapshot,
    Overview,
}

/// An admitted symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerifiedSymbol {
    pub symbol: String,
    pub verified_by: Verification,
    /// Company name when the overview check ran.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

enum Stage<T> {
    Done(T),
    Inconclusive,
    TimedOut,
}

#[derive(Clone)]
pub struct SymbolValidator {
    gateway: MarketDataGateway,
    config: ValidatorConfig,
}

impl SymbolValidator {
    pub fn new(gateway: MarketDataGateway) -> Self {
        Self {
            gateway,
            config: ValidatorConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ValidatorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn gateway(&self) -> &MarketDataGateway {
        &self.gateway
    }

    pub async fn is_valid(&self, symbol: &str) -> bool {
        self.validate(symbol).await.is_ok()
    }

    pub async fn validate(&self, symbol: &str) -> Result<VerifiedSymbol, SymbolRejection> {
        if !is_well_formed(symbol) {
            return Err(SymbolRejection::InvalidFormat {
                symbol: symbol.to_owned(),
            });
        }
        if is_reserved(symbol) {
            return Err(SymbolRejection::Reserved {
                symbol: symbol.to_owned(),
            });
        }

        let normalized = symbol.to_ascii_uppercase();

        let snapshot_stage = bounded(self.config.snapshot_timeout, async {
            let snapshot = self.gateway.get_snapshot(true).await;
            snapshot.contains(&normalized).then_some(())
        })
        .await;
        if let Stage::Done(()) = snapshot_stage {
            tracing::debug!(symbol = %normalized, "verified by snapshot");
            return Ok(VerifiedSymbol {
                symbol: normalized,
                verified_by: Verification::Snapshot,
                name: None,
            });
        }

        let overview_stage = bounded(self.config.overview_timeout, async {
            match self.gateway.get_company_overview(&normalized).await {
                Ok(overview) if overview.has_meaningful_name(symbol) => Some(overview.name),
                Ok(_) => None,
                Err(error) => {
                    tracing::debug!(symbol = %normalized, %error, "overview check failed");
                    None
                }
            }
        })
        .await;
        if let Stage::Done(name) = overview_stage {
            tracing::debug!(symbol = %normalized, "verified by overview");
            return Ok(VerifiedSymbol {
                symbol: normalized,
                verified_by: Verification::Overview,
                name: Some(name),
            });
        }

        let timed_out = matches!(snapshot_stage, Stage::TimedOut)
            || matches!(overview_stage, Stage::TimedOut);
        tracing::info!(symbol = %normalized, timed_out, "symbol rejected");
        if timed_out {
            Err(SymbolRejection::TimedOut { symbol: normalized })
        } else {
            Err(SymbolRejection::Unverified { symbol: normalized })
        }
    }
}

/// `^[A-Za-z0-9.+-]{1,10}$`
pub fn is_well_formed(symbol: &str) -> bool {
    let len = symbol.chars().count();
    (1..=MAX_SYMBOL_LEN).contains(&len)
        && symbol
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '.' | '-' | '+'))
}

async fn bounded<T, F>(timeout: std::time::Duration, check: F) -> Stage<T>
where
    F: Future<Output = Option<T>>,
{
    match tokio::time::timeout(timeout, check).await {
        Ok(Some(value)) => Stage::Done(value),
        Ok(None) => Stage::Inconclusive,
        Err(_) => Stage::TimedOut,
    }
}
