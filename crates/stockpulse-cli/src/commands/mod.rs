mod cache;
mod lookup;
mod simulate;
mod snapshot;
mod validate;
mod watchlist;

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use stockpulse_core::{
    AlphaVantageClient, CacheStore, GatewayConfig, InMemoryCacheStore, MarketDataGateway,
    SymbolValidator, WarehouseCacheStore, WarehouseConfig,
};

use crate::cli::{Cli, Command};
use crate::error::CliError;

pub struct CommandResult {
    pub data: Value,
    pub warnings: Vec<String>,
}

impl CommandResult {
    pub fn ok(data: Value) -> Self {
        Self {
            data,
            warnings: Vec::new(),
        }
    }

    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warnings.push(warning.into());
        self
    }
}

pub async fn run(cli: &Cli) -> Result<CommandResult, CliError> {
    match &cli.command {
        Command::Simulate(args) => simulate::run(args, &gateway_config(cli)),
        Command::Snapshot(args) => snapshot::run(args, &build_gateway(cli)?).await,
        Command::Quote(args) => lookup::quote(args, &build_gateway(cli)?).await,
        Command::Overview(args) => lookup::overview(args, &build_gateway(cli)?).await,
        Command::Series(args) => lookup::series(args, &build_gateway(cli)?).await,
        Command::Validate(args) => {
            validate::run(args, SymbolValidator::new(build_gateway(cli)?)).await
        }
        Command::Watchlist(args) => {
            watchlist::run(args, SymbolValidator::new(build_gateway(cli)?)).await
        }
        Command::Cache(args) => cache::run(args, &build_gateway(cli)?).await,
    }
}

fn gateway_config(cli: &Cli) -> GatewayConfig {
    let mut config = GatewayConfig::from_env();
    if cli.offline {
        config = config.without_api_key();
    }
    if let Some(timeout_ms) = cli.timeout_ms {
        config = config.with_remote_timeout(Duration::from_millis(timeout_ms));
    }
    config
}

fn build_gateway(cli: &Cli) -> Result<MarketDataGateway, CliError> {
    let config = gateway_config(cli);
    let cache: Arc<dyn CacheStore> = if cli.memory {
        Arc::new(InMemoryCacheStore::new())
    } else {
        Arc::new(WarehouseCacheStore::open(WarehouseConfig::default())?)
    };
    let remote = AlphaVantageClient::default()
        .with_timeout_ms(u64::try_from(config.remote_timeout.as_millis()).unwrap_or(u64::MAX));

    tracing::debug!(
        live = config.usable_api_key().is_some(),
        memory = cli.memory,
        "gateway ready"
    );
    Ok(MarketDataGateway::new(Arc::new(remote), cache, config))
}
