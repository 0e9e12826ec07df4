use serde_json::json;
use stockpulse_core::MarketDataGateway;

use crate::cli::{CacheArgs, CacheCommand};
use crate::error::CliError;

use super::CommandResult;

pub async fn run(args: &CacheArgs, gateway: &MarketDataGateway) -> Result<CommandResult, CliError> {
    match args.command {
        CacheCommand::Stats => {
            let stats = gateway.cache_stats().await?;
            Ok(CommandResult::ok(serde_json::to_value(stats)?))
        }
        CacheCommand::Prune => {
            let pruned = gateway.prune_expired().await?;
            Ok(CommandResult::ok(json!({ "pruned": pruned })))
        }
    }
}
