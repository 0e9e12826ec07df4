use serde_json::json;
use stockpulse_core::{SymbolValidator, Watchlist};

use crate::cli::{WatchlistArgs, WatchlistCommand};
use crate::error::CliError;

use super::CommandResult;

pub async fn run(args: &WatchlistArgs, validator: SymbolValidator) -> Result<CommandResult, CliError> {
    let watchlist = Watchlist::new(validator);

    match &args.command {
        WatchlistCommand::Add(symbol) => {
            let verified = watchlist.add(&symbol.symbol).await?;
            Ok(CommandResult::ok(serde_json::to_value(verified)?))
        }
        WatchlistCommand::Remove(symbol) => {
            let removed = watchlist.remove(&symbol.symbol).await?;
            let result = CommandResult::ok(json!({
                "symbol": symbol.symbol.trim().to_ascii_uppercase(),
                "removed": removed,
            }));
            if removed {
                Ok(result)
            } else {
                Ok(result.with_warning("symbol was not cached"))
            }
        }
        WatchlistCommand::List => {
            let rows = watchlist.list().await?;
            Ok(CommandResult::ok(serde_json::to_value(rows)?))
        }
    }
}
