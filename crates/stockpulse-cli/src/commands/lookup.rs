//! Single-symbol reads: quote, overview and daily series.

use serde::Serialize;
use stockpulse_core::{ChartPoint, MarketDataGateway};

use crate::cli::SymbolArgs;
use crate::error::CliError;

use super::CommandResult;

#[derive(Debug, Serialize)]
struct SeriesResponseData<'a> {
    symbol: String,
    points: &'a [ChartPoint],
}

pub async fn quote(args: &SymbolArgs, gateway: &MarketDataGateway) -> Result<CommandResult, CliError> {
    let quote = gateway.get_single_quote(&symbol_of(args)).await?;
    Ok(CommandResult::ok(serde_json::to_value(quote)?))
}

pub async fn overview(args: &SymbolArgs, gateway: &MarketDataGateway) -> Result<CommandResult, CliError> {
    let overview = gateway.get_company_overview(&symbol_of(args)).await?;
    Ok(CommandResult::ok(serde_json::to_value(overview)?))
}

pub async fn series(args: &SymbolArgs, gateway: &MarketDataGateway) -> Result<CommandResult, CliError> {
    let symbol = symbol_of(args);
    let series = gateway.get_daily_series(&symbol).await?;
    let data = serde_json::to_value(SeriesResponseData {
        symbol,
        points: series.points(),
    })?;
    Ok(CommandResult::ok(data))
}

fn symbol_of(args: &SymbolArgs) -> String {
    args.symbol.trim().to_ascii_uppercase()
}
