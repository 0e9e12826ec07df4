use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use stockpulse_core::{GatewayConfig, MarketSimulationEngine};

use crate::cli::SimulateArgs;
use crate::error::CliError;

use super::CommandResult;

/// One simulator pass. The instant is read in the market offset so
/// `--at` values in any offset land on the same session.
pub fn run(args: &SimulateArgs, config: &GatewayConfig) -> Result<CommandResult, CliError> {
    let at = match &args.at {
        Some(raw) => parse_instant(raw)?,
        None => OffsetDateTime::now_utc(),
    };

    let pass = MarketSimulationEngine::default().generate_snapshot(at.to_offset(config.market_offset));
    let mut result = CommandResult::ok(serde_json::to_value(&pass)?);
    if pass.snapshot.is_empty() {
        result = result.with_warning("simulation produced no quotes");
    }
    Ok(result)
}

fn parse_instant(raw: &str) -> Result<OffsetDateTime, CliError> {
    OffsetDateTime::parse(raw.trim(), &Rfc3339)
        .map_err(|error| CliError::Usage(format!("--at '{raw}' is not RFC 3339: {error}")))
}
