use stockpulse_core::{FreshnessLabel, MarketDataGateway};

use crate::cli::SnapshotArgs;
use crate::error::CliError;

use super::CommandResult;

pub async fn run(args: &SnapshotArgs, gateway: &MarketDataGateway) -> Result<CommandResult, CliError> {
    let report = gateway.get_snapshot_report(args.refresh).await;
    let freshness = report.snapshot.freshness;

    let mut result = CommandResult::ok(serde_json::to_value(&report)?);
    if freshness == FreshnessLabel::Simulated {
        result = result.with_warning("rankings are simulated; live data was unavailable");
    }
    Ok(result)
}
