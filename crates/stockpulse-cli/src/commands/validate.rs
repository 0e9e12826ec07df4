use stockpulse_core::SymbolValidator;

use crate::cli::SymbolArgs;
use crate::error::CliError;

use super::CommandResult;

/// A rejected symbol is an error so the exit code reflects the verdict.
pub async fn run(args: &SymbolArgs, validator: SymbolValidator) -> Result<CommandResult, CliError> {
    let verified = validator.validate(args.symbol.trim()).await?;
    Ok(CommandResult::ok(serde_json::to_value(verified)?))
}
