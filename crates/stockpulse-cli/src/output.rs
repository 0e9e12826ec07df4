use serde::Serialize;
use serde_json::Value;

use crate::commands::CommandResult;
use crate::error::CliError;

#[derive(Debug, Serialize)]
struct Document<'a> {
    data: &'a Value,
    #[serde(skip_serializing_if = "no_warnings")]
    warnings: &'a [String],
}

fn no_warnings(warnings: &&[String]) -> bool {
    warnings.is_empty()
}

pub fn render(result: &CommandResult, pretty: bool) -> Result<(), CliError> {
    let payload = to_json(result, pretty)?;
    println!("{payload}");
    Ok(())
}

fn to_json(result: &CommandResult, pretty: bool) -> Result<String, CliError> {
    let document = Document {
        data: &result.data,
        warnings: &result.warnings,
    };
    let payload = if pretty {
        serde_json::to_string_pretty(&document)?
    } else {
        serde_json::to_string(&document)?
    };
    Ok(payload)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn warnings_are_omitted_when_empty() {
        let quiet = CommandResult::ok(json!({ "rows": 3 }));
        let noisy = CommandResult::ok(json!({ "rows": 3 })).with_warning("served from simulation");

        assert_eq!(to_json(&quiet, false).expect("json"), r#"{"data":{"rows":3}}"#);
        assert_eq!(
            to_json(&noisy, false).expect("json"),
            r#"{"data":{"rows":3},"warnings":["served from simulation"]}"#
        );
    }
}
