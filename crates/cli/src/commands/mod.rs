pub mod config;
pub mod graph;
pub mod select;
pub mod similar;

use flavour_core::config::{AppConfig, ConfigOverrides, LoadOptions};
use flavour_core::graph::{BuiltGraph, GraphBuilder};
use flavour_core::{ApplicationError, Dataset};
use serde::Serialize;
use serde_json::Value;

const SERIALIZATION_EXIT_CODE: u8 = 1;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

impl CommandResult {
    /// Successful outcome carrying `data`. Data that cannot be represented as
    /// JSON turns the result into a `serialization` failure.
    pub fn success(command: &str, message: impl Into<String>, data: &impl Serialize) -> Self {
        let data = match serde_json::to_value(data) {
            Ok(data) => data,
            Err(error) => {
                return Self::failure(
                    command,
                    "serialization",
                    format!("failed to serialize {command} output: {error}"),
                    SERIALIZATION_EXIT_CODE,
                );
            }
        };

        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
            data: Some(data),
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
            data: None,
        };
        Self { exit_code, output: serialize_payload(payload) }
    }

    pub fn from_error(command: &str, error: &ApplicationError) -> Self {
        Self::failure(command, error.error_class(), error.to_string(), error.exit_code())
    }

    /// Plain-text output for human callers.
    pub fn text(output: impl Into<String>) -> Self {
        Self { exit_code: 0, output: output.into() }
    }
}

/// Loads configuration with CLI overrides, then the dataset and its graph.
pub(crate) fn load_graph(
    overrides: ConfigOverrides,
) -> Result<(AppConfig, Dataset, BuiltGraph), ApplicationError> {
    let config = AppConfig::load(LoadOptions { overrides, ..LoadOptions::default() })?;
    let dataset = Dataset::load(&config.data.dataset_path)?;
    let built = dataset.build_graph(&GraphBuilder::from_config(&config.graph));
    Ok((config, dataset, built))
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use serde_json::Value;

    use super::CommandResult;

    fn envelope(result: &CommandResult) -> Value {
        serde_json::from_str(&result.output).expect("envelope is json")
    }

    #[test]
    fn success_embeds_data() {
        let result = CommandResult::success("graph", "built", &BTreeMap::from([("edges", 3)]));
        let payload = envelope(&result);

        assert_eq!(result.exit_code, 0);
        assert_eq!(payload["status"], "ok");
        assert_eq!(payload["data"]["edges"], 3);
    }

    #[test]
    fn unserializable_data_reports_a_serialization_failure() {
        // JSON object keys must be strings
        let data = BTreeMap::from([((1u8, 2u8), "pair")]);
        let result = CommandResult::success("similar", "ranked", &data);
        let payload = envelope(&result);

        assert_eq!(result.exit_code, 1);
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "serialization");
        assert!(payload.get("data").is_none());
        assert!(payload["message"].as_str().unwrap_or_default().contains("similar"));
    }
}
