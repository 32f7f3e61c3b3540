pub mod categories;
pub mod check;
pub mod config;
pub mod stats;
pub mod watch;

use std::fmt::Display;

use carrier_risk_core::errors::{ApplicationError, GatewayError, InterfaceError};
use serde::Serialize;
use uuid::Uuid;

pub const EXIT_CONFIG: u8 = 2;
pub const EXIT_INPUT: u8 = 3;
pub const EXIT_LOOKUP: u8 = 4;
pub const EXIT_REPORT: u8 = 5;
pub const EXIT_DELIVERY: u8 = 6;
pub const EXIT_RUNTIME: u8 = 7;

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
}

#[derive(Debug, Serialize)]
struct InterfaceFailure<'a> {
    command: &'a str,
    status: &'static str,
    error_class: &'a str,
    message: String,
    user_message: &'static str,
    correlation_id: &'a str,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
        };
        Self { exit_code: 0, output: serialize_payload(&payload) }
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
        };
        Self { exit_code, output: serialize_payload(&payload) }
    }

    /// Failure rendered through the interface error tier: the detail stays in `message`,
    /// the operator-facing text in `user_message`.
    pub fn interface_failure(
        command: &str,
        error_class: &str,
        error: &InterfaceError,
        exit_code: u8,
    ) -> Self {
        let payload = InterfaceFailure {
            command,
            status: "error",
            error_class,
            message: error.to_string(),
            user_message: error.user_message(),
            correlation_id: error.correlation_id(),
        };
        Self { exit_code, output: serialize_payload(&payload) }
    }

    pub fn payload(exit_code: u8, payload: &impl Serialize) -> Self {
        Self { exit_code, output: serialize_payload(payload) }
    }
}

fn serialize_payload(payload: &impl Serialize) -> String {
    serde_json::to_string(payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

pub(crate) fn current_thread_runtime(command: &str) -> Result<tokio::runtime::Runtime, CommandResult> {
    tokio::runtime::Builder::new_current_thread().enable_all().build().map_err(|error| {
        CommandResult::failure(
            command,
            "runtime",
            format!("failed to initialize async runtime: {error}"),
            EXIT_RUNTIME,
        )
    })
}

pub(crate) fn config_failure(command: &str, error: impl Display) -> CommandResult {
    let error = ApplicationError::Configuration(error.to_string())
        .into_interface(Uuid::new_v4().to_string());
    CommandResult::interface_failure(command, "config_validation", &error, EXIT_CONFIG)
}

pub(crate) fn gateway_failure(command: &str, error: GatewayError) -> CommandResult {
    let error = ApplicationError::from(error).into_interface(Uuid::new_v4().to_string());
    CommandResult::interface_failure(command, "gateway", &error, EXIT_RUNTIME)
}

#[cfg(test)]
mod tests {
    use carrier_risk_core::errors::GatewayError;

    use super::{config_failure, gateway_failure, EXIT_CONFIG, EXIT_RUNTIME};

    #[test]
    fn config_failure_maps_to_internal_interface_error() {
        let result = config_failure("check", "api.base_url is empty");
        let payload: serde_json::Value = serde_json::from_str(&result.output).expect("json");

        assert_eq!(result.exit_code, EXIT_CONFIG);
        assert_eq!(payload["error_class"], "config_validation");
        assert_eq!(payload["message"], "internal error: api.base_url is empty");
        assert_eq!(payload["user_message"], "An unexpected internal error occurred.");
        assert_eq!(payload["correlation_id"].as_str().map(str::len), Some(36));
    }

    #[test]
    fn gateway_failure_maps_to_service_unavailable() {
        let result =
            gateway_failure("stats", GatewayError::Transport("failed to build http client".to_owned()));
        let payload: serde_json::Value = serde_json::from_str(&result.output).expect("json");

        assert_eq!(result.exit_code, EXIT_RUNTIME);
        assert_eq!(payload["error_class"], "gateway");
        assert!(payload["message"]
            .as_str()
            .unwrap_or_default()
            .starts_with("service unavailable: "));
    }
}
