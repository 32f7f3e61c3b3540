use std::env;
use std::fs;
use std::path::Path;

use carrier_risk_core::config::{resolve_config_path, AppConfig, LoadOptions};
use secrecy::ExposeSecret;
use toml::Value;

struct Field<'a> {
    key_path: &'static str,
    env_keys: &'static [&'static str],
    value: &'a str,
}

pub fn run(options: LoadOptions) -> String {
    let config_file_path = resolve_config_path(options.config_path.as_deref());
    let config = match AppConfig::load(options) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let api_key = config
        .api
        .api_key
        .as_ref()
        .map(|key| redact_token(key.expose_secret()))
        .unwrap_or_else(|| "<unset>".to_string());
    let timeout_secs = config.api.timeout_secs.to_string();
    let debounce_ms = config.workflow.lookup_debounce_ms.to_string();
    let poll_secs = config.workflow.stats_poll_secs.to_string();
    let fallback_checks = config.workflow.stats_fallback_checks.to_string();
    let log_format = format!("{:?}", config.logging.format);

    let fields = [
        Field {
            key_path: "api.base_url",
            env_keys: &["CARRIER_RISK_API_BASE_URL"],
            value: &config.api.base_url,
        },
        Field { key_path: "api.api_key", env_keys: &["CARRIER_RISK_API_KEY"], value: &api_key },
        Field {
            key_path: "api.timeout_secs",
            env_keys: &["CARRIER_RISK_API_TIMEOUT_SECS"],
            value: &timeout_secs,
        },
        Field {
            key_path: "workflow.lookup_debounce_ms",
            env_keys: &["CARRIER_RISK_WORKFLOW_LOOKUP_DEBOUNCE_MS"],
            value: &debounce_ms,
        },
        Field {
            key_path: "workflow.stats_poll_secs",
            env_keys: &["CARRIER_RISK_WORKFLOW_STATS_POLL_SECS"],
            value: &poll_secs,
        },
        Field {
            key_path: "workflow.stats_fallback_checks",
            env_keys: &["CARRIER_RISK_WORKFLOW_STATS_FALLBACK_CHECKS"],
            value: &fallback_checks,
        },
        Field {
            key_path: "logging.level",
            env_keys: &["CARRIER_RISK_LOGGING_LEVEL", "CARRIER_RISK_LOG_LEVEL"],
            value: &config.logging.level,
        },
        Field {
            key_path: "logging.format",
            env_keys: &["CARRIER_RISK_LOGGING_FORMAT", "CARRIER_RISK_LOG_FORMAT"],
            value: &log_format,
        },
    ];

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    lines.extend(fields.iter().map(|field| {
        render_line(
            field.key_path,
            field.value,
            field_source(
                field.key_path,
                field.env_keys,
                config_file_doc.as_ref(),
                config_file_path.as_deref(),
            ),
        )
    }));
    lines.join("\n")
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

/// Keeps at most the first four characters of a key.
fn redact_token(token: &str) -> String {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }
    if trimmed.len() > 8 {
        let prefix: String = trimmed.chars().take(4).collect();
        return format!("{prefix}***");
    }
    "<redacted>".to_string()
}
