use std::env;
use std::fs;
use std::path::Path;

use supportdesk_core::config::resolve_config_path;
use toml::Value;

use crate::commands::{load_config, CommandResult};

/// One rendered setting: dotted key, display value, env keys that can override it.
struct Field {
    key: &'static str,
    value: String,
    env_keys: &'static [&'static str],
}

pub fn run() -> CommandResult {
    let config = match load_config("config") {
        Ok(config) => config,
        Err(result) => return result,
    };

    let config_file_path = resolve_config_path(None);
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let webhook_url = if config.handoff.webhook_url().is_some() { "<redacted>" } else { "<unset>" };
    let fields = [
        Field {
            key: "database.url",
            value: config.database.url.clone(),
            env_keys: &["SUPPORTDESK_DATABASE_URL"],
        },
        Field {
            key: "database.max_connections",
            value: config.database.max_connections.to_string(),
            env_keys: &["SUPPORTDESK_DATABASE_MAX_CONNECTIONS"],
        },
        Field {
            key: "database.timeout_secs",
            value: config.database.timeout_secs.to_string(),
            env_keys: &["SUPPORTDESK_DATABASE_TIMEOUT_SECS"],
        },
        Field {
            key: "server.bind_address",
            value: config.server.bind_address.clone(),
            env_keys: &["SUPPORTDESK_SERVER_BIND_ADDRESS"],
        },
        Field {
            key: "server.port",
            value: config.server.port.to_string(),
            env_keys: &["SUPPORTDESK_SERVER_PORT"],
        },
        Field {
            key: "server.allowed_origins",
            value: config.server.allowed_origins.join(","),
            env_keys: &["SUPPORTDESK_SERVER_ALLOWED_ORIGINS"],
        },
        Field {
            key: "retrieval.top_k",
            value: config.retrieval.top_k.to_string(),
            env_keys: &["SUPPORTDESK_RETRIEVAL_TOP_K"],
        },
        Field {
            key: "retrieval.confidence_threshold",
            value: config.retrieval.confidence_threshold.to_string(),
            env_keys: &["SUPPORTDESK_RETRIEVAL_CONFIDENCE_THRESHOLD"],
        },
        Field {
            key: "handoff.webhook_url",
            value: webhook_url.to_string(),
            env_keys: &["SUPPORTDESK_HANDOFF_WEBHOOK_URL", "HANDOFF_WEBHOOK_URL"],
        },
        Field {
            key: "handoff.timeout_secs",
            value: config.handoff.timeout_secs.to_string(),
            env_keys: &["SUPPORTDESK_HANDOFF_TIMEOUT_SECS"],
        },
        Field {
            key: "logging.level",
            value: config.logging.level.clone(),
            env_keys: &["SUPPORTDESK_LOGGING_LEVEL", "SUPPORTDESK_LOG_LEVEL"],
        },
        Field {
            key: "logging.format",
            value: format!("{:?}", config.logging.format),
            env_keys: &["SUPPORTDESK_LOGGING_FORMAT", "SUPPORTDESK_LOG_FORMAT"],
        },
    ];

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    lines.extend(fields.iter().map(|field| {
        let source = field_source(
            field.key,
            field.env_keys,
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        );
        render_line(field.key, &field.value, source)
    }));

    CommandResult::success("config", lines.join("\n"))
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
    if let Some(env_key) = env_keys
        .iter()
        .find(|key| env::var(key).is_ok_and(|value| !value.trim().is_empty()))
    {
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
