use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::ExposeSecret;
use slashspot_core::config::{resolve_config_path, AppConfig, LoadOptions};
use toml::Value;

use super::{CommandResult, EXIT_CONFIG};

pub fn run(options: LoadOptions) -> CommandResult {
    let config_file_path = resolve_config_path(options.config_path.as_deref());
    let config = match AppConfig::load(options) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::text(EXIT_CONFIG, format!("config validation failed: {error}"))
        }
    };

    CommandResult::text(0, render(&config, config_file_path))
}

/// One line per effective setting, annotated with where the value came from.
pub fn render(config: &AppConfig, config_file_path: Option<PathBuf>) -> String {
    let sources = Sources::new(config_file_path);
    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];

    lines.push(sources.line(
        "storage.data_dir",
        &config.storage.data_dir.display().to_string(),
        &["SLASHSPOT_STORAGE_DATA_DIR", "SPOT_DATA_DIR"],
    ));
    lines.push(sources.line(
        "storage.data_file",
        &config.storage.data_file,
        &["SLASHSPOT_STORAGE_DATA_FILE", "SPOT_DATA_FILE"],
    ));

    lines.push(sources.line(
        "slack.signing_secret",
        &redact_secret(config.slack.signing_secret.expose_secret()),
        &["SLASHSPOT_SLACK_SIGNING_SECRET", "SPOT_SLACK_SIGNING_SECRET"],
    ));
    lines.push(sources.line(
        "slack.max_request_age_secs",
        &config.slack.max_request_age_secs.to_string(),
        &["SLASHSPOT_SLACK_MAX_REQUEST_AGE_SECS"],
    ));
    lines.push(sources.line("slack.command", &config.slack.command, &["SLASHSPOT_SLACK_COMMAND"]));

    lines.push(sources.line(
        "server.bind_address",
        &config.server.bind_address,
        &["SLASHSPOT_SERVER_BIND_ADDRESS"],
    ));
    lines.push(sources.line(
        "server.port",
        &config.server.port.to_string(),
        &["SLASHSPOT_SERVER_PORT", "SPOT_SERVER_PORT"],
    ));
    lines.push(sources.line(
        "server.graceful_shutdown_secs",
        &config.server.graceful_shutdown_secs.to_string(),
        &["SLASHSPOT_SERVER_GRACEFUL_SHUTDOWN_SECS"],
    ));

    lines.push(sources.line(
        "logging.level",
        &config.logging.level,
        &["SLASHSPOT_LOGGING_LEVEL", "SLASHSPOT_LOG_LEVEL"],
    ));
    lines.push(sources.line(
        "logging.format",
        &format!("{:?}", config.logging.format),
        &["SLASHSPOT_LOGGING_FORMAT", "SLASHSPOT_LOG_FORMAT"],
    ));

    lines.join("\n")
}

struct Sources {
    path: Option<PathBuf>,
    doc: Option<Value>,
}

impl Sources {
    fn new(path: Option<PathBuf>) -> Self {
        let doc = load_config_file_doc(path.as_deref());
        Self { path, doc }
    }

    fn line(&self, key_path: &str, value: &str, env_keys: &[&str]) -> String {
        format!("- {key_path} = {value} (source: {})", self.source(key_path, env_keys))
    }

    fn source(&self, key_path: &str, env_keys: &[&str]) -> String {
        let set_env = env_keys.iter().find(|key| {
            env::var(key).map(|value| !value.trim().is_empty()).unwrap_or(false)
        });
        if let Some(env_key) = set_env {
            return format!("env ({env_key})");
        }

        if let Some(doc) = &self.doc {
            if contains_path(doc, key_path) {
                let file_path = self
                    .path
                    .as_ref()
                    .map(|path| path.display().to_string())
                    .unwrap_or_else(|| "config file".to_string());
                return format!("file ({file_path})");
            }
        }

        "default".to_string()
    }
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
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

fn redact_secret(secret: &str) -> String {
    let trimmed = secret.trim();
    match trimmed.chars().count() {
        0 => "<empty>".to_string(),
        1..=8 => "<redacted>".to_string(),
        count => {
            let tail: String = trimmed.chars().skip(count - 4).collect();
            format!("***{tail}")
        }
    }
}
