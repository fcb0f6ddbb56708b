//! Typed configuration (§6 Configuration).
//!
//! Layered load: built-in defaults, then an optional JSON document, then
//! environment overrides prefixed `TASKRUNNER_` (double underscore separates
//! nesting, e.g. `TASKRUNNER_NOTIFICATIONS__DEFAULT_ON_FAILURE`). Every
//! struct denies unknown fields (§9 "config object" patterns) so a typo in
//! the config file surfaces as a startup error rather than being ignored.

use anyhow::{Context, Result};
use serde::Deserialize;

fn default_port() -> u16 {
    1937
}
fn default_db_path() -> String {
    "./data/runner.sqlite".to_string()
}
fn default_max_concurrency() -> usize {
    4
}
fn default_run_retention_days() -> i64 {
    30
}
fn default_state_cleanup_interval_ms() -> u64 {
    3_600_000
}
fn default_shutdown_grace_ms() -> u64 {
    30_000
}
fn default_reconcile_interval_ms() -> u64 {
    60_000
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_file() -> String {
    "stdout".to_string()
}
fn default_gateway_url() -> String {
    "http://127.0.0.1:18789".to_string()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct NotificationsConfig {
    pub slack_token_path: Option<String>,
    pub default_on_failure: Option<String>,
    pub default_on_success: Option<String>,
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            slack_token_path: None,
            default_on_failure: None,
            default_on_success: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct LogConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_file")]
    pub file: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct GatewayConfig {
    #[serde(default = "default_gateway_url")]
    pub url: String,
    pub token_path: Option<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            url: default_gateway_url(),
            token_path: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct AppConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_db_path")]
    pub db_path: String,
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    #[serde(default = "default_run_retention_days")]
    pub run_retention_days: i64,
    #[serde(default = "default_state_cleanup_interval_ms")]
    pub state_cleanup_interval_ms: u64,
    #[serde(default = "default_shutdown_grace_ms")]
    pub shutdown_grace_ms: u64,
    #[serde(default = "default_reconcile_interval_ms")]
    pub reconcile_interval_ms: u64,
    #[serde(default)]
    pub notifications: NotificationsConfig,
    #[serde(default)]
    pub log: LogConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            db_path: default_db_path(),
            max_concurrency: default_max_concurrency(),
            run_retention_days: default_run_retention_days(),
            state_cleanup_interval_ms: default_state_cleanup_interval_ms(),
            shutdown_grace_ms: default_shutdown_grace_ms(),
            reconcile_interval_ms: default_reconcile_interval_ms(),
            notifications: NotificationsConfig::default(),
            log: LogConfig::default(),
            gateway: GatewayConfig::default(),
        }
    }
}

const DEFAULT_CONFIG_FILE: &str = "./config.json";

impl AppConfig {
    /// Load defaults, layer an optional JSON file (`TASKRUNNER_CONFIG_FILE`, or
    /// `./config.json` if present), then environment overrides.
    pub fn load() -> Result<Self> {
        let config_file = std::env::var("TASKRUNNER_CONFIG_FILE").unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());

        let mut builder = config::Config::builder();
        if std::path::Path::new(&config_file).is_file() {
            builder = builder.add_source(config::File::with_name(&config_file));
        }
        builder = builder.add_source(
            config::Environment::with_prefix("TASKRUNNER")
                .separator("__")
                .try_parsing(true),
        );

        let raw = builder.build().context("failed to assemble configuration sources")?;

        // An empty source set deserializes fine against `#[serde(default)]`, but
        // `config` errors on a config document with zero keys; fall back explicitly.
        match raw.try_deserialize::<AppConfig>() {
            Ok(cfg) => Ok(cfg),
            Err(config::ConfigError::NotFound(_)) => Ok(AppConfig::default()),
            Err(e) => Err(e).context("failed to parse configuration"),
        }
    }
}
