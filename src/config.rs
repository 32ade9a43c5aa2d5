use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, anyhow};
use jsonschema::{JSONSchema, ValidationError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

const SCHEMA_FILE_NAME: &str = "rsm.schema.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub manager: ManagerConfig,
    pub run: RunConfig,
    #[serde(default)]
    pub poller: PollerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_manager_endpoint() -> String {
    "http://localhost".to_string()
}

fn default_api_version() -> String {
    "v3.1".to_string()
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

fn default_poll_interval_ms() -> u64 {
    5_000
}

fn default_poll_timeout_ms() -> i64 {
    180_000
}

fn default_success_statuses() -> Vec<String> {
    vec!["terminated".to_string(), "cancelled".to_string()]
}

fn default_failure_statuses() -> Vec<String> {
    vec!["failed".to_string()]
}

fn default_enabled_true() -> bool {
    true
}

fn default_logging_filter() -> String {
    "info".to_string()
}

fn default_logging_rotation() -> LoggingRotation {
    LoggingRotation::Daily
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManagerConfig {
    #[serde(default = "default_manager_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_api_version")]
    pub api_version: String,
    #[serde(default)]
    pub tenant: Option<String>,
    #[serde(default)]
    pub extra_headers: BTreeMap<String, String>,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            endpoint: default_manager_endpoint(),
            api_version: default_api_version(),
            tenant: None,
            extra_headers: BTreeMap::new(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

/// Poll cadence for remote executions. A negative `timeout_ms` waits forever.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollerConfig {
    #[serde(default = "default_poll_interval_ms")]
    pub interval_ms: u64,
    #[serde(default = "default_poll_timeout_ms")]
    pub timeout_ms: i64,
    #[serde(default = "default_success_statuses")]
    pub success_statuses: Vec<String>,
    #[serde(default = "default_failure_statuses")]
    pub failure_statuses: Vec<String>,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_poll_interval_ms(),
            timeout_ms: default_poll_timeout_ms(),
            success_statuses: default_success_statuses(),
            failure_statuses: default_failure_statuses(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum EngineMode {
    #[default]
    Simple,
    Parallel,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    pub deployment_id: String,
    pub project_id: String,
    #[serde(default)]
    pub mode: EngineMode,
    pub profile: String,
    #[serde(default)]
    pub entities_path: Option<PathBuf>,
    #[serde(default = "default_enabled_true")]
    pub fail_on_errors: bool,
    #[serde(default = "default_enabled_true")]
    pub report: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum LoggingRotation {
    Daily,
    Hourly,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_filter")]
    pub filter: String,
    #[serde(default)]
    pub dir: Option<PathBuf>,
    #[serde(default = "default_logging_rotation")]
    pub rotation: LoggingRotation,
    #[serde(default = "default_enabled_true")]
    pub stderr: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_logging_filter(),
            dir: None,
            rotation: default_logging_rotation(),
            stderr: true,
        }
    }
}

impl Config {
    pub fn load(config_path: &Path) -> Result<Self> {
        let config_content = fs::read_to_string(config_path)
            .with_context(|| format!("failed to read {}", config_path.display()))?;
        let config_value: Value = json5::from_str(&config_content)
            .with_context(|| format!("failed to parse {}", config_path.display()))?;

        let config_base = config_path.parent().unwrap_or_else(|| Path::new("."));
        let schema_path = resolve_schema_path(config_base, &config_value)?;
        validate_against_schema(&config_value, &schema_path)?;

        let mut config: Config =
            serde_json::from_value(config_value).context("failed to deserialize rsm config")?;

        if let Some(entities_path) = &mut config.run.entities_path
            && !entities_path.is_absolute()
        {
            *entities_path = config_base.join(&*entities_path);
        }
        if let Some(dir) = &mut config.logging.dir
            && !dir.is_absolute()
        {
            *dir = config_base.join(&*dir);
        }

        Ok(config)
    }
}

fn resolve_schema_path(config_base: &Path, config_value: &Value) -> Result<PathBuf> {
    if let Some(path_text) = config_value.get("$schema").and_then(Value::as_str) {
        let configured = PathBuf::from(path_text);
        if configured.is_absolute() {
            return Ok(configured);
        }
        return Ok(config_base.join(&configured));
    }

    let local_default = config_base.join(SCHEMA_FILE_NAME);
    if local_default.exists() {
        return Ok(local_default);
    }

    Err(anyhow!(
        "unable to resolve schema path: expected $schema in config or {} next to it",
        SCHEMA_FILE_NAME
    ))
}

fn validate_against_schema(config_value: &Value, schema_path: &Path) -> Result<()> {
    let schema_content = fs::read_to_string(schema_path)
        .with_context(|| format!("failed to read schema {}", schema_path.display()))?;
    let schema: Value = serde_json::from_str(&schema_content)
        .with_context(|| format!("failed to parse schema {}", schema_path.display()))?;

    let compiled =
        JSONSchema::compile(&schema).map_err(|e| anyhow!("failed to compile schema: {e}"))?;

    let result = compiled.validate(config_value);
    if let Err(errors) = result {
        let errors: Vec<ValidationError> = errors.collect();
        let messages = errors
            .iter()
            .map(|error| format!("{} at '{}'", error, error.instance_path))
            .collect::<Vec<_>>();
        return Err(anyhow!("config validation failed: {}", messages.join("; ")));
    }
    Ok(())
}
