use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result, anyhow};
use jsonschema::{JSONSchema, ValidationError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default = "default_registries")]
    pub registries: BTreeMap<String, RegistryEndpointConfig>,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub jobs: JobsConfig,
    #[serde(default)]
    pub saga: SagaRuntimeConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            logging: LoggingConfig::default(),
            registries: default_registries(),
            retry: RetryConfig::default(),
            jobs: JobsConfig::default(),
            saga: SagaRuntimeConfig::default(),
        }
    }
}

fn default_registries() -> BTreeMap<String, RegistryEndpointConfig> {
    BTreeMap::from([(
        "narnia".to_string(),
        RegistryEndpointConfig {
            url: "http://localhost:5000".to_string(),
        },
    )])
}

fn default_enabled_true() -> bool {
    true
}

fn default_logging_dir() -> PathBuf {
    PathBuf::from("./logs/wallet")
}

fn default_logging_filter() -> String {
    "info".to_string()
}

fn default_logging_rotation() -> LoggingRotation {
    LoggingRotation::Daily
}

fn default_logging_retention_days() -> usize {
    14
}

fn default_still_processing_retry_count() -> u32 {
    5
}

fn default_still_processing_initial_interval_ms() -> u64 {
    1_000
}

fn default_still_processing_interval_increment_ms() -> u64 {
    1_000
}

fn default_registry_send_retry_count() -> u32 {
    3
}

fn default_consumer_retry_count() -> u32 {
    3
}

fn default_consumer_retry_interval_ms() -> u64 {
    500
}

fn default_expiry_sweep_interval_ms() -> u64 {
    60 * 60 * 1_000
}

fn default_expire_certificates_after_days() -> u32 {
    365
}

fn default_outbox_poll_interval_ms() -> u64 {
    250
}

fn default_outbox_batch_size() -> usize {
    16
}

fn default_saga_queue_capacity() -> usize {
    64
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum LoggingRotation {
    Daily,
    Hourly,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_logging_filter")]
    pub filter: String,
    #[serde(default = "default_logging_rotation")]
    pub rotation: LoggingRotation,
    #[serde(default = "default_logging_retention_days")]
    pub retention_days: usize,
    #[serde(default = "default_enabled_true")]
    pub stderr_warn_enabled: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: default_logging_dir(),
            filter: default_logging_filter(),
            rotation: default_logging_rotation(),
            retention_days: default_logging_retention_days(),
            stderr_warn_enabled: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RegistryEndpointConfig {
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RetryConfig {
    #[serde(default = "default_still_processing_retry_count")]
    pub registry_transaction_still_processing_retry_count: u32,
    #[serde(default = "default_still_processing_initial_interval_ms")]
    pub registry_transaction_still_processing_initial_interval_ms: u64,
    #[serde(default = "default_still_processing_interval_increment_ms")]
    pub registry_transaction_still_processing_interval_increment_ms: u64,
    #[serde(default = "default_registry_send_retry_count")]
    pub registry_send_retry_count: u32,
    #[serde(default = "default_consumer_retry_count")]
    pub consumer_retry_count: u32,
    #[serde(default = "default_consumer_retry_interval_ms")]
    pub consumer_retry_interval_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            registry_transaction_still_processing_retry_count:
                default_still_processing_retry_count(),
            registry_transaction_still_processing_initial_interval_ms:
                default_still_processing_initial_interval_ms(),
            registry_transaction_still_processing_interval_increment_ms:
                default_still_processing_interval_increment_ms(),
            registry_send_retry_count: default_registry_send_retry_count(),
            consumer_retry_count: default_consumer_retry_count(),
            consumer_retry_interval_ms: default_consumer_retry_interval_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct JobsConfig {
    #[serde(default = "default_expiry_sweep_interval_ms")]
    pub expiry_sweep_interval_ms: u64,
    #[serde(default = "default_expire_certificates_after_days")]
    pub expire_certificates_after_days: u32,
    #[serde(default = "default_outbox_poll_interval_ms")]
    pub outbox_poll_interval_ms: u64,
    #[serde(default = "default_outbox_batch_size")]
    pub outbox_batch_size: usize,
}

impl JobsConfig {
    pub fn expiry_sweep_interval(&self) -> Duration {
        Duration::from_millis(self.expiry_sweep_interval_ms.max(1))
    }

    pub fn outbox_poll_interval(&self) -> Duration {
        Duration::from_millis(self.outbox_poll_interval_ms.max(1))
    }
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            expiry_sweep_interval_ms: default_expiry_sweep_interval_ms(),
            expire_certificates_after_days: default_expire_certificates_after_days(),
            outbox_poll_interval_ms: default_outbox_poll_interval_ms(),
            outbox_batch_size: default_outbox_batch_size(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SagaRuntimeConfig {
    #[serde(default = "default_saga_queue_capacity")]
    pub queue_capacity: usize,
}

impl Default for SagaRuntimeConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_saga_queue_capacity(),
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
            serde_json::from_value(config_value).context("failed to deserialize wallet config")?;

        if !config.logging.dir.is_absolute() {
            config.logging.dir = config_base.join(&config.logging.dir);
        }

        Ok(config)
    }
}

fn resolve_schema_path(config_base: &Path, config_value: &Value) -> Result<PathBuf> {
    if let Some(path_text) = config_value.get("$schema").and_then(|value| value.as_str()) {
        let configured = PathBuf::from(path_text);
        if configured.is_absolute() {
            return Ok(configured);
        }
        return Ok(config_base.join(&configured));
    }

    let local_default = config_base.join("wallet.schema.json");
    if local_default.exists() {
        return Ok(local_default);
    }

    Err(anyhow!(
        "unable to resolve schema path: expected $schema in config or wallet.schema.json"
    ))
}

fn validate_against_schema(config_value: &Value, schema_path: &Path) -> Result<()> {
    let schema_content = fs::read_to_string(schema_path)
        .with_context(|| format!("failed to read schema {}", schema_path.display()))?;
    let schema: Value = serde_json::from_str(&schema_content)
        .with_context(|| format!("failed to parse schema {}", schema_path.display()))?;

    let compiled =
        JSONSchema::compile(&schema).map_err(|e| anyhow!("failed to compile schema: {e}"))?;

    match compiled.validate(config_value) {
        Ok(()) => Ok(()),
        Err(errors_iter) => {
            let validation_errors: Vec<ValidationError> = errors_iter.collect();
            let messages: Vec<String> = validation_errors
                .into_iter()
                .map(|error| error.to_string())
                .collect();
            Err(anyhow!("config validation failed: {}", messages.join("; ")))
        }
    }
}
