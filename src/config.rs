//! Orchestrator configuration.
//!
//! Loaded from YAML files and `SAGA__`-prefixed environment variables.

use std::time::Duration;

use backon::ConstantBuilder;
use serde::{Deserialize, Serialize};

use crate::error::SagaError;

/// Default configuration file name (without extension).
pub const DEFAULT_CONFIG_FILE: &str = "saga";
/// Environment variable naming an additional configuration file.
pub const CONFIG_ENV_VAR: &str = "SAGA_CONFIG";
/// Prefix for configuration environment variables.
pub const CONFIG_ENV_PREFIX: &str = "SAGA";
/// Process definition started for each payment saga.
pub const DEFAULT_WORKFLOW_KEY: &str = "PaymentSaga";

/// Delay between workflow signal attempts.
pub const DEFAULT_SIGNAL_DELAY_MS: u64 = 25;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SagaConfig {
    /// Key of the process definition started per saga.
    pub workflow_definition_key: String,
    /// Retry policy for resume/fail signals.
    pub signal_retry: RetryConfig,
    /// Accounts whose credit card is treated as expired at saga start.
    pub expired_card_accounts: Vec<String>,
}

impl Default for SagaConfig {
    fn default() -> Self {
        Self {
            workflow_definition_key: DEFAULT_WORKFLOW_KEY.to_string(),
            signal_retry: RetryConfig::default(),
            expired_card_accounts: Vec::new(),
        }
    }
}

impl SagaConfig {
    /// Load configuration from file and environment.
    ///
    /// Sources, later overriding earlier:
    /// 1. `saga.yaml` in the current directory (if present)
    /// 2. The file at `path` (if given)
    /// 3. The file named by `SAGA_CONFIG` (if set)
    /// 4. `SAGA__*` environment variables, e.g. `SAGA__SIGNAL_RETRY__DELAY_MS=50`
    pub fn load(path: Option<&str>) -> Result<Self, SagaError> {
        use ::config::{Config, Environment, File, FileFormat};

        let mut builder = Config::builder()
            .add_source(File::new(DEFAULT_CONFIG_FILE, FileFormat::Yaml).required(false));

        if let Some(path) = path {
            builder = builder.add_source(File::new(path, FileFormat::Yaml).required(true));
        }

        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            builder = builder.add_source(File::new(&path, FileFormat::Yaml).required(true));
        }

        let config = builder
            .add_source(
                Environment::with_prefix(CONFIG_ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }

    /// Configuration for tests: 1 ms signal delay, otherwise defaults.
    pub fn for_test() -> Self {
        Self {
            signal_retry: RetryConfig {
                delay_ms: 1,
                max_attempts: None,
            },
            ..Self::default()
        }
    }
}

/// Fixed-delay retry for workflow signals.
///
/// `max_attempts: None` retries forever.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub delay_ms: u64,
    pub max_attempts: Option<usize>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            delay_ms: DEFAULT_SIGNAL_DELAY_MS,
            max_attempts: None,
        }
    }
}

impl RetryConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    /// Backoff between attempts. `max_attempts` counts the first call.
    pub fn backoff(&self) -> ConstantBuilder {
        let retries = match self.max_attempts {
            Some(attempts) => attempts.saturating_sub(1),
            None => usize::MAX,
        };
        ConstantBuilder::default()
            .with_delay(self.delay())
            .with_max_times(retries)
    }
}
