use std::time::Duration;

use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::constants::DEFAULT_QUEUE_NAME;
use crate::Error;
use crate::Result;

/// How the ALM reconciler treats an install strategy it does not know
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum UnsupportedStrategyPolicy {
    /// Report an error so the key is retried with backoff and surfaces in logs
    #[default]
    Reject,
    /// Treat the object as reconciled without installing anything
    Ignore,
}

/// Worker pool and lifecycle parameters
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RuntimeConfig {
    /// Name used as queue label in logs and metrics
    #[serde(default = "default_queue_name")]
    pub name: String,

    /// Number of concurrent workers draining the queue
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Startup connectivity probe timeout in milliseconds
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,

    /// Per-invocation reconcile bound in milliseconds (0 disables the bound)
    #[serde(default)]
    pub handler_timeout_ms: u64,

    /// Time in-flight handlers get to finish after the stop signal
    #[serde(default = "default_shutdown_grace_period_ms")]
    pub shutdown_grace_period_ms: u64,

    /// Treatment of unknown install strategy discriminators
    #[serde(default)]
    pub unsupported_strategy: UnsupportedStrategyPolicy,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            name: default_queue_name(),
            workers: default_workers(),
            probe_timeout_ms: default_probe_timeout_ms(),
            handler_timeout_ms: 0,
            shutdown_grace_period_ms: default_shutdown_grace_period_ms(),
            unsupported_strategy: UnsupportedStrategyPolicy::default(),
        }
    }
}

impl RuntimeConfig {
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(Error::Config(ConfigError::Message(
                "controller requires at least one worker".to_string(),
            )));
        }

        if self.probe_timeout_ms == 0 {
            return Err(Error::Config(ConfigError::Message(
                "probe timeout must be > 0".to_string(),
            )));
        }

        if self.name.trim().is_empty() {
            return Err(Error::Config(ConfigError::Message(
                "controller name cannot be empty".to_string(),
            )));
        }

        Ok(())
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn handler_timeout(&self) -> Option<Duration> {
        (self.handler_timeout_ms > 0).then(|| Duration::from_millis(self.handler_timeout_ms))
    }

    pub fn shutdown_grace_period(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_period_ms)
    }
}

fn default_queue_name() -> String {
    DEFAULT_QUEUE_NAME.to_string()
}
fn default_workers() -> usize {
    1
}
fn default_probe_timeout_ms() -> u64 {
    10_000
}
fn default_shutdown_grace_period_ms() -> u64 {
    30_000
}
