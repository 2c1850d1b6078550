use std::time::Duration;

use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use super::BackoffPolicy;
use crate::constants::DEFAULT_BURST;
use crate::constants::DEFAULT_QPS;
use crate::constants::DEFAULT_RESYNC_INTERVAL_SECS;
use crate::Error;
use crate::Result;

/// Watch source client parameters
///
/// Passed explicitly to [`crate::RateLimitedSource`] and [`crate::Informer`]
/// so that several controllers in one process never share limits.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct WatchConfig {
    /// Sustained requests per second against the source
    #[serde(default = "default_qps")]
    pub qps: f64,

    /// Requests allowed in a burst above `qps`
    #[serde(default = "default_burst")]
    pub burst: u32,

    /// Full relist interval in seconds
    #[serde(default = "default_resync_interval_secs")]
    pub resync_interval_secs: u64,

    /// Delay between failed list/watch attempts
    #[serde(default = "default_relist_backoff")]
    pub relist_backoff: BackoffPolicy,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            qps: default_qps(),
            burst: default_burst(),
            resync_interval_secs: default_resync_interval_secs(),
            relist_backoff: default_relist_backoff(),
        }
    }
}

impl WatchConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.qps > 0.0) {
            return Err(Error::Config(ConfigError::Message(format!(
                "watch qps must be > 0, got {}",
                self.qps
            ))));
        }

        if self.burst == 0 {
            return Err(Error::Config(ConfigError::Message(
                "watch burst must be > 0".to_string(),
            )));
        }

        if self.resync_interval_secs == 0 {
            return Err(Error::Config(ConfigError::Message(
                "resync interval must be > 0".to_string(),
            )));
        }

        self.relist_backoff.validate("relist")
    }

    pub fn resync_interval(&self) -> Duration {
        Duration::from_secs(self.resync_interval_secs)
    }
}

fn default_qps() -> f64 {
    DEFAULT_QPS
}
fn default_burst() -> u32 {
    DEFAULT_BURST
}
fn default_resync_interval_secs() -> u64 {
    DEFAULT_RESYNC_INTERVAL_SECS
}
fn default_relist_backoff() -> BackoffPolicy {
    BackoffPolicy::default()
}
