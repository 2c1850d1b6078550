use std::time::Duration;

use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::constants::DEFAULT_BUCKET_BURST;
use crate::constants::DEFAULT_BUCKET_QPS;
use crate::constants::DEFAULT_ITEM_BASE_DELAY_MS;
use crate::constants::DEFAULT_ITEM_MAX_DELAY_MS;
use crate::Error;
use crate::Result;

/// Retry policy of the rate-limited work queue
///
/// The effective delay of a failed key is the larger of its per-item
/// exponential backoff and the wait for a token from the overall bucket.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct QueueConfig {
    /// First retry delay of a key (unit: milliseconds)
    #[serde(default = "default_item_base_delay_ms")]
    pub item_base_delay_ms: u64,

    /// Cap of the per-key exponential backoff (unit: milliseconds)
    #[serde(default = "default_item_max_delay_ms")]
    pub item_max_delay_ms: u64,

    /// Overall retry rate across all keys
    #[serde(default = "default_bucket_qps")]
    pub bucket_qps: f64,

    /// Retries admitted in a burst above `bucket_qps`
    #[serde(default = "default_bucket_burst")]
    pub bucket_burst: u32,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            item_base_delay_ms: default_item_base_delay_ms(),
            item_max_delay_ms: default_item_max_delay_ms(),
            bucket_qps: default_bucket_qps(),
            bucket_burst: default_bucket_burst(),
        }
    }
}

impl QueueConfig {
    pub fn validate(&self) -> Result<()> {
        if self.item_base_delay_ms == 0 {
            return Err(Error::Config(ConfigError::Message(
                "queue base delay must be > 0".to_string(),
            )));
        }

        if self.item_base_delay_ms > self.item_max_delay_ms {
            return Err(Error::Config(ConfigError::Message(format!(
                "queue base delay {}ms exceeds max delay {}ms",
                self.item_base_delay_ms, self.item_max_delay_ms
            ))));
        }

        if !(self.bucket_qps > 0.0) || self.bucket_burst == 0 {
            return Err(Error::Config(ConfigError::Message(format!(
                "queue bucket requires qps > 0 and burst > 0, got {}/{}",
                self.bucket_qps, self.bucket_burst
            ))));
        }

        Ok(())
    }

    pub fn item_base_delay(&self) -> Duration {
        Duration::from_millis(self.item_base_delay_ms)
    }

    pub fn item_max_delay(&self) -> Duration {
        Duration::from_millis(self.item_max_delay_ms)
    }
}

fn default_item_base_delay_ms() -> u64 {
    DEFAULT_ITEM_BASE_DELAY_MS
}
fn default_item_max_delay_ms() -> u64 {
    DEFAULT_ITEM_MAX_DELAY_MS
}
fn default_bucket_qps() -> f64 {
    DEFAULT_BUCKET_QPS
}
fn default_bucket_burst() -> u32 {
    DEFAULT_BUCKET_BURST
}
