// -
// Watch source

/// Request rate the cache mirror may use against the watch source
pub(crate) const DEFAULT_QPS: f64 = 100.0;
pub(crate) const DEFAULT_BURST: u32 = 100;

/// Full relist interval of the cache mirror
pub(crate) const DEFAULT_RESYNC_INTERVAL_SECS: u64 = 15 * 60;

// -
// Work queue

/// Queue name used as metrics label
pub(crate) const DEFAULT_QUEUE_NAME: &str = "alm";

/// Per-item exponential backoff bounds
pub(crate) const DEFAULT_ITEM_BASE_DELAY_MS: u64 = 5;
pub(crate) const DEFAULT_ITEM_MAX_DELAY_MS: u64 = 1000 * 1000;

/// Overall token bucket shared by all items
pub(crate) const DEFAULT_BUCKET_QPS: f64 = 10.0;
pub(crate) const DEFAULT_BUCKET_BURST: u32 = 100;

// -
// Install strategies

/// Discriminator field inside the unstructured install strategy
pub(crate) const STRATEGY_FIELD: &str = "strategy";
pub(crate) const DEPLOYMENTS_FIELD: &str = "deployments";
pub(crate) const DEPLOYMENT_STRATEGY: &str = "deployment";

/// Environment variable prefix for configuration overrides (`ALM__WATCH__QPS`)
pub(crate) const CONFIG_ENV_PREFIX: &str = "ALM";
