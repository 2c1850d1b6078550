use async_trait::async_trait;
use governor::DefaultDirectRateLimiter;
use governor::RateLimiter;
use tracing::trace;

use super::ObjectList;
use super::WatchSource;
use super::WatchStream;
use crate::utils::quota::quota;
use crate::Resource;
use crate::WatchConfig;
use crate::WatchError;

/// Throttles every request to the wrapped source with a (qps, burst)
/// token bucket. Limits are owned by the instance, never global.
pub struct RateLimitedSource<S> {
    inner: S,
    limiter: DefaultDirectRateLimiter,
}

impl<S> RateLimitedSource<S> {
    pub fn new(
        inner: S,
        config: &WatchConfig,
    ) -> Self {
        Self {
            inner,
            limiter: RateLimiter::direct(quota(config.qps, config.burst)),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait]
impl<K, S> WatchSource<K> for RateLimitedSource<S>
where
    K: Resource,
    S: WatchSource<K>,
{
    async fn server_version(&self) -> Result<String, WatchError> {
        self.limiter.until_ready().await;
        self.inner.server_version().await
    }

    async fn list(&self) -> Result<ObjectList<K>, WatchError> {
        self.limiter.until_ready().await;
        trace!(kind = K::KIND, "list");
        self.inner.list().await
    }

    async fn watch(
        &self,
        resource_version: &str,
    ) -> Result<WatchStream<K>, WatchError> {
        self.limiter.until_ready().await;
        trace!(kind = K::KIND, resource_version, "watch");
        self.inner.watch(resource_version).await
    }
}
