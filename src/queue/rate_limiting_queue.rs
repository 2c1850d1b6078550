use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use super::default_controller_rate_limiter;
use super::DelayingQueue;
use super::QueueItem;
use super::RateLimiter;
use super::WorkQueue;
use crate::metrics::QUEUE_RETRIES_METRIC;
use crate::QueueConfig;

/// Work queue with delayed and rate-limited re-insertion.
///
/// Must be constructed inside a Tokio runtime (see [`DelayingQueue`]).
pub struct RateLimitingQueue<T: QueueItem> {
    queue: Arc<WorkQueue<T>>,
    delaying: DelayingQueue<T>,
    rate_limiter: Arc<dyn RateLimiter<T>>,
}

impl<T: QueueItem> RateLimitingQueue<T> {
    pub fn new(
        name: impl Into<String>,
        rate_limiter: Arc<dyn RateLimiter<T>>,
    ) -> Self {
        let queue = Arc::new(WorkQueue::new(name));
        let delaying = DelayingQueue::new(queue.clone());
        Self {
            queue,
            delaying,
            rate_limiter,
        }
    }

    /// Queue with [`default_controller_rate_limiter`] tuned by `config`.
    pub fn with_config(
        name: impl Into<String>,
        config: &QueueConfig,
    ) -> Self {
        Self::new(name, Arc::new(default_controller_rate_limiter(config)))
    }

    pub fn name(&self) -> &str {
        self.queue.name()
    }

    pub fn add(
        &self,
        item: T,
    ) {
        self.queue.add(item);
    }

    /// Next item, or `None` once shut down and drained.
    pub async fn get(&self) -> Option<T> {
        self.queue.get().await
    }

    pub fn done(
        &self,
        item: &T,
    ) {
        self.queue.done(item);
    }

    pub fn add_after(
        &self,
        item: T,
        delay: Duration,
    ) {
        self.delaying.add_after(item, delay);
    }

    /// Schedules `item` after the delay chosen by the rate limiter and
    /// returns that delay. Does not reset the item's retry history.
    pub fn add_rate_limited(
        &self,
        item: T,
    ) -> Duration {
        if self.queue.is_shutting_down() {
            return Duration::ZERO;
        }

        let delay = self.rate_limiter.when(&item);
        QUEUE_RETRIES_METRIC.with_label_values(&[self.name()]).inc();
        debug!(queue = %self.name(), ?item, ?delay, "requeue with backoff");
        self.delaying.add_after(item, delay);
        delay
    }

    /// Resets the retry history of `item`.
    pub fn forget(
        &self,
        item: &T,
    ) {
        self.rate_limiter.forget(item);
    }

    pub fn num_requeues(
        &self,
        item: &T,
    ) -> u32 {
        self.rate_limiter.num_requeues(item)
    }

    pub fn shut_down(&self) {
        self.queue.shut_down();
        self.delaying.shut_down();
    }

    pub fn is_shutting_down(&self) -> bool {
        self.queue.is_shutting_down()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn is_pending(
        &self,
        item: &T,
    ) -> bool {
        self.queue.is_pending(item)
    }

    pub fn is_processing(
        &self,
        item: &T,
    ) -> bool {
        self.queue.is_processing(item)
    }

    /// Items scheduled with a delay that have not been delivered yet.
    pub fn waiting_len(&self) -> usize {
        self.delaying.waiting_len()
    }
}
