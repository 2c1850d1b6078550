use std::time::Duration;

use dashmap::DashMap;
use governor::clock::Clock;
use governor::clock::DefaultClock;
use governor::middleware::NoOpMiddleware;
use governor::state::InMemoryState;
use governor::state::NotKeyed;
#[cfg(test)]
use mockall::automock;

use super::QueueItem;
use crate::utils::quota::quota;
use crate::QueueConfig;

/// Decides how long a failed item waits before it is retried.
#[cfg_attr(test, automock)]
pub trait RateLimiter<T: QueueItem>: Send + Sync + 'static {
    /// Delay for the next retry of `item`. Every call counts as one failure.
    fn when(
        &self,
        item: &T,
    ) -> Duration;

    /// Clears the failure history of `item`.
    fn forget(
        &self,
        item: &T,
    );

    /// Failures recorded for `item` since the last `forget`.
    fn num_requeues(
        &self,
        item: &T,
    ) -> u32;
}

/// Per-item exponential backoff: `base * 2^failures`, capped at `max`.
pub struct ItemExponentialFailureRateLimiter<T: QueueItem> {
    failures: DashMap<T, u32>,
    base_delay: Duration,
    max_delay: Duration,
}

impl<T: QueueItem> ItemExponentialFailureRateLimiter<T> {
    pub fn new(
        base_delay: Duration,
        max_delay: Duration,
    ) -> Self {
        Self {
            failures: DashMap::new(),
            base_delay,
            max_delay,
        }
    }
}

impl<T: QueueItem> RateLimiter<T> for ItemExponentialFailureRateLimiter<T> {
    fn when(
        &self,
        item: &T,
    ) -> Duration {
        let mut failures = self.failures.entry(item.clone()).or_insert(0);
        let exp = *failures;
        *failures = failures.saturating_add(1);

        1u32.checked_shl(exp)
            .and_then(|factor| self.base_delay.checked_mul(factor))
            .map_or(self.max_delay, |backoff| backoff.min(self.max_delay))
    }

    fn forget(
        &self,
        item: &T,
    ) {
        self.failures.remove(item);
    }

    fn num_requeues(
        &self,
        item: &T,
    ) -> u32 {
        self.failures.get(item).map(|f| *f).unwrap_or(0)
    }
}

/// Overall token bucket shared by every item. Keeps a retry storm across
/// many keys from flooding the workers.
///
/// A denied check reserves nothing: failures arriving while the bucket is
/// empty all wait for the same next free cell.
pub struct BucketRateLimiter<C: Clock = DefaultClock> {
    limiter: governor::RateLimiter<NotKeyed, InMemoryState, C, NoOpMiddleware<C::Instant>>,
    clock: C,
}

impl BucketRateLimiter {
    pub fn new(
        qps: f64,
        burst: u32,
    ) -> Self {
        Self::with_clock(qps, burst, DefaultClock::default())
    }
}

impl<C: Clock + Clone> BucketRateLimiter<C> {
    pub fn with_clock(
        qps: f64,
        burst: u32,
        clock: C,
    ) -> Self {
        Self {
            limiter: governor::RateLimiter::direct_with_clock(quota(qps, burst), clock.clone()),
            clock,
        }
    }
}

impl<T, C> RateLimiter<T> for BucketRateLimiter<C>
where
    T: QueueItem,
    C: Clock + Send + Sync + 'static,
{
    fn when(
        &self,
        _item: &T,
    ) -> Duration {
        match self.limiter.check() {
            Ok(()) => Duration::ZERO,
            Err(not_until) => not_until.wait_time_from(self.clock.now()),
        }
    }

    fn forget(
        &self,
        _item: &T,
    ) {
    }

    fn num_requeues(
        &self,
        _item: &T,
    ) -> u32 {
        0
    }
}

/// Returns the worst delay of all wrapped limiters.
pub struct MaxOfRateLimiter<T: QueueItem> {
    limiters: Vec<Box<dyn RateLimiter<T>>>,
}

impl<T: QueueItem> MaxOfRateLimiter<T> {
    pub fn new(limiters: Vec<Box<dyn RateLimiter<T>>>) -> Self {
        Self { limiters }
    }
}

impl<T: QueueItem> RateLimiter<T> for MaxOfRateLimiter<T> {
    fn when(
        &self,
        item: &T,
    ) -> Duration {
        // Every limiter must observe the failure, so no short-circuit
        self.limiters
            .iter()
            .map(|l| l.when(item))
            .fold(Duration::ZERO, Duration::max)
    }

    fn forget(
        &self,
        item: &T,
    ) {
        for l in &self.limiters {
            l.forget(item);
        }
    }

    fn num_requeues(
        &self,
        item: &T,
    ) -> u32 {
        self.limiters
            .iter()
            .map(|l| l.num_requeues(item))
            .max()
            .unwrap_or(0)
    }
}

/// Per-item exponential backoff combined with an overall token bucket.
pub fn default_controller_rate_limiter<T: QueueItem>(config: &QueueConfig) -> MaxOfRateLimiter<T> {
    MaxOfRateLimiter::new(vec![
        Box::new(ItemExponentialFailureRateLimiter::new(
            config.item_base_delay(),
            config.item_max_delay(),
        )),
        Box::new(BucketRateLimiter::new(config.bucket_qps, config.bucket_burst)),
    ])
}
