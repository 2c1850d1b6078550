//! Deduplicating, rate-limited work queue.
//!
//! Three layers, each usable on its own:
//! - [`WorkQueue`]: FIFO with coalescing of pending items and an in-flight set
//!   that keeps a key away from a second worker until [`WorkQueue::done`].
//! - [`DelayingQueue`]: schedules an add no earlier than a given delay.
//! - [`RateLimitingQueue`]: asks a [`RateLimiter`] how long a failed key has
//!   to wait before it is retried.

mod delaying_queue;
mod rate_limiter;
mod rate_limiting_queue;
mod work_queue;

pub use delaying_queue::*;
pub use rate_limiter::*;
pub use rate_limiting_queue::*;
pub use work_queue::*;


use std::fmt::Debug;
use std::hash::Hash;

/// Anything that can be addressed in the queue.
pub trait QueueItem: Clone + Eq + Hash + Debug + Send + Sync + 'static {}

impl<T> QueueItem for T where T: Clone + Eq + Hash + Debug + Send + Sync + 'static {}
