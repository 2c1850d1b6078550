use std::collections::HashMap;
use std::collections::HashSet;
use std::collections::VecDeque;

use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::time::Instant;
use tracing::trace;

use super::QueueItem;
use crate::metrics::QUEUE_ADDS_METRIC;
use crate::metrics::QUEUE_DEPTH_METRIC;
use crate::metrics::WORK_DURATION_METRIC;

/// Deduplicating FIFO with in-flight tracking.
///
/// Invariants:
/// - an item is at most once in `queue`
/// - an item in `processing` is never in `queue`; an `add` while processing
///   only marks it `dirty` and [`WorkQueue::done`] re-queues it
pub struct WorkQueue<T: QueueItem> {
    name: String,
    state: Mutex<QueueState<T>>,
    notify: Notify,
}

struct QueueState<T> {
    /// Delivery order of pending items
    queue: VecDeque<T>,
    /// Items that need processing (pending or re-added while in flight)
    dirty: HashSet<T>,
    /// Items handed out by `get` and not yet `done`, with their start time
    processing: HashMap<T, Instant>,
    shutting_down: bool,
}

impl<T: QueueItem> WorkQueue<T> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Mutex::new(QueueState {
                queue: VecDeque::new(),
                dirty: HashSet::new(),
                processing: HashMap::new(),
                shutting_down: false,
            }),
            notify: Notify::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Marks `item` as needing processing. No-op after shutdown or when the
    /// item is already pending.
    pub fn add(
        &self,
        item: T,
    ) {
        let mut state = self.state.lock();
        if state.shutting_down {
            trace!(queue = %self.name, ?item, "add after shutdown ignored");
            return;
        }
        if state.dirty.contains(&item) {
            trace!(queue = %self.name, ?item, "add coalesced");
            return;
        }

        QUEUE_ADDS_METRIC.with_label_values(&[self.name.as_str()]).inc();
        state.dirty.insert(item.clone());
        if state.processing.contains_key(&item) {
            // Delivered again once the in-flight instance is done
            return;
        }

        state.queue.push_back(item);
        self.update_depth(&state);
        drop(state);
        self.notify.notify_one();
    }

    /// Waits for the next item. Returns `None` once the queue is shut down
    /// and drained.
    pub async fn get(&self) -> Option<T> {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            // Register before checking state so a concurrent add or
            // shut_down cannot slip between the check and the wait.
            notified.as_mut().enable();

            {
                let mut state = self.state.lock();
                if let Some(item) = state.queue.pop_front() {
                    state.dirty.remove(&item);
                    state.processing.insert(item.clone(), Instant::now());
                    self.update_depth(&state);
                    return Some(item);
                }
                if state.shutting_down {
                    return None;
                }
            }

            notified.await;
        }
    }

    /// Marks `item` as finished. If it was re-added while in flight it
    /// becomes eligible again immediately.
    pub fn done(
        &self,
        item: &T,
    ) {
        let mut state = self.state.lock();
        if let Some(started) = state.processing.remove(item) {
            WORK_DURATION_METRIC
                .with_label_values(&[self.name.as_str()])
                .observe(started.elapsed().as_secs_f64());
        }

        if state.dirty.contains(item) {
            state.queue.push_back(item.clone());
            self.update_depth(&state);
            drop(state);
            self.notify.notify_one();
        }
    }

    /// Stops accepting items and wakes every blocked `get`. Items already
    /// queued are still handed out.
    pub fn shut_down(&self) {
        let mut state = self.state.lock();
        state.shutting_down = true;
        drop(state);
        self.notify.notify_waiters();
    }

    pub fn is_shutting_down(&self) -> bool {
        self.state.lock().shutting_down
    }

    /// Number of items waiting for delivery (in-flight items excluded).
    pub fn len(&self) -> usize {
        self.state.lock().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `item` waits for delivery, either queued or re-added during
    /// processing.
    pub fn is_pending(
        &self,
        item: &T,
    ) -> bool {
        self.state.lock().dirty.contains(item)
    }

    pub fn is_processing(
        &self,
        item: &T,
    ) -> bool {
        self.state.lock().processing.contains_key(item)
    }

    fn update_depth(
        &self,
        state: &QueueState<T>,
    ) {
        QUEUE_DEPTH_METRIC
            .with_label_values(&[self.name.as_str()])
            .set(state.queue.len() as i64);
    }
}
