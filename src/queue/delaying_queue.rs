use std::cmp::Ordering as CmpOrdering;
use std::collections::BinaryHeap;
use std::collections::HashMap;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::sleep_until;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::trace;

use super::QueueItem;
use super::WorkQueue;

/// Schedules adds into a [`WorkQueue`] after a delay.
///
/// A single background task owns a min-heap of waiting items. An item
/// scheduled twice keeps the earlier ready time.
///
/// Must be constructed inside a Tokio runtime.
pub struct DelayingQueue<T: QueueItem> {
    queue: Arc<WorkQueue<T>>,
    waiting_tx: mpsc::UnboundedSender<WaitFor<T>>,
    waiting: Arc<AtomicUsize>,
    stop: CancellationToken,
}

struct WaitFor<T> {
    item: T,
    ready_at: Instant,
}

struct Waiting<T> {
    item: T,
    ready_at: Instant,
    seq: u64,
}

impl<T> PartialEq for Waiting<T> {
    fn eq(
        &self,
        other: &Self,
    ) -> bool {
        self.ready_at == other.ready_at && self.seq == other.seq
    }
}

impl<T> Eq for Waiting<T> {}

impl<T> PartialOrd for Waiting<T> {
    fn partial_cmp(
        &self,
        other: &Self,
    ) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Waiting<T> {
    // Reversed: BinaryHeap is a max-heap, the earliest item must be on top
    fn cmp(
        &self,
        other: &Self,
    ) -> CmpOrdering {
        other
            .ready_at
            .cmp(&self.ready_at)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl<T: QueueItem> DelayingQueue<T> {
    pub fn new(queue: Arc<WorkQueue<T>>) -> Self {
        let (waiting_tx, waiting_rx) = mpsc::unbounded_channel();
        let waiting = Arc::new(AtomicUsize::new(0));
        let stop = CancellationToken::new();

        tokio::spawn(waiting_loop(
            queue.clone(),
            waiting_rx,
            waiting.clone(),
            stop.clone(),
        ));

        Self {
            queue,
            waiting_tx,
            waiting,
            stop,
        }
    }

    /// Adds `item` to the queue once `delay` has elapsed. No-op after
    /// shutdown.
    pub fn add_after(
        &self,
        item: T,
        delay: Duration,
    ) {
        if self.queue.is_shutting_down() {
            return;
        }

        if delay.is_zero() {
            self.queue.add(item);
            return;
        }

        let ready_at = Instant::now() + delay;
        self.waiting.fetch_add(1, Ordering::AcqRel);
        if self.waiting_tx.send(WaitFor { item, ready_at }).is_err() {
            self.waiting.fetch_sub(1, Ordering::AcqRel);
            debug!(queue = %self.queue.name(), "delaying loop already stopped");
        }
    }

    /// Distinct items scheduled and not yet delivered.
    pub fn waiting_len(&self) -> usize {
        self.waiting.load(Ordering::Acquire)
    }

    /// Stops the background loop. Parked items are discarded.
    pub fn shut_down(&self) {
        self.stop.cancel();
    }
}

impl<T: QueueItem> Drop for DelayingQueue<T> {
    fn drop(&mut self) {
        self.stop.cancel();
    }
}

async fn waiting_loop<T: QueueItem>(
    queue: Arc<WorkQueue<T>>,
    mut waiting_rx: mpsc::UnboundedReceiver<WaitFor<T>>,
    waiting: Arc<AtomicUsize>,
    stop: CancellationToken,
) {
    let mut heap: BinaryHeap<Waiting<T>> = BinaryHeap::new();
    // Ready time of the live heap entry of each item; older entries are stale
    let mut known: HashMap<T, Instant> = HashMap::new();
    let mut seq: u64 = 0;

    loop {
        let now = Instant::now();
        while let Some(top) = heap.peek() {
            if top.ready_at > now {
                break;
            }
            let Some(entry) = heap.pop() else {
                break;
            };
            if known.get(&entry.item) == Some(&entry.ready_at) {
                known.remove(&entry.item);
                waiting.fetch_sub(1, Ordering::AcqRel);
                trace!(queue = %queue.name(), item = ?entry.item, "delay elapsed");
                queue.add(entry.item);
            }
        }
        let next_ready = heap.peek().map(|w| w.ready_at);
        let wait_next = async {
            match next_ready {
                Some(at) => sleep_until(at).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = stop.cancelled() => {
                debug!(queue = %queue.name(), discarded = known.len(), "delaying loop stopped");
                waiting.store(0, Ordering::Release);
                return;
            }
            msg = waiting_rx.recv() => {
                let Some(WaitFor { item, ready_at }) = msg else {
                    waiting.store(0, Ordering::Release);
                    return;
                };
                if known.contains_key(&item) {
                    // Counted once per distinct item
                    waiting.fetch_sub(1, Ordering::AcqRel);
                }
                if ready_at <= Instant::now() {
                    known.remove(&item);
                    waiting.fetch_sub(1, Ordering::AcqRel);
                    queue.add(item);
                    continue;
                }
                if known.get(&item).map_or(true, |existing| ready_at < *existing) {
                    known.insert(item.clone(), ready_at);
                    seq = seq.wrapping_add(1);
                    heap.push(Waiting { item, ready_at, seq });
                }
            }
            _ = wait_next => {}
        }
    }
}
