use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::trace;
use tracing::warn;

use super::ErrorReporter;
use super::Reconciler;
use crate::utils::async_task::run_bounded;
use crate::Error;
use crate::RateLimitingQueue;
use crate::ReconcileError;
use crate::Resource;
use crate::ResourceKey;
use crate::Result;
use crate::Store;

/// One queue consumer. Several workers share queue, store and reconciler.
pub struct Worker<K: Resource> {
    id: usize,
    queue: Arc<RateLimitingQueue<ResourceKey>>,
    store: Arc<Store<K>>,
    reconciler: Arc<dyn Reconciler<K>>,
    reporter: Arc<dyn ErrorReporter>,
    handler_timeout: Option<Duration>,
    cancel: CancellationToken,
}

impl<K: Resource> Worker<K> {
    pub(crate) fn new(
        id: usize,
        queue: Arc<RateLimitingQueue<ResourceKey>>,
        store: Arc<Store<K>>,
        reconciler: Arc<dyn Reconciler<K>>,
        reporter: Arc<dyn ErrorReporter>,
        handler_timeout: Option<Duration>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            id,
            queue,
            store,
            reconciler,
            reporter,
            handler_timeout,
            cancel,
        }
    }

    /// Processes keys until the queue is shut down and drained.
    pub async fn run(self) -> Result<()> {
        debug!(worker_id = self.id, "worker started");
        while self.process_next_work_item().await {}
        debug!(worker_id = self.id, "worker exiting");
        Ok(())
    }

    /// Takes one key through the reconcile protocol.
    ///
    /// Returns `false` when there is nothing left to process.
    pub async fn process_next_work_item(&self) -> bool {
        let Some(key) = self.queue.get().await else {
            return false;
        };

        let started = Instant::now();
        match self.sync(&key).await {
            Ok(()) => {
                self.queue.forget(&key);
                trace!(worker_id = self.id, %key, elapsed = ?started.elapsed(), "reconciled");
            }
            Err(e) => {
                let err = Error::from(e);
                self.reporter.report(&key.to_string(), &err);
                let delay = self.queue.add_rate_limited(key.clone());
                warn!(
                    worker_id = self.id,
                    %key,
                    retries = self.queue.num_requeues(&key),
                    ?delay,
                    "reconcile failed, requeued"
                );
            }
        }
        self.queue.done(&key);

        true
    }

    async fn sync(
        &self,
        key: &ResourceKey,
    ) -> std::result::Result<(), ReconcileError> {
        match self.store.get(key) {
            Some(obj) => {
                run_bounded(
                    self.reconciler.reconcile(key, obj),
                    self.handler_timeout,
                    &self.cancel,
                )
                .await
            }
            None => {
                debug!(worker_id = self.id, %key, "object no longer cached, running cleanup");
                run_bounded(self.reconciler.cleanup(key), self.handler_timeout, &self.cancel).await
            }
        }
    }
}
