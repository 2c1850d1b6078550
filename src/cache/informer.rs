use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use rand::Rng;
use tokio::sync::watch;
use tokio::time::sleep;
use tokio::time::Instant;
use tracing::debug;
use tracing::info;
use tracing::trace;
use tracing::warn;

use super::DeletedObject;
use super::Resource;
use super::ResourceEventHandler;
use super::Store;
use crate::BackoffPolicy;
use crate::ObjectList;
use crate::Result;
use crate::WatchConfig;
use crate::WatchError;
use crate::WatchEvent;
use crate::WatchSource;

/// Why one list-and-watch cycle ended without error.
#[derive(Debug, PartialEq, Eq)]
enum CycleExit {
    Shutdown,
    Resync,
}

/// Keeps a [`Store`] in sync with a [`WatchSource`] and notifies handlers.
///
/// One cycle lists everything, replaces the store content, then watches from
/// the listed version. A watch stream that ends is resumed from the last
/// applied version. Errors and expired versions trigger a relist after a
/// jittered backoff. Every `resync_interval` the cycle is restarted, which
/// re-delivers all cached objects as updates.
pub struct Informer<K: Resource, S: WatchSource<K>> {
    source: Arc<S>,
    store: Arc<Store<K>>,
    handlers: Vec<Arc<dyn ResourceEventHandler<K>>>,
    resync_interval: Duration,
    relist_backoff: BackoffPolicy,
    synced_tx: watch::Sender<bool>,
    synced_rx: watch::Receiver<bool>,
}

impl<K: Resource, S: WatchSource<K>> Informer<K, S> {
    pub fn new(
        source: Arc<S>,
        config: &WatchConfig,
    ) -> Self {
        let (synced_tx, synced_rx) = watch::channel(false);
        Self {
            source,
            store: Arc::new(Store::new()),
            handlers: Vec::new(),
            resync_interval: config.resync_interval(),
            relist_backoff: config.relist_backoff.clone(),
            synced_tx,
            synced_rx,
        }
    }

    /// Handlers have to be registered before [`Informer::run`] starts.
    pub fn add_event_handler(
        &mut self,
        handler: Arc<dyn ResourceEventHandler<K>>,
    ) {
        self.handlers.push(handler);
    }

    pub fn store(&self) -> Arc<Store<K>> {
        self.store.clone()
    }

    /// Flips to `true` once, when the first list has been applied.
    pub(crate) fn subscribe_synced(&self) -> watch::Receiver<bool> {
        self.synced_rx.clone()
    }

    /// True once the first list has been applied to the store.
    pub fn has_synced(&self) -> bool {
        *self.synced_rx.borrow()
    }

    pub async fn wait_for_sync(&self) {
        let mut rx = self.subscribe_synced();
        while !*rx.borrow_and_update() {
            if rx.changed().await.is_err() {
                return;
            }
        }
    }

    /// Runs until `shutdown` fires (or its sender is dropped).
    pub async fn run(
        self: Arc<Self>,
        mut shutdown: watch::Receiver<()>,
    ) -> Result<()> {
        // Consecutive failures since the last applied list
        let mut failures = 0u32;

        loop {
            match self.list_and_watch(&mut shutdown, &mut failures).await {
                Ok(CycleExit::Shutdown) => {
                    info!(kind = K::KIND, "informer stopped");
                    return Ok(());
                }
                Ok(CycleExit::Resync) => {
                    debug!(kind = K::KIND, "periodic resync");
                }
                Err(e) => {
                    let delay = jittered(self.relist_backoff.delay_for(failures));
                    failures = failures.saturating_add(1);
                    warn!(kind = K::KIND, %e, ?delay, failures, "list/watch failed, relisting");

                    tokio::select! {
                        _ = shutdown.changed() => {
                            info!(kind = K::KIND, "informer stopped during backoff");
                            return Ok(());
                        }
                        _ = sleep(delay) => {}
                    }
                }
            }
        }
    }

    async fn list_and_watch(
        &self,
        shutdown: &mut watch::Receiver<()>,
        failures: &mut u32,
    ) -> std::result::Result<CycleExit, WatchError> {
        let list = tokio::select! {
            _ = shutdown.changed() => return Ok(CycleExit::Shutdown),
            list = self.source.list() => list?,
        };
        self.apply_list(list);
        *failures = 0;
        self.synced_tx.send_if_modified(|synced| !std::mem::replace(synced, true));

        let resync = sleep(self.resync_interval);
        tokio::pin!(resync);

        loop {
            let version = self.store.resource_version();
            let mut stream = tokio::select! {
                _ = shutdown.changed() => return Ok(CycleExit::Shutdown),
                _ = &mut resync => return Ok(CycleExit::Resync),
                stream = self.source.watch(&version) => stream?,
            };
            trace!(kind = K::KIND, %version, "watching");

            loop {
                tokio::select! {
                    biased;
                    _ = shutdown.changed() => return Ok(CycleExit::Shutdown),
                    _ = &mut resync => return Ok(CycleExit::Resync),
                    event = stream.next() => match event {
                        Some(WatchEvent::Error(e)) => return Err(e),
                        Some(event) => self.apply_event(event),
                        None => {
                            debug!(kind = K::KIND, "watch stream ended, resuming");
                            break;
                        }
                    },
                }
            }
        }
    }

    fn apply_list(
        &self,
        list: ObjectList<K>,
    ) {
        let started = Instant::now();
        let count = list.items.len();
        let items = list.items.into_iter().map(Arc::new).collect();
        let delta = self.store.replace(items, list.resource_version);

        for obj in &delta.added {
            self.handlers.iter().for_each(|h| h.on_add(obj));
        }
        for (old, new) in &delta.updated {
            self.handlers.iter().for_each(|h| h.on_update(old, new));
        }
        for (key, last_known) in delta.deleted {
            let tombstone = DeletedObject::FinalStateUnknown {
                key,
                last_known,
            };
            self.handlers.iter().for_each(|h| h.on_delete(&tombstone));
        }

        info!(
            kind = K::KIND,
            count,
            resource_version = %self.store.resource_version(),
            elapsed = ?started.elapsed(),
            "listed"
        );
    }

    fn apply_event(
        &self,
        event: WatchEvent<K>,
    ) {
        match event {
            WatchEvent::Added(obj) | WatchEvent::Modified(obj) => {
                let obj = Arc::new(obj);
                match self.store.upsert(obj.clone()) {
                    Ok(Some(old)) => self.handlers.iter().for_each(|h| h.on_update(&old, &obj)),
                    Ok(None) => self.handlers.iter().for_each(|h| h.on_add(&obj)),
                    Err(e) => warn!(kind = K::KIND, %e, "dropping watch event"),
                }
            }
            WatchEvent::Deleted(obj) => {
                let key = match obj.key() {
                    Ok(key) => key,
                    Err(e) => {
                        warn!(kind = K::KIND, %e, "dropping delete event");
                        return;
                    }
                };
                self.store.remove(&key);
                self.store.set_resource_version(obj.resource_version().to_string());

                let deleted = DeletedObject::Known(Arc::new(obj));
                self.handlers.iter().for_each(|h| h.on_delete(&deleted));
            }
            WatchEvent::Bookmark { resource_version } => {
                self.store.set_resource_version(resource_version);
            }
            WatchEvent::Error(e) => warn!(kind = K::KIND, %e, "unexpected error event"),
        }
    }
}

/// Adds up to 20% random jitter.
fn jittered(delay: Duration) -> Duration {
    let factor = rand::thread_rng().gen_range(1.0..1.2);
    delay.mul_f64(factor)
}
