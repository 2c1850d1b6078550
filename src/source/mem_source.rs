use std::collections::BTreeMap;
use std::collections::VecDeque;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use async_trait::async_trait;
use futures::future;
use futures::stream;
use futures::StreamExt;
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tracing::debug;

use super::ObjectList;
use super::WatchEvent;
use super::WatchSource;
use super::WatchStream;
use crate::Resource;
use crate::ResourceKey;
use crate::WatchError;

const DEFAULT_HISTORY_LIMIT: usize = 1024;
const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

#[derive(Debug, Clone)]
enum Broadcast<K> {
    Event(WatchEvent<K>),
    /// Ends every open watch stream
    Disconnect,
}

#[derive(Debug)]
struct MemState<K> {
    objects: BTreeMap<ResourceKey, K>,
    revision: u64,
    /// Recent events, oldest first, for resuming watches
    history: VecDeque<(u64, WatchEvent<K>)>,
}

/// Versioned in-process object store implementing [`WatchSource`].
///
/// Every mutation bumps a global revision which becomes the object's
/// resource version. Watches resume from any revision still held in the
/// bounded event history; older ones get [`WatchError::Expired`].
#[derive(Debug)]
pub struct InMemoryWatchSource<K: Resource> {
    state: Mutex<MemState<K>>,
    events: broadcast::Sender<Broadcast<K>>,
    server_version: String,
    history_limit: usize,
    available: AtomicBool,
    list_calls: AtomicUsize,
    watch_calls: AtomicUsize,
}

impl<K: Resource> Default for InMemoryWatchSource<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Resource> InMemoryWatchSource<K> {
    pub fn new() -> Self {
        Self::with_history_limit(DEFAULT_HISTORY_LIMIT)
    }

    pub fn with_history_limit(history_limit: usize) -> Self {
        let (events, _) = broadcast::channel(DEFAULT_CHANNEL_CAPACITY);
        Self {
            state: Mutex::new(MemState {
                objects: BTreeMap::new(),
                revision: 0,
                history: VecDeque::new(),
            }),
            events,
            server_version: format!("in-memory/{}", env!("CARGO_PKG_VERSION")),
            history_limit,
            available: AtomicBool::new(true),
            list_calls: AtomicUsize::new(0),
            watch_calls: AtomicUsize::new(0),
        }
    }

    /// Stores `obj` and returns it with its new resource version.
    /// Emits `Added` or `Modified` depending on prior existence.
    pub fn apply(
        &self,
        mut obj: K,
    ) -> Result<K, WatchError> {
        let key = obj.key().map_err(|e| WatchError::Decode(e.to_string()))?;

        let mut state = self.state.lock();
        state.revision += 1;
        let revision = state.revision;
        obj.meta_mut().resource_version = revision.to_string();

        let event = match state.objects.insert(key, obj.clone()) {
            Some(_) => WatchEvent::Modified(obj.clone()),
            None => WatchEvent::Added(obj.clone()),
        };
        self.publish(&mut state, revision, event);

        Ok(obj)
    }

    /// Removes the object under `key`, returning its final state.
    pub fn delete(
        &self,
        key: &ResourceKey,
    ) -> Option<K> {
        let mut state = self.state.lock();
        let mut obj = state.objects.remove(key)?;
        state.revision += 1;
        let revision = state.revision;
        obj.meta_mut().resource_version = revision.to_string();

        self.publish(&mut state, revision, WatchEvent::Deleted(obj.clone()));
        Some(obj)
    }

    /// Advances the revision without touching any object, as unrelated
    /// writes would, and emits a progress marker for it.
    pub fn bookmark(&self) {
        let mut state = self.state.lock();
        state.revision += 1;
        let revision = state.revision;
        self.publish(
            &mut state,
            revision,
            WatchEvent::Bookmark {
                resource_version: revision.to_string(),
            },
        );
    }

    pub fn get(
        &self,
        key: &ResourceKey,
    ) -> Option<K> {
        self.state.lock().objects.get(key).cloned()
    }

    pub fn revision(&self) -> u64 {
        self.state.lock().revision
    }

    /// While unavailable, every request fails with [`WatchError::Unavailable`].
    pub fn set_available(
        &self,
        available: bool,
    ) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Ends all open watch streams without error. Clients resume from their
    /// last seen version.
    pub fn disconnect_watchers(&self) {
        let _state = self.state.lock();
        let _ = self.events.send(Broadcast::Disconnect);
    }

    /// Forgets the event history: resuming from any earlier revision expires.
    pub fn compact(&self) {
        self.state.lock().history.clear();
    }

    /// Sends a terminal error to all open watch streams.
    pub fn fail_watchers(
        &self,
        error: WatchError,
    ) {
        let _state = self.state.lock();
        let _ = self.events.send(Broadcast::Event(WatchEvent::Error(error)));
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn watch_calls(&self) -> usize {
        self.watch_calls.load(Ordering::SeqCst)
    }

    // Sending under the state lock keeps history and live delivery gap-free
    fn publish(
        &self,
        state: &mut MemState<K>,
        revision: u64,
        event: WatchEvent<K>,
    ) {
        state.history.push_back((revision, event.clone()));
        while state.history.len() > self.history_limit {
            state.history.pop_front();
        }
        let _ = self.events.send(Broadcast::Event(event));
    }

    fn check_available(&self) -> Result<(), WatchError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(WatchError::Unavailable("in-memory source marked unavailable".to_string()))
        }
    }
}

#[async_trait]
impl<K: Resource> WatchSource<K> for InMemoryWatchSource<K> {
    async fn server_version(&self) -> Result<String, WatchError> {
        self.check_available()?;
        Ok(self.server_version.clone())
    }

    async fn list(&self) -> Result<ObjectList<K>, WatchError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;

        let state = self.state.lock();
        Ok(ObjectList {
            items: state.objects.values().cloned().collect(),
            resource_version: state.revision.to_string(),
        })
    }

    async fn watch(
        &self,
        resource_version: &str,
    ) -> Result<WatchStream<K>, WatchError> {
        self.watch_calls.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;

        let expired = || WatchError::Expired {
            resource_version: resource_version.to_string(),
        };

        let state = self.state.lock();
        let from = if resource_version.is_empty() {
            state.revision
        } else {
            resource_version.parse::<u64>().map_err(|_| expired())?
        };
        if from > state.revision {
            return Err(expired());
        }
        if from < state.revision {
            let oldest = state.history.front().map(|(rev, _)| *rev);
            if oldest.map_or(true, |oldest| oldest > from + 1) {
                return Err(expired());
            }
        }

        let backlog: Vec<WatchEvent<K>> = state
            .history
            .iter()
            .filter(|(rev, _)| *rev > from)
            .map(|(_, ev)| ev.clone())
            .collect();
        // Subscribed under the lock: live events start right after the backlog
        let receiver = self.events.subscribe();
        drop(state);

        debug!(kind = K::KIND, from, backlog = backlog.len(), "watch opened");

        let live = BroadcastStream::new(receiver)
            .take_while(|msg| future::ready(!matches!(msg, Ok(Broadcast::Disconnect))))
            .filter_map(|msg| {
                future::ready(match msg {
                    Ok(Broadcast::Event(ev)) => Some(ev),
                    Ok(Broadcast::Disconnect) => None,
                    Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                        Some(WatchEvent::Error(WatchError::Closed(format!("watcher lagged by {skipped} events"))))
                    }
                })
            });

        Ok(stream::iter(backlog).chain(live).boxed())
    }
}
