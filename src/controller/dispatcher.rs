use std::sync::Arc;

use tracing::trace;
use tracing::warn;

use crate::DeletedObject;
use crate::RateLimitingQueue;
use crate::Resource;
use crate::ResourceEventHandler;
use crate::ResourceKey;

/// Enqueues the key of every added, updated or deleted object.
pub struct EventDispatcher {
    queue: Arc<RateLimitingQueue<ResourceKey>>,
}

impl EventDispatcher {
    pub fn new(queue: Arc<RateLimitingQueue<ResourceKey>>) -> Self {
        Self { queue }
    }

    fn enqueue<K: Resource>(
        &self,
        event: &'static str,
        obj: &K,
    ) {
        match obj.key() {
            Ok(key) => {
                trace!(kind = K::KIND, event, %key, "enqueue");
                self.queue.add(key);
            }
            Err(e) => warn!(kind = K::KIND, event, %e, "cannot derive key, dropping event"),
        }
    }
}

impl<K: Resource> ResourceEventHandler<K> for EventDispatcher {
    fn on_add(
        &self,
        obj: &Arc<K>,
    ) {
        self.enqueue("add", obj.as_ref());
    }

    fn on_update(
        &self,
        _old: &Arc<K>,
        new: &Arc<K>,
    ) {
        self.enqueue("update", new.as_ref());
    }

    fn on_delete(
        &self,
        obj: &DeletedObject<K>,
    ) {
        match obj.key() {
            Ok(key) => {
                trace!(kind = K::KIND, event = "delete", %key, "enqueue");
                self.queue.add(key);
            }
            Err(e) => warn!(kind = K::KIND, event = "delete", %e, "cannot derive key, dropping event"),
        }
    }
}
