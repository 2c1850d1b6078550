use std::sync::Arc;

use super::Resource;
use super::ResourceKey;
use crate::CacheError;

/// Last state of an object that left the cache.
#[derive(Debug, Clone)]
pub enum DeletedObject<K: Resource> {
    /// Deletion observed on the watch stream
    Known(Arc<K>),

    /// Object disappeared between two lists; the delete event itself was
    /// missed, `last_known` may be stale
    FinalStateUnknown { key: ResourceKey, last_known: Arc<K> },
}

impl<K: Resource> DeletedObject<K> {
    /// Key of the deleted object, tombstones included.
    pub fn key(&self) -> Result<ResourceKey, CacheError> {
        match self {
            Self::Known(obj) => obj.key(),
            Self::FinalStateUnknown { key, .. } => Ok(key.clone()),
        }
    }

    pub fn object(&self) -> &Arc<K> {
        match self {
            Self::Known(obj) => obj,
            Self::FinalStateUnknown { last_known, .. } => last_known,
        }
    }
}

/// Receives cache change notifications. Called inline from the informer
/// loop, implementations must not block.
pub trait ResourceEventHandler<K: Resource>: Send + Sync + 'static {
    fn on_add(
        &self,
        obj: &Arc<K>,
    );

    /// Also called for every cached object on a periodic relist, with
    /// `old` and `new` possibly equal.
    fn on_update(
        &self,
        old: &Arc<K>,
        new: &Arc<K>,
    );

    fn on_delete(
        &self,
        obj: &DeletedObject<K>,
    );
}
