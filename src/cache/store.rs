use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::warn;

use super::Resource;
use super::ResourceKey;
use crate::CacheError;

/// Thread-safe snapshot of the watched objects, addressed by [`ResourceKey`].
///
/// Readers get shared `Arc`s; only the owning [`super::Informer`] mutates it.
#[derive(Debug)]
pub struct Store<K: Resource> {
    items: RwLock<HashMap<ResourceKey, Arc<K>>>,
    resource_version: RwLock<String>,
}

/// Changes applied by [`Store::replace`].
#[derive(Debug)]
pub(crate) struct StoreDelta<K: Resource> {
    pub(crate) added: Vec<Arc<K>>,
    pub(crate) updated: Vec<(Arc<K>, Arc<K>)>,
    pub(crate) deleted: Vec<(ResourceKey, Arc<K>)>,
}

impl<K: Resource> Default for Store<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Resource> Store<K> {
    pub fn new() -> Self {
        Self {
            items: RwLock::new(HashMap::new()),
            resource_version: RwLock::new(String::new()),
        }
    }

    /// Looks up an object by its string key.
    ///
    /// `Ok(None)` means the object does not exist (any more); an error means
    /// the key itself is malformed.
    pub fn get_by_key(
        &self,
        key: &str,
    ) -> Result<Option<Arc<K>>, CacheError> {
        let key: ResourceKey = key.parse()?;
        Ok(self.get(&key))
    }

    pub fn get(
        &self,
        key: &ResourceKey,
    ) -> Option<Arc<K>> {
        self.items.read().get(key).cloned()
    }

    pub fn list(&self) -> Vec<Arc<K>> {
        self.items.read().values().cloned().collect()
    }

    /// All keys, sorted.
    pub fn list_keys(&self) -> Vec<ResourceKey> {
        let mut keys: Vec<_> = self.items.read().keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Version token of the last list or watch event applied.
    pub fn resource_version(&self) -> String {
        self.resource_version.read().clone()
    }

    /// Inserts or replaces `obj`; returns the previous version.
    pub(crate) fn upsert(
        &self,
        obj: Arc<K>,
    ) -> Result<Option<Arc<K>>, CacheError> {
        let key = obj.key()?;
        let version = obj.resource_version().to_string();
        let old = self.items.write().insert(key, obj);
        self.set_resource_version(version);
        Ok(old)
    }

    pub(crate) fn remove(
        &self,
        key: &ResourceKey,
    ) -> Option<Arc<K>> {
        self.items.write().remove(key)
    }

    pub(crate) fn set_resource_version(
        &self,
        version: String,
    ) {
        if !version.is_empty() {
            *self.resource_version.write() = version;
        }
    }

    /// Swaps the whole content for a fresh list and reports the difference.
    /// Objects without a valid key are skipped.
    pub(crate) fn replace(
        &self,
        objects: Vec<Arc<K>>,
        resource_version: String,
    ) -> StoreDelta<K> {
        let mut fresh = HashMap::with_capacity(objects.len());
        for obj in objects {
            match obj.key() {
                Ok(key) => {
                    fresh.insert(key, obj);
                }
                Err(e) => warn!(kind = K::KIND, ?e, "skipping listed object without valid key"),
            }
        }

        let mut items = self.items.write();
        let mut delta = StoreDelta {
            added: Vec::new(),
            updated: Vec::new(),
            deleted: Vec::new(),
        };

        for (key, obj) in &fresh {
            match items.get(key) {
                Some(old) => delta.updated.push((old.clone(), obj.clone())),
                None => delta.added.push(obj.clone()),
            }
        }
        for (key, old) in items.iter() {
            if !fresh.contains_key(key) {
                delta.deleted.push((key.clone(), old.clone()));
            }
        }

        *items = fresh;
        drop(items);
        self.set_resource_version(resource_version);

        delta
    }
}
