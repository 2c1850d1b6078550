use std::sync::Arc;

use async_trait::async_trait;

use crate::ReconcileError;
use crate::Resource;
use crate::ResourceKey;

/// The per-key action driven by the workers.
///
/// At most one invocation per key runs at any time. An `Err` requeues the key
/// with backoff; `Ok` resets its retry history.
#[async_trait]
pub trait Reconciler<K: Resource>: Send + Sync + 'static {
    /// Brings the world in line with the cached `obj`.
    async fn reconcile(
        &self,
        key: &ResourceKey,
        obj: Arc<K>,
    ) -> Result<(), ReconcileError>;

    /// Called when `key` is no longer in the cache.
    async fn cleanup(
        &self,
        _key: &ResourceKey,
    ) -> Result<(), ReconcileError> {
        Ok(())
    }
}
