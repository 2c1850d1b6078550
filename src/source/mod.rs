//! Access to the authoritative object set.
//!
//! [`WatchSource`] is the seam towards the cluster API: a versioned list
//! snapshot plus a resumable event stream. The crate ships a token-bucket
//! wrapper ([`RateLimitedSource`]) and a complete in-process implementation
//! ([`InMemoryWatchSource`]) for embedding and tests.

mod mem_source;
mod rate_limited_source;

pub use mem_source::*;
pub use rate_limited_source::*;

#[cfg(test)]
mod rate_limited_source_test;

use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::Resource;
use crate::WatchError;

/// Full snapshot with the version token to start watching from.
#[derive(Debug, Clone)]
pub struct ObjectList<K> {
    pub items: Vec<K>,
    pub resource_version: String,
}

#[derive(Debug, Clone)]
pub enum WatchEvent<K> {
    Added(K),
    Modified(K),
    /// Carries the last state of the object
    Deleted(K),
    /// Progress marker without object change
    Bookmark { resource_version: String },
    /// Source-side failure; the consumer has to relist
    Error(WatchError),
}

pub type WatchStream<K> = BoxStream<'static, WatchEvent<K>>;

#[async_trait]
pub trait WatchSource<K: Resource>: Send + Sync + 'static {
    /// Connectivity probe. Returns the source's version string.
    async fn server_version(&self) -> Result<String, WatchError>;

    async fn list(&self) -> Result<ObjectList<K>, WatchError>;

    /// Streams changes after `resource_version`. An empty version starts
    /// from "now".
    async fn watch(
        &self,
        resource_version: &str,
    ) -> Result<WatchStream<K>, WatchError>;
}

#[async_trait]
impl<K, S> WatchSource<K> for Arc<S>
where
    K: Resource,
    S: WatchSource<K> + ?Sized,
{
    async fn server_version(&self) -> Result<String, WatchError> {
        (**self).server_version().await
    }

    async fn list(&self) -> Result<ObjectList<K>, WatchError> {
        (**self).list().await
    }

    async fn watch(
        &self,
        resource_version: &str,
    ) -> Result<WatchStream<K>, WatchError> {
        (**self).watch(resource_version).await
    }
}
