//! Controller Error Hierarchy
//!
//! Defines error types for the reconciliation core, categorized by the
//! layer that produced them. Only [`ConnectivityError`] and configuration
//! failures are fatal to [`crate::Controller::run`]; everything else is
//! routed through the [`crate::ErrorReporter`] and retried.

use std::time::Duration;

use config::ConfigError;
use tokio::task::JoinError;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Controller configuration validation failures
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Startup handshake with the watch source failed
    #[error(transparent)]
    Connectivity(#[from] ConnectivityError),

    /// Local cache mirror failures
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// List/watch transport failures
    #[error(transparent)]
    Watch(#[from] WatchError),

    /// Reconcile action failures (retried with backoff)
    #[error(transparent)]
    Reconcile(#[from] ReconcileError),

    #[error("Background task failed: {0}")]
    TaskFailed(#[from] JoinError),
}

#[derive(Debug, thiserror::Error)]
pub enum ConnectivityError {
    /// Server version probe returned an error
    #[error("communicating with server failed: {source}")]
    Handshake {
        #[source]
        source: WatchError,
    },

    /// Server version probe did not answer in time
    #[error("communicating with server timed out after {0:?}")]
    ProbeTimeout(Duration),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WatchError {
    /// Endpoint unavailable (HTTP 503 equivalent)
    #[error("Watch source unavailable: {0}")]
    Unavailable(String),

    /// The requested resource version is too old to resume from
    #[error("Resource version {resource_version} expired")]
    Expired { resource_version: String },

    /// The source sent an object that could not be decoded
    #[error("Failed to decode watch payload: {0}")]
    Decode(String),

    /// Source-side stream terminated abnormally
    #[error("Watch stream closed: {0}")]
    Closed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CacheError {
    /// Key does not follow `namespace/name` or `name`
    #[error("unexpected key format: {0:?}")]
    InvalidKey(String),

    /// Object without a name cannot be addressed
    #[error("object has no name")]
    MissingName,
}

#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    /// Cached object or payload does not match the expected representation
    #[error("casting {what} failed: {reason}")]
    Cast { what: &'static str, reason: String },

    /// Strategy discriminator names no known install strategy
    #[error("unsupported install strategy {0:?}")]
    UnsupportedStrategy(String),

    /// Strategy installer reported a failure
    #[error("install into namespace {namespace:?} failed: {reason}")]
    Install { namespace: String, reason: String },

    /// Generic handler failure
    #[error("{0}")]
    Handler(String),

    /// Handler exceeded its configured time bound
    #[error("reconcile timed out after {0:?}")]
    Timeout(Duration),

    /// Handler aborted because the controller is shutting down
    #[error("reconcile cancelled by shutdown")]
    Cancelled,
}

impl ReconcileError {
    pub fn cast(
        what: &'static str,
        reason: impl Into<String>,
    ) -> Self {
        Self::Cast {
            what,
            reason: reason.into(),
        }
    }

    pub fn install(
        namespace: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Install {
            namespace: namespace.into(),
            reason: reason.into(),
        }
    }
}
