//! Event-driven reconciliation core for cluster operators.
//!
//! Objects flow from a [`WatchSource`] through an [`Informer`] into a local
//! [`Store`]; change notifications enqueue object keys into a deduplicating
//! [`RateLimitingQueue`]; a pool of workers drains the queue and invokes a
//! [`Reconciler`], retrying failures with per-key exponential backoff.
//! [`OperatorVersionReconciler`] is the bundled binding that installs
//! operator versions through a [`DeploymentInstaller`].

mod alm;
mod cache;
mod config;
mod constants;
mod controller;
mod errors;
mod metrics;
mod queue;
mod source;
mod utils;

pub use alm::*;
pub use cache::*;
pub use config::*;
pub use controller::*;
pub use errors::*;
pub use metrics::*;
pub use queue::*;
pub use source::*;

//-----------------------------------------------------------
// Test utils

#[cfg(test)]
pub mod test_utils;
