//! Drives reconciliation: turns cache notifications into queued keys and runs
//! the worker pool that hands each key to a [`Reconciler`].

mod builder;
mod dispatcher;
mod error_reporter;
mod lifecycle;
mod reconciler;
mod worker;

pub use builder::*;
pub use dispatcher::*;
pub use error_reporter::*;
pub use lifecycle::*;
pub use reconciler::*;
pub use worker::*;
