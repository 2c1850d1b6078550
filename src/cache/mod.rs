//! Local read-only mirror of the watched objects.
//!
//! The [`Informer`] keeps a [`Store`] in sync with a [`crate::WatchSource`]
//! (initial list, incremental watch, periodic relist) and fans every change
//! out to the registered [`ResourceEventHandler`]s.

mod handler;
mod informer;
mod key;
mod resource;
mod store;

pub use handler::*;
pub use informer::*;
pub use key::*;
pub use resource::*;
pub use store::*;
