//! ALM binding: reconciles `OperatorVersion` objects by dispatching on the
//! install strategy embedded in their spec.

mod installer;
mod operator_version;
mod reconciler;
mod strategy;

pub use installer::*;
pub use operator_version::*;
pub use reconciler::*;
pub use strategy::*;

#[cfg(test)]
mod reconciler_test;
