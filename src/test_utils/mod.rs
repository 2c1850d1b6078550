//! the test_utils folder here will share fixtures and helpers between unit
//! tests of all modules
mod common;
mod fixtures;

pub use common::*;
pub use fixtures::*;
