//! Common test utilities for cache integration tests.

#![allow(dead_code)]

pub mod fixtures;
pub mod generators;

pub use fixtures::*;
pub use generators::*;
