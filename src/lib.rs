//! Workspace harness for glock: integration tests, benchmarks and demos.
//!
//! Library users depend on the [`glock`] meta-crate directly.

pub use glock::*;
