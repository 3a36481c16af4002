//! Common test utilities and helpers for loader integration tests.
//!
//! This module provides shared functionality across the integration tests:
//! - Test fixtures (snapshots, factory parameters, config directories)
//! - Custom assertions over emitted events
//! - A harness driving a spawned controller

pub mod assertions;
pub mod fixtures;

#[allow(unused_imports)]
pub use assertions::*;
#[allow(unused_imports)]
pub use fixtures::*;
