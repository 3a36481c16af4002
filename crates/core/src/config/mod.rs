//! Configuration loading and management.
//!
//! This module loads the `.ws-loader/` directory and merges local values with
//! cluster-provided settings.

pub mod error;
pub mod loader;
pub mod models;
