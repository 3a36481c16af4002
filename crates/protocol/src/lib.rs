//! # wl-protocol
//!
//! Core protocol definitions and data models for the workspace loader.
//!
//! This crate defines all shared data structures used for:
//! - Loader steps and their display tree
//! - Workspace snapshots and factory resolution results
//! - Communication between the view layer and the loader controller
//! - Configuration and replay scenario files
//!
//! ## Modules
//!
//! - [`step_models`]: Step identifiers, step records, display tree
//! - [`workspace_models`]: Workspace phases, snapshots, cluster snapshot
//! - [`factory_models`]: Factory parameters, devfiles, pre-built resources
//! - [`alert_models`]: The single alert shown by the loader
//! - [`config_models`]: `config.toml` and cluster-provided settings
//! - [`scenario_models`]: Replay scenarios
//! - [`ipc`]: Operations and Events for view/controller communication
//!
//! ## Design Principles
//!
//! - Minimal dependencies: Only serde, ts-rs, uuid and chrono
//! - TypeScript generation: All types derive `TS` for client compatibility
//! - Independent compilation: No dependencies on other workspace crates

pub mod alert_models;
pub mod config_models;
pub mod factory_models;
pub mod ipc;
pub mod scenario_models;
pub mod step_models;
pub mod workspace_models;

// Re-export all public types for convenience
pub use alert_models::*;
pub use config_models::*;
pub use factory_models::*;
pub use ipc::*;
pub use scenario_models::*;
pub use step_models::*;
pub use workspace_models::*;
