//! # wl-core
//!
//! Workspace loading state machine.
//!
//! This crate provides:
//! - Configuration loading from the `.ws-loader/` directory
//! - The step list of each loading flow and its display tree
//! - One runner per step deciding whether to advance, wait or fail
//! - The loader controller driving the runners from store updates, timers
//!   and user actions
//! - Log aggregation used to explain failures
//!
//! ## Modules
//!
//! - [`config`]: Configuration loading and management
//! - [`collaborators`]: Traits of the external cluster client and resolver
//! - [`steps`]: Step list construction
//! - [`runners`]: Per-step decision functions
//! - [`loader`]: The loader controller
//! - [`replay`]: Scenario replay against mock collaborators

pub mod collaborators;
pub mod config;
pub mod error;
pub mod loader;
pub mod logs;
pub mod replay;
pub mod runners;
pub mod steps;
pub mod timer;
