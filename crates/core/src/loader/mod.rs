//! Loader controller and the session state it drives.

pub mod alerts;
mod controller;
pub mod session;

pub use controller::{
    spawn_loader, LoaderController, LoaderHandle, LoaderOptions, CHANNEL_CAPACITY,
};
