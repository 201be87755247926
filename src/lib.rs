//! Motion board firmware library.
//!
//! Exposes the controller core, protocol and drivers for integration
//! testing and for the bridge-side status aggregator.  All ESP-IDF-specific
//! code is guarded by `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod bridge;
pub mod config;
pub mod drivers;
pub mod error;
pub mod motors;
pub mod odometry;
pub mod pins;
pub mod protocol;
pub mod safety;
pub mod scheduler;
pub mod sensors;

pub use error::{Error, Result};
