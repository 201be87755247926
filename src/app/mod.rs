//! Application core — controller state and orchestration, zero I/O.
//!
//! The service owns the shared [`context::ControllerContext`] and drives
//! the scheduled tasks.  All interaction with hardware, the serial link,
//! storage and the clock happens through **port traits** defined in
//! [`ports`], keeping this layer fully testable without real peripherals.

pub mod context;
pub mod events;
pub mod ports;
pub mod service;
