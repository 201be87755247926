//! Line-oriented command protocol.
//!
//! - [`codec`]: byte stream → bounded lines
//! - [`command`]: line → typed [`Command`](command::Command)
//! - [`response`]: reply lines
//! - [`engine`]: ties them to the motor layer and the controller context

pub mod codec;
pub mod command;
pub mod engine;
pub mod response;
