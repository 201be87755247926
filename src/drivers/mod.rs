//! Peripheral bring-up, pin-level output wrappers, and the task watchdog.

pub mod hw_init;
pub mod watchdog;
