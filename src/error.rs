//! Unified error types for the motion board firmware.
//!
//! A single `Error` enum that every subsystem can convert into, keeping
//! the control loop's error handling uniform. All variants are `Copy` so
//! they pass through the dispatcher without allocation.
//!
//! Note that none of these reach the operator as a crash: protocol errors
//! become ERROR replies (or are logged and dropped), calibration errors
//! trigger a fresh calibration pass, and init errors degrade the affected
//! subsystem.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A command line could not be turned into a [`Command`](crate::protocol::command::Command).
    Protocol(ProtocolError),
    /// A calibration pass produced no usable offsets.
    Calibration(CalibrationError),
    /// Peripheral initialisation failed.
    Init(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Protocol(e) => write!(f, "protocol: {e}"),
            Self::Calibration(e) => write!(f, "calibration: {e}"),
            Self::Init(msg) => write!(f, "init: {msg}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Protocol errors
// ---------------------------------------------------------------------------

/// Short reason codes carried in `ERROR` replies (`msg` field) and in the
/// legacy `ERR <CMD> <reason>` lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolError {
    /// The command name is not in the command set.
    UnknownCommand,
    /// Required `args` field absent.
    MissingArgs,
    /// Wrong number of arguments.
    BadArity,
    /// Argument present but of the wrong type.
    BadType,
    /// Argument out of its addressable range (e.g. motor index 7).
    BadArgs,
}

impl ProtocolError {
    /// Wire reason code.
    pub const fn code(self) -> &'static str {
        match self {
            Self::UnknownCommand => "UNKNOWN_CMD",
            Self::MissingArgs => "MISSING_ARGS",
            Self::BadArity => "BAD_ARITY",
            Self::BadType => "BAD_TYPE",
            Self::BadArgs => "BAD_ARGS",
        }
    }
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownCommand => write!(f, "unknown command"),
            Self::MissingArgs => write!(f, "missing arguments"),
            Self::BadArity => write!(f, "wrong argument count"),
            Self::BadType => write!(f, "wrong argument type"),
            Self::BadArgs => write!(f, "argument out of range"),
        }
    }
}

impl From<ProtocolError> for Error {
    fn from(e: ProtocolError) -> Self {
        Self::Protocol(e)
    }
}

// ---------------------------------------------------------------------------
// Calibration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationError {
    /// An offset failed the plausibility bound.
    Implausible,
    /// The IMU collaborator produced no samples during calibration.
    NoSamples,
}

impl fmt::Display for CalibrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Implausible => write!(f, "offset outside plausibility bound"),
            Self::NoSamples => write!(f, "no IMU samples collected"),
        }
    }
}

impl From<CalibrationError> for Error {
    fn from(e: CalibrationError) -> Self {
        Self::Calibration(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
