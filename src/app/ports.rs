//! Port traits — the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ ControllerService (domain)
//! ```
//!
//! Driven adapters (motor bank, IMU, serial link, event sinks, storage)
//! implement these traits.  The [`ControllerService`](super::service::ControllerService)
//! consumes them via generics, so the domain core never touches hardware
//! directly.
//!
//! - **ConfigPort** and **CalibrationStore** implementations MUST validate
//!   before persisting.
//! - All port errors are typed; callers must handle every variant explicitly.

use crate::config::ControllerConfig;
use crate::error::Error;
use crate::motors::WHEEL_COUNT;
use crate::protocol::command::Subsystem;
use crate::sensors::calibration::CalibrationRecord;
use crate::sensors::{ImuSample, RawMotion};

// ───────────────────────────────────────────────────────────────
// Motor port (driven adapter: domain → H-bridges)
// ───────────────────────────────────────────────────────────────

/// Logical four-wheel drive interface.
///
/// Wheel indices are zero-based (`0` = front left, `1` = front right,
/// `2` = rear left, `3` = rear right).  No operation can fail; speeds are
/// clamped to `[-255, 255]` by the implementation.
pub trait MotorPort {
    /// Command one wheel.  Out-of-range indices are ignored.
    fn set_wheel(&mut self, wheel: usize, speed: i32);

    /// Re-assert the global enable line, then command all four wheels.
    fn drive_all(&mut self, speeds: [i32; WHEEL_COUNT]);

    /// Assert the global enable line without touching wheel commands.
    fn enable(&mut self);

    /// Drop the global enable line without touching wheel commands.
    fn disable(&mut self);

    /// Whether the global enable line is currently asserted.
    fn is_enabled(&self) -> bool;

    /// Last logical (pre-inversion, clamped) command per wheel.
    fn commands(&self) -> [i16; WHEEL_COUNT];

    fn stop_all(&mut self) {
        self.drive_all([0; WHEEL_COUNT]);
    }

    fn forward(&mut self, speed: i32) {
        self.drive_all([speed; WHEEL_COUNT]);
    }

    fn backward(&mut self, speed: i32) {
        self.drive_all([-speed; WHEEL_COUNT]);
    }

    fn turn_left(&mut self, speed: i32) {
        self.drive_all([-speed, speed, -speed, speed]);
    }

    fn turn_right(&mut self, speed: i32) {
        self.drive_all([speed, -speed, speed, -speed]);
    }
}

// ───────────────────────────────────────────────────────────────
// IMU port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// External inertial-sensor collaborator.
///
/// `None` always means "no data this cycle"; the caller never blocks or
/// retries.
pub trait ImuPort {
    /// Fused orientation and linear acceleration, if a sample is ready.
    fn read_sample(&mut self) -> Option<ImuSample>;

    /// Raw six-axis reading used by the calibration pass.
    fn read_raw(&mut self) -> Option<RawMotion>;
}

// ───────────────────────────────────────────────────────────────
// Subsystem initializers
// ───────────────────────────────────────────────────────────────

/// Hooks re-run by the `INIT` command and once at boot.
pub trait SubsystemInit {
    /// (Re-)initialise the peripherals behind `target`.
    ///
    /// Failures degrade the subsystem; the controller keeps running.
    fn init(&mut self, target: Subsystem) -> Result<(), Error>;
}

/// Everything the controller drives or polls on the board, as one bound.
pub trait BoardPort: MotorPort + ImuPort + SubsystemInit {}

impl<T: MotorPort + ImuPort + SubsystemInit> BoardPort for T {}

// ───────────────────────────────────────────────────────────────
// Serial link (driven adapter: bytes ↔ domain)
// ───────────────────────────────────────────────────────────────

/// Non-blocking byte channel to the bridge board.
pub trait SerialPort {
    /// Next received byte, or `None` when nothing is buffered.
    fn read_byte(&mut self) -> Option<u8>;

    /// Transmit one line; the adapter appends the terminator.
    fn write_line(&mut self, line: &str);
}

// ───────────────────────────────────────────────────────────────
// System port (clock + memory probe)
// ───────────────────────────────────────────────────────────────

pub trait SystemPort {
    /// Monotonic milliseconds since boot.  Wraps at `u32::MAX`.
    fn now_ms(&self) -> u32;

    /// Best-effort free heap estimate in bytes.
    fn free_memory(&self) -> u32;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits [`ControllerEvent`](super::events::ControllerEvent)s
/// through this port.  Adapters decide where they go.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::ControllerEvent);
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists controller configuration.
///
/// Implementations MUST validate config values before persisting.
/// Invalid ranges are rejected with [`ConfigError::ValidationFailed`],
/// not silently clamped.
pub trait ConfigPort {
    /// Load configuration from persistent storage.
    /// Returns [`ControllerConfig::default()`] if no stored config exists.
    fn load(&self) -> Result<ControllerConfig, ConfigError>;

    /// Validate and persist configuration.
    fn save(&self, config: &ControllerConfig) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Calibration store (driven adapter: domain ↔ NVS / flash)
// ───────────────────────────────────────────────────────────────

/// Fixed-size IMU offset record storage.
pub trait CalibrationStore {
    /// Load the stored record.  Plausibility is the caller's concern.
    fn load_calibration(&self) -> Result<CalibrationRecord, StorageError>;

    /// Persist a record atomically.
    fn save_calibration(&mut self, record: &CalibrationRecord) -> Result<(), StorageError>;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigPort`] operations.
#[derive(Debug)]
pub enum ConfigError {
    /// Stored config failed integrity / deserialization check.
    Corrupted,
    /// A config field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// Underlying storage is full.
    StorageFull,
    /// Generic I/O error from the storage backend.
    IoError,
}

/// Errors from [`CalibrationStore`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// Requested key does not exist.
    NotFound,
    /// Stored bytes did not decode.
    Corrupted,
    /// Storage partition is full.
    Full,
    /// Generic I/O error.
    IoError,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::StorageFull => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl core::fmt::Display for StorageError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "key not found"),
            Self::Corrupted => write!(f, "record corrupted"),
            Self::Full => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}
