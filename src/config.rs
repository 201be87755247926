//! Controller configuration parameters
//!
//! All tunable parameters for the motion board.
//! Values can be overridden via NVS (non-volatile storage); anything not
//! stored falls back to the defaults below, which match the reference
//! chassis (TB6612 front axle, L298N rear axle, 85 mm wheels).

use serde::{Deserialize, Serialize};

use crate::app::ports::ConfigError;

/// Which H-bridge family drives a given wheel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DriverFamily {
    /// PWM + IN1/IN2, output stage gated by the shared STBY line.
    Tb6612,
    /// EN (PWM) + IN1/IN2, no standby line.
    L298n,
}

/// Core controller configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerConfig {
    // --- Scheduler periods (milliseconds) ---
    /// Serial command polling period
    pub comm_period_ms: u32,
    /// Command-timeout check period
    pub motor_period_ms: u32,
    /// IMU / peripheral polling period
    pub sensor_period_ms: u32,
    /// Cadence at which the odometry engine is asked whether it is due
    pub odometry_check_ms: u32,
    /// STATUS line period
    pub status_period_ms: u32,
    /// Health report period
    pub watchdog_period_ms: u32,

    // --- Safety ---
    /// Silence (ms) after which enabled motors are forced off
    pub command_timeout_ms: u32,

    // --- Odometry ---
    /// Minimum interval between odometry reports (ms)
    pub odometry_period_ms: u32,
    /// Wheel radius in metres
    pub wheel_radius_m: f32,
    /// Encoder pulses per wheel revolution (before gearing)
    pub pulses_per_rev: u16,
    /// Gearbox ratio between encoder shaft and wheel
    pub gear_ratio: f32,

    // --- Drive train ---
    /// Per-wheel sign inversion (wheel 1..4), compensates mounting direction
    pub inverted: [bool; 4],
    /// Per-wheel driver family (wheel 1..4)
    pub drivers: [DriverFamily; 4],

    // --- Protocol ---
    /// Longest accepted command line (characters)
    pub max_line_len: usize,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            // Scheduler
            comm_period_ms: 10,       // 100 Hz
            motor_period_ms: 20,      // 50 Hz
            sensor_period_ms: 50,     // 20 Hz
            odometry_check_ms: 25,    // 40 Hz
            status_period_ms: 1000,   // 1 Hz
            watchdog_period_ms: 5000, // 0.2 Hz

            // Safety
            command_timeout_ms: 2000,

            // Odometry
            odometry_period_ms: 200,
            wheel_radius_m: 0.0425,
            pulses_per_rev: 11,
            gear_ratio: 1.0,

            // Front right and rear right are mounted mirrored.
            inverted: [false, true, false, true],
            drivers: [
                DriverFamily::Tb6612,
                DriverFamily::Tb6612,
                DriverFamily::L298n,
                DriverFamily::L298n,
            ],

            max_line_len: 200,
        }
    }
}

impl ControllerConfig {
    /// Linear distance travelled by a wheel per encoder pulse (metres).
    pub fn distance_per_pulse(&self) -> f32 {
        (2.0 * core::f32::consts::PI * self.wheel_radius_m)
            / (self.pulses_per_rev as f32 * self.gear_ratio)
    }

    /// Range-check every field. Invalid values are rejected, not clamped.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let periods = [
            self.comm_period_ms,
            self.motor_period_ms,
            self.sensor_period_ms,
            self.odometry_check_ms,
            self.status_period_ms,
            self.watchdog_period_ms,
        ];
        if periods.iter().any(|p| *p == 0) {
            return Err(ConfigError::ValidationFailed("task periods must be > 0"));
        }
        if self.command_timeout_ms < self.comm_period_ms {
            return Err(ConfigError::ValidationFailed(
                "command_timeout_ms must be >= comm_period_ms",
            ));
        }
        if self.wheel_radius_m.is_nan() || self.wheel_radius_m <= 0.0 {
            return Err(ConfigError::ValidationFailed("wheel_radius_m must be > 0"));
        }
        if self.pulses_per_rev == 0 {
            return Err(ConfigError::ValidationFailed("pulses_per_rev must be > 0"));
        }
        if self.gear_ratio.is_nan() || self.gear_ratio <= 0.0 {
            return Err(ConfigError::ValidationFailed("gear_ratio must be > 0"));
        }
        if self.max_line_len == 0 || self.max_line_len > crate::protocol::codec::MAX_LINE_LEN {
            return Err(ConfigError::ValidationFailed(
                "max_line_len must be 1–200",
            ));
        }
        Ok(())
    }
}
