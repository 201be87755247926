//! Sensor subsystem — wheel encoders and the IMU calibration record.
//!
//! The encoders are the only state shared with interrupt context; see
//! [`encoder`].  The IMU itself is an external collaborator reached
//! through [`ImuPort`](crate::app::ports::ImuPort); this module only
//! defines the sample shapes it hands back.

pub mod calibration;
pub mod encoder;

use serde::Serialize;

/// One fused IMU reading, cached by the sensor task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ImuSample {
    /// Degrees.
    pub yaw: f32,
    pub pitch: f32,
    pub roll: f32,
    /// Gravity-compensated linear acceleration (m/s²).
    pub accel: [f32; 3],
}

/// Raw six-axis counts straight from the IMU registers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RawMotion {
    pub accel: [i16; 3],
    pub gyro: [i16; 3],
}
