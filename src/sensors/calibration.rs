//! IMU offset calibration record.
//!
//! Six float offsets (gyro then accel, raw sensor counts) are persisted
//! through a [`CalibrationStore`].  A stored record is trusted only if
//! every offset is below [`PLAUSIBILITY_BOUND`] in magnitude; anything
//! else (missing, undecodable, implausible) triggers a fresh pass with
//! the robot at rest.

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::app::ports::{CalibrationStore, ImuPort};
use crate::error::CalibrationError;

/// Offsets at or above this magnitude mark a record as garbage.
pub const PLAUSIBILITY_BOUND: f32 = 1000.0;

/// Samples averaged by one calibration pass.
pub const CALIBRATION_SAMPLES: u16 = 500;

/// Raw accelerometer counts for 1 g at the ±2 g range.
const ONE_G_RAW: f32 = 16384.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CalibrationRecord {
    pub gyro_x: f32,
    pub gyro_y: f32,
    pub gyro_z: f32,
    pub accel_x: f32,
    pub accel_y: f32,
    pub accel_z: f32,
}

impl CalibrationRecord {
    fn offsets(&self) -> [f32; 6] {
        [
            self.gyro_x,
            self.gyro_y,
            self.gyro_z,
            self.accel_x,
            self.accel_y,
            self.accel_z,
        ]
    }

    /// Reject NaN and anything at or beyond the plausibility bound.
    pub fn validate(&self) -> Result<(), CalibrationError> {
        if self
            .offsets()
            .iter()
            .all(|o| o.is_finite() && o.abs() < PLAUSIBILITY_BOUND)
        {
            Ok(())
        } else {
            Err(CalibrationError::Implausible)
        }
    }
}

/// Average up to `samples` raw readings into a fresh record.
///
/// Missing readings are skipped; the average is over what arrived.  The
/// Z accelerometer offset has gravity removed.
pub fn calibrate(
    imu: &mut impl ImuPort,
    samples: u16,
) -> Result<CalibrationRecord, CalibrationError> {
    let mut sums = [0i64; 6];
    let mut taken: u32 = 0;

    for _ in 0..samples {
        let Some(raw) = imu.read_raw() else {
            continue;
        };
        for (axis, v) in raw.gyro.iter().chain(raw.accel.iter()).enumerate() {
            sums[axis] += i64::from(*v);
        }
        taken += 1;
    }

    if taken == 0 {
        return Err(CalibrationError::NoSamples);
    }

    let n = taken as f32;
    let record = CalibrationRecord {
        gyro_x: sums[0] as f32 / n,
        gyro_y: sums[1] as f32 / n,
        gyro_z: sums[2] as f32 / n,
        accel_x: sums[3] as f32 / n,
        accel_y: sums[4] as f32 / n,
        accel_z: sums[5] as f32 / n - ONE_G_RAW,
    };
    info!("Calibration: averaged {} samples", taken);
    Ok(record)
}

/// Boot path: use the stored record if it is plausible, otherwise
/// recalibrate and persist the result.
///
/// Never fails.  If the IMU yields nothing, a zero record is used and the
/// store is left untouched.
pub fn load_or_calibrate(
    store: &mut impl CalibrationStore,
    imu: &mut impl ImuPort,
) -> CalibrationRecord {
    match store.load_calibration() {
        Ok(record) => match record.validate() {
            Ok(()) => {
                info!("Calibration: loaded stored record");
                return record;
            }
            Err(e) => warn!("Calibration: stored record rejected ({}), recalibrating", e),
        },
        Err(e) => info!("Calibration: no usable record ({}), recalibrating", e),
    }

    match calibrate(imu, CALIBRATION_SAMPLES) {
        Ok(record) => {
            if let Err(e) = store.save_calibration(&record) {
                warn!("Calibration: save failed ({})", e);
            }
            record
        }
        Err(e) => {
            warn!("Calibration: {}; using zero offsets", e);
            CalibrationRecord::default()
        }
    }
}
