//! Hardware adapter — bridges real peripherals to domain port traits.
//!
//! Owns the [`MotorBank`] and the optional IMU collaborator, exposing them
//! through [`MotorPort`], [`ImuPort`] and [`SubsystemInit`].  This is the
//! only module in the system that touches actual hardware.  On non-espidf
//! targets, the underlying pin writes are cfg-gated no-ops.

use log::{info, warn};

use crate::app::ports::{ImuPort, MotorPort, SubsystemInit};
use crate::config::{ControllerConfig, DriverFamily};
use crate::drivers::hw_init::{self, GpioOutput, LedcPwm, LEDC_CH_MOTORS};
use crate::error::Error;
use crate::motors::driver::{L298nChannel, MotorDriver, Tb6612Channel};
use crate::motors::{MotorBank, WHEEL_COUNT};
use crate::pins;
use crate::protocol::command::Subsystem;
use crate::sensors::{ImuSample, RawMotion};

pub type BoardMotors = MotorBank<GpioOutput, LedcPwm>;

/// Build the four wheel channels, each with the driver family the config
/// names for it.
pub fn build_motor_bank(config: &ControllerConfig) -> BoardMotors {
    let wheels: [MotorDriver<GpioOutput, LedcPwm>; WHEEL_COUNT] = core::array::from_fn(|w| {
        let pwm = LedcPwm(LEDC_CH_MOTORS[w]);
        let (in1, in2) = pins::MOTOR_DIR_GPIOS[w];
        let (in1, in2) = (GpioOutput(in1), GpioOutput(in2));
        match config.drivers[w] {
            DriverFamily::Tb6612 => MotorDriver::Tb6612(Tb6612Channel::new(pwm, in1, in2)),
            DriverFamily::L298n => MotorDriver::L298n(L298nChannel::new(pwm, in1, in2)),
        }
    });
    info!("Motor: drivers {:?}, inverted {:?}", config.drivers, config.inverted);
    MotorBank::new(wheels, GpioOutput(pins::STBY_GPIO), config.inverted)
}

/// Placeholder IMU type for boards built without an IMU driver.
pub struct NoImu;

impl ImuPort for NoImu {
    fn read_sample(&mut self) -> Option<ImuSample> {
        None
    }

    fn read_raw(&mut self) -> Option<RawMotion> {
        None
    }
}

/// Concrete adapter that combines all board hardware behind port traits.
pub struct HardwareAdapter<I> {
    motors: BoardMotors,
    imu: Option<I>,
}

impl<I: ImuPort> HardwareAdapter<I> {
    /// `imu` is `None` when no IMU driver is fitted; reads then report
    /// "no data" every cycle.
    pub fn new(motors: BoardMotors, imu: Option<I>) -> Self {
        Self { motors, imu }
    }

    pub fn motors(&self) -> &BoardMotors {
        &self.motors
    }
}

// ── MotorPort implementation ──────────────────────────────────

impl<I> MotorPort for HardwareAdapter<I> {
    fn set_wheel(&mut self, wheel: usize, speed: i32) {
        self.motors.set_wheel(wheel, speed);
    }

    fn drive_all(&mut self, speeds: [i32; WHEEL_COUNT]) {
        self.motors.drive_all(speeds);
    }

    fn enable(&mut self) {
        self.motors.enable();
    }

    fn disable(&mut self) {
        self.motors.disable();
    }

    fn is_enabled(&self) -> bool {
        self.motors.is_enabled()
    }

    fn commands(&self) -> [i16; WHEEL_COUNT] {
        self.motors.commands()
    }
}

// ── ImuPort implementation ────────────────────────────────────

impl<I: ImuPort> ImuPort for HardwareAdapter<I> {
    fn read_sample(&mut self) -> Option<ImuSample> {
        self.imu.as_mut()?.read_sample()
    }

    fn read_raw(&mut self) -> Option<RawMotion> {
        self.imu.as_mut()?.read_raw()
    }
}

// ── SubsystemInit implementation ──────────────────────────────

impl<I: ImuPort> SubsystemInit for HardwareAdapter<I> {
    fn init(&mut self, target: Subsystem) -> Result<(), Error> {
        if matches!(target, Subsystem::System | Subsystem::Motors) {
            hw_init::init_motor_outputs()?;
            hw_init::init_encoders()?;
        }
        // A missing IMU degrades orientation reporting only.
        if matches!(target, Subsystem::System | Subsystem::Sensors) && self.imu.is_none() {
            warn!("Sensors: no IMU fitted, orientation unavailable");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::motors::driver::Drive;

    struct FixedImu;

    impl ImuPort for FixedImu {
        fn read_sample(&mut self) -> Option<ImuSample> {
            Some(ImuSample {
                yaw: 90.0,
                ..Default::default()
            })
        }

        fn read_raw(&mut self) -> Option<RawMotion> {
            None
        }
    }

    #[test]
    fn bank_follows_config_inversion() {
        let mut hw = HardwareAdapter::new(build_motor_bank(&ControllerConfig::default()), Some(FixedImu));
        hw.forward(120);
        assert!(hw.is_enabled());
        assert_eq!(hw.commands(), [120; WHEEL_COUNT]);
        assert_eq!(hw.motors().outputs()[1], Drive::Reverse(120));
        assert_eq!(hw.motors().outputs()[0], Drive::Forward(120));
    }

    #[test]
    fn imu_passthrough_and_absence() {
        let mut with = HardwareAdapter::new(build_motor_bank(&ControllerConfig::default()), Some(FixedImu));
        assert_eq!(with.read_sample().map(|s| s.yaw), Some(90.0));
        assert!(with.init(Subsystem::System).is_ok());

        let mut without = HardwareAdapter::new(build_motor_bank(&ControllerConfig::default()), None::<NoImu>);
        assert!(without.read_sample().is_none());
        assert!(without.init(Subsystem::Sensors).is_ok());
        assert!(without.read_raw().is_none());
    }
}
