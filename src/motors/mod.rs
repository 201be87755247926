//! Motor abstraction layer.
//!
//! [`MotorBank`] maps logical per-wheel speeds onto four mixed-family
//! H-bridge channels plus the shared STBY line.  It implements
//! [`MotorPort`], which is all the rest of the firmware sees.
//!
//! Speed pipeline for one wheel:
//!
//! ```text
//!   i32 ──clamp──▶ [-255, 255] ──inversion──▶ Drive ──▶ MotorDriver
//! ```

pub mod driver;

use embedded_hal::digital::OutputPin;
use embedded_hal::pwm::SetDutyCycle;
use log::debug;

use crate::app::ports::MotorPort;
use driver::{write_pin, Drive, HBridge, MotorDriver};

/// Number of driven wheels.
pub const WHEEL_COUNT: usize = 4;

/// Largest accepted speed magnitude.
pub const MAX_SPEED: i32 = 255;

/// Clamp a requested speed into `[-255, 255]`.
pub fn clamp_speed(speed: i32) -> i16 {
    speed.clamp(-MAX_SPEED, MAX_SPEED) as i16
}

/// Four wheels, one standby line, and the per-wheel inversion policy.
pub struct MotorBank<O, P> {
    wheels: [MotorDriver<O, P>; WHEEL_COUNT],
    standby: O,
    inverted: [bool; WHEEL_COUNT],
    enabled: bool,
    commands: [i16; WHEEL_COUNT],
    outputs: [Drive; WHEEL_COUNT],
}

impl<O: OutputPin, P: SetDutyCycle> MotorBank<O, P> {
    /// Build the bank with STBY low and every wheel coasting.
    pub fn new(
        wheels: [MotorDriver<O, P>; WHEEL_COUNT],
        standby: O,
        inverted: [bool; WHEEL_COUNT],
    ) -> Self {
        let mut bank = Self {
            wheels,
            standby,
            inverted,
            enabled: false,
            commands: [0; WHEEL_COUNT],
            outputs: [Drive::Coast; WHEEL_COUNT],
        };
        write_pin(&mut bank.standby, false);
        for wheel in &mut bank.wheels {
            wheel.apply(Drive::Coast);
        }
        bank
    }

    /// Last physical drive per wheel (after inversion).
    pub fn outputs(&self) -> [Drive; WHEEL_COUNT] {
        self.outputs
    }

    fn set_standby(&mut self, high: bool) {
        write_pin(&mut self.standby, high);
        for wheel in &mut self.wheels {
            wheel.set_gate(high);
        }
        self.enabled = high;
    }
}

impl<O: OutputPin, P: SetDutyCycle> MotorPort for MotorBank<O, P> {
    fn set_wheel(&mut self, wheel: usize, speed: i32) {
        if wheel >= WHEEL_COUNT {
            return;
        }
        let logical = clamp_speed(speed);
        let physical = if self.inverted[wheel] { -logical } else { logical };
        let drive = Drive::from_speed(physical);

        self.wheels[wheel].apply(drive);
        self.commands[wheel] = logical;
        self.outputs[wheel] = drive;
    }

    fn drive_all(&mut self, speeds: [i32; WHEEL_COUNT]) {
        // A previous disable must never silently persist.
        self.set_standby(true);
        for (wheel, speed) in speeds.into_iter().enumerate() {
            self.set_wheel(wheel, speed);
        }
        debug!("Motor: drive_all {:?}", self.commands);
    }

    fn enable(&mut self) {
        self.set_standby(true);
    }

    fn disable(&mut self) {
        self.set_standby(false);
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn commands(&self) -> [i16; WHEEL_COUNT] {
        self.commands
    }
}

#[cfg(test)]
mod tests {
    use super::driver::{L298nChannel, Tb6612Channel};
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Shared view of every pin level and duty register.
    #[derive(Default)]
    struct Board {
        levels: std::collections::HashMap<&'static str, bool>,
        duties: std::collections::HashMap<&'static str, u16>,
    }

    type Shared = Rc<RefCell<Board>>;

    struct Pin(&'static str, Shared);
    struct Pwm(&'static str, Shared);

    impl embedded_hal::digital::ErrorType for Pin {
        type Error = core::convert::Infallible;
    }

    impl OutputPin for Pin {
        fn set_low(&mut self) -> Result<(), Self::Error> {
            self.1.borrow_mut().levels.insert(self.0, false);
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Self::Error> {
            self.1.borrow_mut().levels.insert(self.0, true);
            Ok(())
        }
    }

    impl embedded_hal::pwm::ErrorType for Pwm {
        type Error = core::convert::Infallible;
    }

    impl SetDutyCycle for Pwm {
        fn max_duty_cycle(&self) -> u16 {
            255
        }

        fn set_duty_cycle(&mut self, duty: u16) -> Result<(), Self::Error> {
            self.1.borrow_mut().duties.insert(self.0, duty);
            Ok(())
        }
    }

    fn bank(inverted: [bool; WHEEL_COUNT]) -> (MotorBank<Pin, Pwm>, Shared) {
        let b: Shared = Rc::default();
        let tb = |pwm, a, c| {
            MotorDriver::Tb6612(Tb6612Channel::new(
                Pwm(pwm, b.clone()),
                Pin(a, b.clone()),
                Pin(c, b.clone()),
            ))
        };
        let l2 = |en, a, c| {
            MotorDriver::L298n(L298nChannel::new(
                Pwm(en, b.clone()),
                Pin(a, b.clone()),
                Pin(c, b.clone()),
            ))
        };
        let wheels = [
            tb("pwm1", "m1a", "m1b"),
            tb("pwm2", "m2a", "m2b"),
            l2("en3", "m3a", "m3b"),
            l2("en4", "m4a", "m4b"),
        ];
        let bank = MotorBank::new(wheels, Pin("stby", b.clone()), inverted);
        (bank, b)
    }

    #[test]
    fn clamp_law() {
        assert_eq!(clamp_speed(400), 255);
        assert_eq!(clamp_speed(-1000), -255);
        assert_eq!(clamp_speed(-17), -17);
    }

    #[test]
    fn starts_disabled_and_coasting() {
        let (m, b) = bank([false; 4]);
        assert!(!m.is_enabled());
        assert!(!b.borrow().levels["stby"]);
        assert_eq!(m.outputs(), [Drive::Coast; 4]);
    }

    #[test]
    fn drive_all_reasserts_standby() {
        let (mut m, b) = bank([false; 4]);
        m.enable();
        m.disable();
        assert!(!m.is_enabled());

        m.drive_all([10, 20, 30, 40]);
        assert!(m.is_enabled());
        let board = b.borrow();
        assert!(board.levels["stby"]);
        assert_eq!(board.duties["pwm1"], 10);
        assert_eq!(board.duties["en4"], 40);
    }

    #[test]
    fn inversion_flips_physical_not_logical() {
        let (mut m, b) = bank([false, true, false, true]);
        m.forward(100);
        assert_eq!(m.commands(), [100; 4]);
        assert_eq!(
            m.outputs(),
            [
                Drive::Forward(100),
                Drive::Reverse(100),
                Drive::Forward(100),
                Drive::Reverse(100),
            ]
        );
        let board = b.borrow();
        assert!(board.levels["m1a"] && !board.levels["m1b"]);
        assert!(!board.levels["m2a"] && board.levels["m2b"]);
    }

    #[test]
    fn set_wheel_clamps_and_preserves_sign() {
        let (mut m, _) = bank([false; 4]);
        m.set_wheel(0, 999);
        m.set_wheel(2, -999);
        assert_eq!(m.commands(), [255, 0, -255, 0]);
        assert_eq!(m.outputs()[0], Drive::Forward(255));
        assert_eq!(m.outputs()[2], Drive::Reverse(255));
    }

    #[test]
    fn out_of_range_wheel_ignored() {
        let (mut m, _) = bank([false; 4]);
        m.set_wheel(4, 100);
        assert_eq!(m.commands(), [0; 4]);
    }

    #[test]
    fn disable_keeps_wheel_commands() {
        let (mut m, b) = bank([false; 4]);
        m.drive_all([50, 50, 50, 50]);
        m.disable();
        assert_eq!(m.commands(), [50; 4]);
        let board = b.borrow();
        assert!(!board.levels["stby"]);
        // L298N wheels have no STBY; EN is held low instead.
        assert_eq!(board.duties["en3"], 0);
        assert_eq!(board.duties["pwm1"], 50);
    }

    #[test]
    fn turn_shorthands() {
        let (mut m, _) = bank([false; 4]);
        m.turn_left(80);
        assert_eq!(m.commands(), [-80, 80, -80, 80]);
        m.turn_right(80);
        assert_eq!(m.commands(), [80, -80, 80, -80]);
        m.backward(60);
        assert_eq!(m.commands(), [-60; 4]);
        m.stop_all();
        assert_eq!(m.commands(), [0; 4]);
        assert_eq!(m.outputs(), [Drive::Coast; 4]);
    }
}
