//! H-bridge channel drivers.
//!
//! Two driver families are mixed on the reference board:
//!
//! | Family   | Pins                    | Output gate            |
//! |----------|-------------------------|------------------------|
//! | TB6612   | PWM, IN1, IN2           | shared STBY line       |
//! | L298N    | EN (PWM), IN1, IN2      | none, emulated via EN  |
//!
//! Both implement [`HBridge`]; [`MotorDriver`] is the sum type selected
//! per wheel when the bank is built.  Pin writes go through
//! `embedded-hal` 1.0 traits.  A failed pin write is logged and ignored:
//! nothing at this layer can fail.

use embedded_hal::digital::OutputPin;
use embedded_hal::pwm::SetDutyCycle;
use log::warn;

/// Maximum duty magnitude (8-bit).
pub const MAX_DUTY: u8 = 255;

/// Physical drive request for one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Drive {
    /// IN1 high, IN2 low, duty as given.
    Forward(u8),
    /// IN1 low, IN2 high, duty as given.
    Reverse(u8),
    /// Both direction pins low, zero duty.
    Coast,
}

impl Drive {
    /// Map a clamped signed speed onto a drive request.
    pub fn from_speed(speed: i16) -> Self {
        let magnitude = speed.unsigned_abs().min(u16::from(MAX_DUTY)) as u8;
        match speed {
            s if s > 0 => Self::Forward(magnitude),
            s if s < 0 => Self::Reverse(magnitude),
            _ => Self::Coast,
        }
    }

    fn pins(self) -> (bool, bool, u8) {
        match self {
            Self::Forward(d) => (true, false, d),
            Self::Reverse(d) => (false, true, d),
            Self::Coast => (false, false, 0),
        }
    }
}

/// "Set direction and duty" capability shared by every driver family.
pub trait HBridge {
    fn apply(&mut self, drive: Drive);

    /// Follow the global enable line.  Families gated by STBY need nothing.
    fn set_gate(&mut self, _enabled: bool) {}
}

// ── Pin helpers ───────────────────────────────────────────────

pub(crate) fn write_pin<O: OutputPin>(pin: &mut O, high: bool) {
    let result = if high { pin.set_high() } else { pin.set_low() };
    if let Err(e) = result {
        warn!("Motor: pin write failed ({:?})", e);
    }
}

fn write_duty<P: SetDutyCycle>(pwm: &mut P, duty: u8) {
    if let Err(e) = pwm.set_duty_cycle_fraction(u16::from(duty), u16::from(MAX_DUTY)) {
        warn!("Motor: duty write failed ({:?})", e);
    }
}

// ── TB6612 ────────────────────────────────────────────────────

pub struct Tb6612Channel<O, P> {
    pwm: P,
    in1: O,
    in2: O,
}

impl<O: OutputPin, P: SetDutyCycle> Tb6612Channel<O, P> {
    pub fn new(pwm: P, in1: O, in2: O) -> Self {
        Self { pwm, in1, in2 }
    }
}

impl<O: OutputPin, P: SetDutyCycle> HBridge for Tb6612Channel<O, P> {
    fn apply(&mut self, drive: Drive) {
        let (in1, in2, duty) = drive.pins();
        write_pin(&mut self.in1, in1);
        write_pin(&mut self.in2, in2);
        write_duty(&mut self.pwm, duty);
    }
}

// ── L298N ─────────────────────────────────────────────────────

/// L298N channel.  With no standby pin, a low global enable is emulated
/// by holding EN at zero; the last commanded duty comes back on re-enable.
pub struct L298nChannel<O, P> {
    en: P,
    in1: O,
    in2: O,
    gated: bool,
    duty: u8,
}

impl<O: OutputPin, P: SetDutyCycle> L298nChannel<O, P> {
    /// Starts gated, matching a bank whose STBY line is still low.
    pub fn new(en: P, in1: O, in2: O) -> Self {
        Self {
            en,
            in1,
            in2,
            gated: true,
            duty: 0,
        }
    }
}

impl<O: OutputPin, P: SetDutyCycle> HBridge for L298nChannel<O, P> {
    fn apply(&mut self, drive: Drive) {
        let (in1, in2, duty) = drive.pins();
        write_pin(&mut self.in1, in1);
        write_pin(&mut self.in2, in2);
        self.duty = duty;
        write_duty(&mut self.en, if self.gated { 0 } else { duty });
    }

    fn set_gate(&mut self, enabled: bool) {
        self.gated = !enabled;
        write_duty(&mut self.en, if enabled { self.duty } else { 0 });
    }
}

// ── Sum type ──────────────────────────────────────────────────

/// Driver family chosen per wheel at construction.
pub enum MotorDriver<O, P> {
    Tb6612(Tb6612Channel<O, P>),
    L298n(L298nChannel<O, P>),
}

impl<O: OutputPin, P: SetDutyCycle> HBridge for MotorDriver<O, P> {
    fn apply(&mut self, drive: Drive) {
        match self {
            Self::Tb6612(ch) => ch.apply(drive),
            Self::L298n(ch) => ch.apply(drive),
        }
    }

    fn set_gate(&mut self, enabled: bool) {
        match self {
            Self::Tb6612(ch) => ch.set_gate(enabled),
            Self::L298n(ch) => ch.set_gate(enabled),
        }
    }
}
