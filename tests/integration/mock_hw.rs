//! Mock adapters for integration tests.
//!
//! Records every motor call so tests can assert on the full command
//! history without touching real GPIO/PWM registers.

use std::cell::Cell;
use std::collections::VecDeque;

use motionboard::app::events::ControllerEvent;
use motionboard::app::ports::{
    CalibrationStore, EventSink, ImuPort, MotorPort, SerialPort, StorageError, SubsystemInit,
    SystemPort,
};
use motionboard::error::Error;
use motionboard::motors::{clamp_speed, WHEEL_COUNT};
use motionboard::protocol::command::Subsystem;
use motionboard::sensors::calibration::CalibrationRecord;
use motionboard::sensors::{ImuSample, RawMotion};

// ── Motor call record ─────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum MotorCall {
    SetWheel { wheel: usize, speed: i32 },
    DriveAll([i32; WHEEL_COUNT]),
    Enable,
    Disable,
}

// ── MockBoard ─────────────────────────────────────────────────

pub struct MockBoard {
    pub calls: Vec<MotorCall>,
    pub inits: Vec<Subsystem>,
    pub sample: Option<ImuSample>,
    pub raw: Option<RawMotion>,
    enabled: bool,
    commands: [i16; WHEEL_COUNT],
}

#[allow(dead_code)]
impl MockBoard {
    pub fn new() -> Self {
        Self {
            calls: Vec::new(),
            inits: Vec::new(),
            sample: None,
            raw: Some(RawMotion {
                accel: [0, 0, 16384],
                gyro: [0, 0, 0],
            }),
            enabled: false,
            commands: [0; WHEEL_COUNT],
        }
    }

    pub fn last_call(&self) -> Option<&MotorCall> {
        self.calls.last()
    }

    /// True when every wheel is commanded to zero.
    pub fn all_stopped(&self) -> bool {
        self.commands.iter().all(|c| *c == 0)
    }
}

impl MotorPort for MockBoard {
    fn set_wheel(&mut self, wheel: usize, speed: i32) {
        self.calls.push(MotorCall::SetWheel { wheel, speed });
        if wheel < WHEEL_COUNT {
            self.commands[wheel] = clamp_speed(speed);
        }
    }

    fn drive_all(&mut self, speeds: [i32; WHEEL_COUNT]) {
        self.calls.push(MotorCall::DriveAll(speeds));
        self.enabled = true;
        for (w, s) in speeds.into_iter().enumerate() {
            self.commands[w] = clamp_speed(s);
        }
    }

    fn enable(&mut self) {
        self.calls.push(MotorCall::Enable);
        self.enabled = true;
    }

    fn disable(&mut self) {
        self.calls.push(MotorCall::Disable);
        self.enabled = false;
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn commands(&self) -> [i16; WHEEL_COUNT] {
        self.commands
    }
}

impl ImuPort for MockBoard {
    fn read_sample(&mut self) -> Option<ImuSample> {
        self.sample
    }

    fn read_raw(&mut self) -> Option<RawMotion> {
        self.raw
    }
}

impl SubsystemInit for MockBoard {
    fn init(&mut self, target: Subsystem) -> Result<(), Error> {
        self.inits.push(target);
        Ok(())
    }
}

// ── MockLink ──────────────────────────────────────────────────

#[derive(Default)]
pub struct MockLink {
    pub rx: VecDeque<u8>,
    pub tx: Vec<String>,
}

#[allow(dead_code)]
impl MockLink {
    pub fn send(&mut self, text: &str) {
        self.rx.extend(text.bytes());
    }

    pub fn take(&mut self) -> Vec<String> {
        std::mem::take(&mut self.tx)
    }
}

impl SerialPort for MockLink {
    fn read_byte(&mut self) -> Option<u8> {
        self.rx.pop_front()
    }

    fn write_line(&mut self, line: &str) {
        self.tx.push(line.to_string());
    }
}

// ── MockClock ─────────────────────────────────────────────────

pub struct MockClock {
    now: Cell<u32>,
    pub free: u32,
}

#[allow(dead_code)]
impl MockClock {
    pub fn new() -> Self {
        Self {
            now: Cell::new(0),
            free: 150_000,
        }
    }

    pub fn set(&self, ms: u32) {
        self.now.set(ms);
    }
}

impl SystemPort for MockClock {
    fn now_ms(&self) -> u32 {
        self.now.get()
    }

    fn free_memory(&self) -> u32 {
        self.free
    }
}

// ── MemStore ──────────────────────────────────────────────────

#[derive(Default)]
pub struct MemStore {
    pub record: Option<CalibrationRecord>,
    pub saves: u32,
}

impl CalibrationStore for MemStore {
    fn load_calibration(&self) -> Result<CalibrationRecord, StorageError> {
        self.record.ok_or(StorageError::NotFound)
    }

    fn save_calibration(&mut self, record: &CalibrationRecord) -> Result<(), StorageError> {
        self.record = Some(*record);
        self.saves += 1;
        Ok(())
    }
}

// ── RecordingSink ─────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<ControllerEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn timeouts(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, ControllerEvent::CommandTimeout { .. }))
            .count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &ControllerEvent) {
        self.events.push(event.clone());
    }
}
