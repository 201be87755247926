//! Controller context: the one owned bag of mutable controller state.
//!
//! Every task receives `&mut ControllerContext`; nothing here is global.
//! The encoder bank is the only state shared with interrupt context and
//! lives outside (see [`crate::sensors::encoder`]).

use crate::config::ControllerConfig;
use crate::protocol::command::ModeLabel;
use crate::protocol::response::StatusReport;
use crate::sensors::calibration::CalibrationRecord;
use crate::sensors::ImuSample;

/// Mode reported in STATUS until the operator sends `MODE`.
pub const DEFAULT_MODE: &str = "manual";

pub struct ControllerContext {
    pub config: ControllerConfig,
    /// Mirror of the motor layer's standby line, refreshed after every
    /// dispatch and every forced stop.
    pub motors_enabled: bool,
    /// Time of the last successfully parsed command (ms).
    pub last_command_ms: u32,
    pub boot_ms: u32,
    /// Set once `INIT SYSTEM` (or boot) completed.
    pub ready: bool,
    /// Forward controller events upstream as DEBUG lines.
    pub debug_forwarding: bool,
    pub mode: ModeLabel,
    /// Most recent IMU sample, if the collaborator has produced one.
    pub imu: Option<ImuSample>,
    pub calibration: CalibrationRecord,
    /// Free-heap estimate, refreshed once per loop iteration.
    pub free_memory: u32,
}

impl ControllerContext {
    pub fn new(config: ControllerConfig, now_ms: u32) -> Self {
        let mut mode = ModeLabel::new();
        let _ = mode.push_str(DEFAULT_MODE);
        Self {
            config,
            motors_enabled: false,
            last_command_ms: now_ms,
            boot_ms: now_ms,
            ready: false,
            debug_forwarding: false,
            mode,
            imu: None,
            calibration: CalibrationRecord::default(),
            free_memory: 0,
        }
    }

    /// Whole seconds since boot (wraparound-safe).
    pub fn uptime_secs(&self, now_ms: u32) -> u32 {
        now_ms.wrapping_sub(self.boot_ms) / 1000
    }

    /// Milliseconds since the last accepted command.
    pub fn silence_ms(&self, now_ms: u32) -> u32 {
        now_ms.wrapping_sub(self.last_command_ms)
    }

    pub fn status_report(&self, now_ms: u32, free_memory: u32) -> StatusReport {
        StatusReport {
            uptime: self.uptime_secs(now_ms),
            motors: u8::from(self.motors_enabled),
            system: if self.ready { "ready" } else { "init" },
            ram: free_memory,
            mode: self.mode.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_context_is_safe() {
        let ctx = ControllerContext::new(ControllerConfig::default(), 100);
        assert!(!ctx.motors_enabled);
        assert!(!ctx.ready);
        assert_eq!(ctx.mode.as_str(), DEFAULT_MODE);
        assert!(ctx.imu.is_none());
    }

    #[test]
    fn uptime_counts_from_boot_across_wrap() {
        let ctx = ControllerContext::new(ControllerConfig::default(), u32::MAX - 499);
        assert_eq!(ctx.uptime_secs(2_500), 3);
        assert_eq!(ctx.silence_ms(0), 500);
    }

    #[test]
    fn status_report_reflects_flags() {
        let mut ctx = ControllerContext::new(ControllerConfig::default(), 0);
        let r = ctx.status_report(12_345, 4096);
        assert_eq!((r.uptime, r.motors, r.system, r.ram), (12, 0, "init", 4096));

        ctx.ready = true;
        ctx.motors_enabled = true;
        let r = ctx.status_report(12_345, 4096);
        assert_eq!((r.motors, r.system), (1, "ready"));
    }
}
