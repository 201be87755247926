//! Safety watchdog.
//!
//! Two jobs, both driven by the scheduler:
//!
//! 1. **Command timeout.**  If no command has been accepted for longer than
//!    `command_timeout_ms` while the motors are enabled, every wheel is
//!    zeroed and the standby line dropped.  The transition is one-way: only
//!    a later command re-enables drive.
//! 2. **Health report.**  Uptime, enable state and free memory, emitted on
//!    the watchdog period.  Never changes state.
//!
//! ```text
//!   silence > timeout && enabled ──▶ stop_all ──▶ disable ──▶ enabled = false
//! ```

use core::fmt;

use log::error;

use crate::app::context::ControllerContext;
use crate::app::ports::MotorPort;
use crate::config::ControllerConfig;

/// Periodic liveness snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthReport {
    pub uptime_s: u32,
    pub motors_enabled: bool,
    pub free_memory: u32,
}

impl fmt::Display for HealthReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "uptime={}s motors={} free={}B",
            self.uptime_s,
            if self.motors_enabled { "ON" } else { "OFF" },
            self.free_memory
        )
    }
}

/// Command-recency supervisor.
pub struct SafetyWatchdog {
    timeout_ms: u32,
    trips: u32,
}

impl SafetyWatchdog {
    pub fn new(config: &ControllerConfig) -> Self {
        Self {
            timeout_ms: config.command_timeout_ms,
            trips: 0,
        }
    }

    /// Force the safe state if the command stream went quiet.
    ///
    /// Returns `true` when this call tripped the timeout.  Strictly greater
    /// than: silence of exactly `timeout_ms` is still fresh.
    pub fn check_timeout(
        &mut self,
        now_ms: u32,
        ctx: &mut ControllerContext,
        motors: &mut impl MotorPort,
    ) -> bool {
        let silence = ctx.silence_ms(now_ms);
        if silence <= self.timeout_ms || !ctx.motors_enabled {
            return false;
        }

        motors.stop_all();
        motors.disable();
        ctx.motors_enabled = false;
        self.trips = self.trips.wrapping_add(1);
        error!(
            "Safety: no command for {} ms (limit {} ms), motors stopped",
            silence, self.timeout_ms
        );
        true
    }

    pub fn periodic_report(
        &self,
        now_ms: u32,
        ctx: &ControllerContext,
        free_memory: u32,
    ) -> HealthReport {
        HealthReport {
            uptime_s: ctx.uptime_secs(now_ms),
            motors_enabled: ctx.motors_enabled,
            free_memory,
        }
    }

    /// Number of timeouts since boot.
    pub fn trip_count(&self) -> u32 {
        self.trips
    }
}
