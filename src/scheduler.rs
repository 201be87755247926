//! Cooperative fixed-period scheduler.
//!
//! One clock read per loop iteration; each task runs when
//! `now - last_run >= period` (wrapping `u32` subtraction, so the 49-day
//! millisecond rollover is harmless).  Tasks are held in priority order and
//! [`Scheduler::due`] yields them in that order, so a slow task delays
//! every lower-priority task in the same iteration but never a higher one.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  priority   task       default period                        │
//! │  ────────   ────────   ──────────────                        │
//! │     0       Comm          10 ms   serial → parse → dispatch  │
//! │     1       Motor         20 ms   command-timeout check      │
//! │     2       Sensors       50 ms   IMU poll                   │
//! │     3       Odometry      25 ms   encoder drain (if due)     │
//! │     4       Status      1000 ms   STATUS line                │
//! │     5       Watchdog    5000 ms   timeout check + health     │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! No task blocks and nothing is preempted; a task never runs early.

use log::info;

use crate::config::ControllerConfig;

/// Scheduled tasks, highest priority first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskId {
    Comm,
    Motor,
    Sensors,
    Odometry,
    Status,
    Watchdog,
}

/// Number of task slots.
pub const TASK_COUNT: usize = 6;

/// Task ids due in one iteration, in priority order.
pub type DueTasks = heapless::Vec<TaskId, TASK_COUNT>;

#[derive(Debug, Clone, Copy)]
struct Slot {
    id: TaskId,
    period_ms: u32,
    last_run_ms: u32,
}

pub struct Scheduler {
    slots: [Slot; TASK_COUNT],
}

impl Scheduler {
    /// Build the task table from config.  Every task's period starts at
    /// `now_ms`, so nothing fires on the very first iteration.
    pub fn new(config: &ControllerConfig, now_ms: u32) -> Self {
        let slot = |id, period_ms| Slot {
            id,
            period_ms,
            last_run_ms: now_ms,
        };
        let slots = [
            slot(TaskId::Comm, config.comm_period_ms),
            slot(TaskId::Motor, config.motor_period_ms),
            slot(TaskId::Sensors, config.sensor_period_ms),
            slot(TaskId::Odometry, config.odometry_check_ms),
            slot(TaskId::Status, config.status_period_ms),
            slot(TaskId::Watchdog, config.watchdog_period_ms),
        ];
        for s in &slots {
            info!("Scheduler: {:?} every {} ms", s.id, s.period_ms);
        }
        Self { slots }
    }

    /// Collect every task due at `now_ms` and mark it run.
    pub fn due(&mut self, now_ms: u32) -> DueTasks {
        let mut out = DueTasks::new();
        for slot in &mut self.slots {
            if now_ms.wrapping_sub(slot.last_run_ms) >= slot.period_ms {
                slot.last_run_ms = now_ms;
                // Capacity equals the slot count.
                let _ = out.push(slot.id);
            }
        }
        out
    }
}
