//! Controller service: the hexagonal core.
//!
//! [`ControllerService`] owns the context, scheduler, command engine,
//! odometry engine and safety watchdog.  All I/O flows through port traits
//! injected at call sites, so the whole loop runs on the host against mock
//! adapters.
//!
//! ```text
//!  SerialPort ──▶ ┌──────────────────────────────┐ ──▶ SerialPort (replies)
//!                 │      ControllerService       │
//!  SystemPort ──▶ │ Scheduler · Engine · Safety  │ ──▶ EventSink
//!                 │ Odometry                     │
//!  BoardPort  ◀──▶└──────────────────────────────┘ ◀──▶ CalibrationStore
//! ```

use log::info;

use crate::config::ControllerConfig;
use crate::odometry::OdometryEngine;
use crate::protocol::command::Subsystem;
use crate::protocol::engine::{self, CommandEngine};
use crate::protocol::response::Response;
use crate::safety::SafetyWatchdog;
use crate::scheduler::{Scheduler, TaskId};
use crate::sensors::encoder::EncoderBank;

use super::context::ControllerContext;
use super::events::{publish, ControllerEvent};
use super::ports::{BoardPort, CalibrationStore, EventSink, SerialPort, SystemPort};

// ───────────────────────────────────────────────────────────────
// ControllerService
// ───────────────────────────────────────────────────────────────

pub struct ControllerService {
    ctx: ControllerContext,
    scheduler: Scheduler,
    engine: CommandEngine,
    odometry: OdometryEngine,
    safety: SafetyWatchdog,
    encoders: &'static EncoderBank,
}

impl ControllerService {
    /// Build every component from `config`.  Call [`boot`](Self::boot) next.
    pub fn new(config: ControllerConfig, encoders: &'static EncoderBank, now_ms: u32) -> Self {
        let scheduler = Scheduler::new(&config, now_ms);
        let engine = CommandEngine::new(config.max_line_len);
        let odometry = OdometryEngine::new(&config, now_ms);
        let safety = SafetyWatchdog::new(&config);
        Self {
            ctx: ControllerContext::new(config, now_ms),
            scheduler,
            engine,
            odometry,
            safety,
            encoders,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Boot sequence: full SYSTEM initialisation, motors left stopped and
    /// disabled, calibration loaded (or redone).
    pub fn boot(
        &mut self,
        now_ms: u32,
        hw: &mut impl BoardPort,
        store: &mut impl CalibrationStore,
        sink: &mut impl EventSink,
    ) {
        let ok = engine::init_subsystem(Subsystem::System, &mut self.ctx, hw, store);
        // Boot counts as the first command so the watchdog starts fresh.
        self.ctx.last_command_ms = now_ms;
        sink.emit(&ControllerEvent::SubsystemInit {
            target: Subsystem::System,
            ok,
        });
        sink.emit(&ControllerEvent::Started {
            ready: self.ctx.ready,
        });
        info!("Controller: boot complete (ready={})", self.ctx.ready);
    }

    // ── Per-iteration orchestration ───────────────────────────

    /// One pass of the control loop: read the clock once, run every due
    /// task in priority order.
    pub fn run_once(
        &mut self,
        sys: &impl SystemPort,
        hw: &mut impl BoardPort,
        link: &mut impl SerialPort,
        store: &mut impl CalibrationStore,
        sink: &mut impl EventSink,
    ) {
        let now = sys.now_ms();

        let due = self.scheduler.due(now);
        if due.is_empty() {
            return;
        }
        self.ctx.free_memory = sys.free_memory();

        for task in due {
            match task {
                TaskId::Comm => {
                    self.engine
                        .poll(now, &mut self.ctx, hw, link, store, sink);
                }
                TaskId::Motor => self.check_timeout(now, hw, link, sink),
                TaskId::Sensors => {
                    if let Some(sample) = hw.read_sample() {
                        self.ctx.imu = Some(sample);
                    }
                }
                TaskId::Odometry => {
                    if let Some(delta) = self.odometry.poll(now, self.encoders) {
                        link.write_line(&Response::Odometry(delta).render());
                    }
                }
                TaskId::Status => {
                    self.ctx.motors_enabled = hw.is_enabled();
                    let report = self.ctx.status_report(now, self.ctx.free_memory);
                    link.write_line(&Response::Status(report).render());
                }
                TaskId::Watchdog => {
                    self.check_timeout(now, hw, link, sink);
                    let report = self
                        .safety
                        .periodic_report(now, &self.ctx, self.ctx.free_memory);
                    publish(
                        &ControllerEvent::Health(report),
                        self.ctx.debug_forwarding,
                        sink,
                        link,
                    );
                }
            }
        }
    }

    fn check_timeout(
        &mut self,
        now: u32,
        hw: &mut impl BoardPort,
        link: &mut impl SerialPort,
        sink: &mut impl EventSink,
    ) {
        let silence_ms = self.ctx.silence_ms(now);
        if self.safety.check_timeout(now, &mut self.ctx, hw) {
            publish(
                &ControllerEvent::CommandTimeout { silence_ms },
                self.ctx.debug_forwarding,
                sink,
                link,
            );
        }
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn context(&self) -> &ControllerContext {
        &self.ctx
    }

    pub fn engine(&self) -> &CommandEngine {
        &self.engine
    }

    /// Number of command timeouts since boot.
    pub fn timeout_count(&self) -> u32 {
        self.safety.trip_count()
    }
}
