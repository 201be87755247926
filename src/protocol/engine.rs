//! Command engine: serial bytes in, motor effects and reply lines out.
//!
//! ```text
//!  SerialPort ──▶ LineAccumulator ──▶ parse_line ──▶ dispatch ──▶ BoardPort
//!       ▲                                  │              │
//!       └──────────── reply line ◀─────────┴── reject ◀───┘
//! ```
//!
//! Only accepted commands refresh the command timestamp; a stream of
//! garbage does not keep the motors alive.

use log::{debug, info, warn};

use super::codec::{Line, LineAccumulator};
use super::command::{parse_line, token, Command, Motion, ParseError, Request, Subsystem, Wire};
use super::response::Response;
use crate::app::context::ControllerContext;
use crate::app::events::{publish, ControllerEvent};
use crate::app::ports::{BoardPort, CalibrationStore, EventSink, SerialPort};
use crate::sensors::calibration;

/// Upper bound on bytes consumed per communication task run, so a flooded
/// link cannot starve the rest of the loop.
pub const MAX_BYTES_PER_POLL: usize = 256;

/// What handling one line produced.
#[derive(Debug, Default, PartialEq)]
pub struct Outcome {
    pub reply: Option<Response>,
    pub event: Option<ControllerEvent>,
}

impl Outcome {
    fn reply(reply: Response) -> Self {
        Self {
            reply: Some(reply),
            event: None,
        }
    }

    fn silent() -> Self {
        Self::default()
    }
}

pub struct CommandEngine {
    lines: LineAccumulator,
    rejected: u32,
}

impl CommandEngine {
    pub fn new(max_line_len: usize) -> Self {
        Self {
            lines: LineAccumulator::new(max_line_len),
            rejected: 0,
        }
    }

    /// Communication task body: drain the link, handle every complete line.
    pub fn poll(
        &mut self,
        now_ms: u32,
        ctx: &mut ControllerContext,
        hw: &mut impl BoardPort,
        link: &mut impl SerialPort,
        store: &mut impl CalibrationStore,
        sink: &mut impl EventSink,
    ) {
        for _ in 0..MAX_BYTES_PER_POLL {
            let Some(byte) = link.read_byte() else {
                break;
            };
            let Some(line) = self.lines.feed(byte) else {
                continue;
            };
            let outcome = self.handle_line(&line, now_ms, ctx, hw, store);
            if let Some(reply) = outcome.reply {
                link.write_line(&reply.render());
            }
            if let Some(event) = outcome.event {
                publish(&event, ctx.debug_forwarding, sink, link);
            }
        }
    }

    /// Parse and act on one complete line.
    pub fn handle_line(
        &mut self,
        line: &Line,
        now_ms: u32,
        ctx: &mut ControllerContext,
        hw: &mut impl BoardPort,
        store: &mut impl CalibrationStore,
    ) -> Outcome {
        debug!("Protocol: <- {}", line);
        match parse_line(line) {
            Ok(request) => {
                ctx.last_command_ms = now_ms;
                dispatch(request, now_ms, ctx, hw, store)
            }
            Err(e) => {
                self.rejected = self.rejected.wrapping_add(1);
                reject(&e, line)
            }
        }
    }

    pub fn rejected_count(&self) -> u32 {
        self.rejected
    }

    /// Lines discarded for length.
    pub fn overflow_count(&self) -> u32 {
        self.lines.overflow_count()
    }
}

fn ack(wire: Wire, kind: &'static str) -> Response {
    match wire {
        Wire::Json => Response::Ack(kind),
        Wire::Plain => Response::PlainOk(kind),
    }
}


/// Apply an accepted request.  The enable mirror in `ctx` is refreshed
/// from the motor layer afterwards, whatever the command did.
pub fn dispatch(
    request: Request,
    now_ms: u32,
    ctx: &mut ControllerContext,
    hw: &mut impl BoardPort,
    store: &mut impl CalibrationStore,
) -> Outcome {
    let Request { command, wire } = request;
    let name = command.name();

    let outcome = match command {
        Command::Motor { speeds, enable } => {
            if enable {
                hw.drive_all(speeds);
            } else {
                hw.stop_all();
                hw.disable();
            }
            Outcome::reply(ack(wire, "MOTOR"))
        }
        Command::PwmAll(speeds) | Command::DriveAll(speeds) => {
            hw.drive_all(speeds);
            Outcome::reply(ack(wire, name))
        }
        Command::PwmSingle { wheel, value } => {
            hw.enable();
            hw.set_wheel(wheel, value);
            Outcome::reply(ack(wire, name))
        }
        Command::SetVelocity { left, right } => {
            hw.drive_all([left, right, left, right]);
            Outcome::reply(ack(wire, name))
        }
        Command::SetWheel { wheel, speed } => {
            hw.set_wheel(wheel, speed);
            Outcome::reply(ack(wire, name))
        }
        Command::Drive { motion, speed } => {
            match motion {
                Motion::Forward => hw.forward(speed),
                Motion::Backward => hw.backward(speed),
                Motion::Left => hw.turn_left(speed),
                Motion::Right => hw.turn_right(speed),
            }
            Outcome::reply(ack(wire, name))
        }
        Command::Stop => {
            hw.stop_all();
            Outcome::reply(ack(wire, name))
        }
        Command::Enable => {
            hw.enable();
            Outcome::reply(ack(wire, name))
        }
        Command::Disable => {
            hw.stop_all();
            hw.disable();
            Outcome::reply(ack(wire, name))
        }
        Command::Init(target) => {
            let ok = init_subsystem(target, ctx, hw, store);
            Outcome {
                reply: Some(ack(wire, name)),
                event: Some(ControllerEvent::SubsystemInit { target, ok }),
            }
        }
        Command::Status => {
            ctx.motors_enabled = hw.is_enabled();
            Outcome::reply(Response::Status(ctx.status_report(now_ms, ctx.free_memory)))
        }
        Command::Ping => Outcome::reply(Response::Pong),
        Command::Debug(on) => {
            ctx.debug_forwarding = on;
            info!("Protocol: debug forwarding {}", if on { "ON" } else { "OFF" });
            Outcome::reply(ack(wire, name))
        }
        Command::Mode(label) => {
            info!("Protocol: mode -> {}", label);
            ctx.mode = label;
            Outcome::reply(ack(wire, name))
        }
        Command::RequestOdometry => Outcome::reply(ack(wire, name)),
    };

    ctx.motors_enabled = hw.is_enabled();
    outcome
}

/// Reply (or not) to a line that failed to parse.
pub fn reject(error: &ParseError, line: &str) -> Outcome {
    match error {
        ParseError::Malformed => {
            warn!("Protocol: malformed line dropped: {}", line);
            Outcome::silent()
        }
        ParseError::UnknownTarget(target) => {
            warn!("Protocol: INIT with unknown target '{}'", target);
            Outcome::silent()
        }
        ParseError::UnknownCommand { name, wire } => {
            warn!("Protocol: unknown command '{}'", name);
            let code = crate::error::ProtocolError::UnknownCommand.code();
            Outcome::reply(match wire {
                Wire::Json => Response::Error {
                    cmd: name.clone(),
                    reason: code,
                },
                Wire::Plain => Response::PlainErr {
                    head: token(code),
                    tail: name.clone(),
                },
            })
        }
        ParseError::BadArgs { cmd, reason, wire } => {
            warn!("Protocol: {} rejected ({})", cmd, reason);
            Outcome::reply(match wire {
                Wire::Json => Response::Error {
                    cmd: token(cmd),
                    reason: reason.code(),
                },
                Wire::Plain => Response::PlainErr {
                    head: token(cmd),
                    tail: token("params"),
                },
            })
        }
    }
}

/// Re-run one subsystem initializer.
///
/// MOTORS (and SYSTEM) leave the drive train stopped and disabled; SENSORS
/// (and SYSTEM) reload or redo the IMU calibration.  Returns whether the
/// hardware hook succeeded; failures degrade, they never abort.
pub fn init_subsystem(
    target: Subsystem,
    ctx: &mut ControllerContext,
    hw: &mut impl BoardPort,
    store: &mut impl CalibrationStore,
) -> bool {
    let ok = match hw.init(target) {
        Ok(()) => true,
        Err(e) => {
            warn!("Protocol: INIT {:?} failed: {}", target, e);
            false
        }
    };

    if matches!(target, Subsystem::System | Subsystem::Motors) {
        hw.stop_all();
        hw.disable();
    }
    if matches!(target, Subsystem::System | Subsystem::Sensors) {
        ctx.calibration = calibration::load_or_calibrate(store, hw);
    }
    if target == Subsystem::System {
        ctx.ready = ok;
    }
    ctx.motors_enabled = hw.is_enabled();
    ok
}
