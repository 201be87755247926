//! Outbound controller events.
//!
//! The [`ControllerService`](super::service::ControllerService) emits these
//! through the [`EventSink`](super::ports::EventSink) port.  Adapters on the
//! other side decide what to do with them; the stock one logs them.  When
//! debug forwarding is on, the service also writes the `Display` form
//! upstream as a DEBUG line.

use core::fmt;

use super::ports::{EventSink, SerialPort};
use crate::protocol::command::Subsystem;
use crate::protocol::response::Response;
use crate::safety::HealthReport;

/// Structured events emitted by the controller core.
#[derive(Debug, Clone, PartialEq)]
pub enum ControllerEvent {
    /// Boot sequence finished.
    Started { ready: bool },

    /// The command stream went quiet and the motors were forced off.
    CommandTimeout { silence_ms: u32 },

    /// Periodic health snapshot.
    Health(HealthReport),

    /// An `INIT` command (or the boot path) re-ran a subsystem initializer.
    SubsystemInit { target: Subsystem, ok: bool },
}

impl fmt::Display for ControllerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Started { ready } => {
                write!(f, "START | system={}", if *ready { "ready" } else { "init" })
            }
            Self::CommandTimeout { silence_ms } => {
                write!(f, "TIMEOUT | silent {} ms, motors stopped", silence_ms)
            }
            Self::Health(report) => write!(f, "HEALTH | {}", report),
            Self::SubsystemInit { target, ok } => write!(
                f,
                "INIT | {:?} {}",
                target,
                if *ok { "ok" } else { "failed" }
            ),
        }
    }
}

/// Hand `event` to the sink and, with debug forwarding on, mirror it
/// upstream as a DEBUG line.
pub fn publish(
    event: &ControllerEvent,
    forward: bool,
    sink: &mut impl EventSink,
    link: &mut impl SerialPort,
) {
    sink.emit(event);
    if forward {
        link.write_line(&Response::debug(&event.to_string()).render());
    }
}
