//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing controller events to the ESP-IDF
//! logger (which goes to the USB-CDC console in production).  Upstream
//! DEBUG forwarding is handled by the service, not here.

use log::{error, info, warn};

use crate::app::events::ControllerEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`ControllerEvent`] to the console.
#[derive(Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &ControllerEvent) {
        match event {
            ControllerEvent::CommandTimeout { .. } => error!("{}", event),
            ControllerEvent::SubsystemInit { ok: false, .. } => warn!("{}", event),
            ControllerEvent::Started { .. }
            | ControllerEvent::Health(_)
            | ControllerEvent::SubsystemInit { .. } => info!("{}", event),
        }
    }
}
