//! Bridge-side robot status model.
//!
//! The network bridge forwards operator commands verbatim and folds every
//! line the motion board sends back into a small status record, served to
//! the web UI as JSON:
//!
//! ```text
//! {"connected":true,"last_response":81234,"motors_enabled":true,
//!  "current_speed":150,"odometry":"{\"resp\":\"ODOM\",...}","uptime":81240}
//! ```
//!
//! This module is the pure bookkeeping half of that bridge; the HTTP
//! server and the serial plumbing live with the bridge firmware.

use log::{debug, info, warn};
use serde::Serialize;

use crate::protocol::codec::LineAccumulator;
use crate::protocol::command::DEFAULT_SPEED;

/// No response for this long marks the robot disconnected.
pub const LINK_TIMEOUT_MS: u32 = 5000;

/// Cadence of the bridge's own `REQ_ODOM` polls.
pub const ODOM_REQUEST_INTERVAL_MS: u32 = 500;

/// Status document served at `/status`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BridgeSnapshot {
    pub connected: bool,
    pub last_response: u32,
    pub motors_enabled: bool,
    pub current_speed: i32,
    pub odometry: String,
    pub uptime: u32,
}

pub struct BridgeStatus {
    connected: bool,
    last_response_ms: u32,
    last_odometry: String,
    motors_enabled: bool,
    current_speed: i32,
    last_odom_request_ms: u32,
    rx: LineAccumulator,
}

impl BridgeStatus {
    pub fn new() -> Self {
        Self {
            connected: false,
            last_response_ms: 0,
            last_odometry: String::new(),
            // Assumed on until the robot says otherwise.
            motors_enabled: true,
            current_speed: DEFAULT_SPEED,
            last_odom_request_ms: 0,
            rx: LineAccumulator::default(),
        }
    }

    /// Record a command the bridge is about to forward.  Only the speed
    /// estimate is tracked locally; enable state comes from the robot.
    pub fn on_command_forwarded(&mut self, command: &str) {
        let command = command.trim();
        if command == "STOP" {
            self.current_speed = 0;
        } else if ["FWD", "BACK", "LEFT", "RIGHT"]
            .iter()
            .any(|m| command.starts_with(m))
        {
            if let Some((_, arg)) = command.split_once(' ') {
                // Unparsable text reads as 0, like the bridge UI expects.
                self.current_speed = arg.trim().parse().unwrap_or(0);
            }
        }
        debug!("Bridge: -> {}", command);
    }

    /// Feed raw bytes from the robot link.
    pub fn on_bytes(&mut self, bytes: &[u8], now_ms: u32) {
        for b in bytes {
            if let Some(line) = self.rx.feed(*b) {
                self.on_response_line(&line, now_ms);
            }
        }
    }

    /// Fold one complete response line into the status record.
    pub fn on_response_line(&mut self, line: &str, now_ms: u32) {
        self.last_response_ms = now_ms;
        if !self.connected {
            info!("Bridge: robot connected");
        }
        self.connected = true;

        if line.starts_with("ODOM") || line.contains("\"resp\":\"ODOM\"") {
            self.last_odometry.clear();
            self.last_odometry.push_str(line);
        } else if line.starts_with("OK") {
            if line.contains("DISABLE") {
                self.motors_enabled = false;
            } else if line.contains("ENABLE") {
                self.motors_enabled = true;
            }
        } else if line.starts_with("ERR") {
            warn!("Bridge: robot error: {}", line);
        } else if line.starts_with('{') {
            self.on_structured(line);
        }
    }

    fn on_structured(&mut self, line: &str) {
        let Ok(value) = serde_json::from_str::<serde_json::Value>(line) else {
            return;
        };
        match value.get("resp").and_then(|v| v.as_str()) {
            Some("ACK") => match value.get("type").and_then(|v| v.as_str()) {
                Some("ENABLE") => self.motors_enabled = true,
                Some("DISABLE") => self.motors_enabled = false,
                _ => {}
            },
            Some("STATUS") => {
                if let Some(m) = value.get("motors").and_then(|v| v.as_u64()) {
                    self.motors_enabled = m != 0;
                }
            }
            Some("ERROR") => warn!("Bridge: robot error: {}", line),
            _ => {}
        }
    }

    /// Connection housekeeping.  Returns `true` when a `REQ_ODOM` poll is due
    /// (the caller forwards it).
    pub fn tick(&mut self, now_ms: u32) -> bool {
        if self.connected && now_ms.wrapping_sub(self.last_response_ms) > LINK_TIMEOUT_MS {
            self.connected = false;
            warn!("Bridge: robot connection lost");
        }
        self.odometry_request_due(now_ms)
    }

    fn odometry_request_due(&mut self, now_ms: u32) -> bool {
        if now_ms.wrapping_sub(self.last_odom_request_ms) > ODOM_REQUEST_INTERVAL_MS {
            self.last_odom_request_ms = now_ms;
            true
        } else {
            false
        }
    }

    pub fn snapshot(&self, now_ms: u32) -> BridgeSnapshot {
        BridgeSnapshot {
            connected: self.connected,
            last_response: self.last_response_ms,
            motors_enabled: self.motors_enabled,
            current_speed: self.current_speed,
            odometry: self.last_odometry.clone(),
            uptime: now_ms,
        }
    }

    /// Status document as served by the bridge.
    pub fn status_json(&self, now_ms: u32) -> String {
        serde_json::to_string(&self.snapshot(now_ms)).unwrap_or_default()
    }
}

impl Default for BridgeStatus {
    fn default() -> Self {
        Self::new()
    }
}
