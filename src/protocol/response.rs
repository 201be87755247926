//! Response lines.
//!
//! Structured replies are single-line JSON objects keyed by `resp`:
//!
//! ```text
//! {"resp":"ACK","type":"MOTOR"}
//! {"resp":"ERROR","type":"M","msg":"BAD_ARITY"}
//! {"resp":"STATUS","uptime":12,"motors":1,"system":"ready","ram":151232,"mode":"manual"}
//! {"resp":"PONG"}
//! {"resp":"DEBUG","msg":"..."}
//! {"resp":"ODOM","t":4200,"dt":200,"c":[1,2,3,4],"distL":..,"distR":..,"vL":..,"vR":..}
//! ```
//!
//! Legacy plain requests are answered with `OK <CMD>` / `ERR <CMD> params`
//! / `ERR UNKNOWN_CMD <token>`.

use core::fmt::Write as _;

use serde::Serialize;

use super::command::{ModeLabel, Token};
use crate::odometry::OdometryDelta;

/// DEBUG messages are cut to this many characters.
pub const DEBUG_MSG_LEN: usize = 120;

pub type DebugMessage = heapless::String<DEBUG_MSG_LEN>;

/// Periodic / on-demand controller status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    /// Seconds since boot.
    pub uptime: u32,
    /// 1 when the motor enable state is set.
    pub motors: u8,
    /// `"ready"` once the system subsystem initialised, else `"init"`.
    pub system: &'static str,
    /// Free heap estimate (bytes).
    pub ram: u32,
    pub mode: ModeLabel,
}

/// One outbound line.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    Ack(&'static str),
    Error { cmd: Token, reason: &'static str },
    Status(StatusReport),
    Pong,
    Debug(DebugMessage),
    Odometry(OdometryDelta),
    /// `OK <CMD>`
    PlainOk(&'static str),
    /// `ERR <head> <tail>`
    PlainErr { head: Token, tail: Token },
}

#[derive(Serialize)]
struct Tagged<'a, T: Serialize> {
    resp: &'static str,
    #[serde(flatten)]
    body: &'a T,
}

#[derive(Serialize)]
struct AckBody<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    msg: &'a str,
}

#[derive(Serialize)]
struct MsgBody<'a> {
    msg: &'a str,
}

#[derive(Serialize)]
struct Empty {}

fn json<T: Serialize>(resp: &'static str, body: &T) -> String {
    serde_json::to_string(&Tagged { resp, body }).unwrap_or_default()
}

impl Response {
    /// Build a DEBUG response, truncating to [`DEBUG_MSG_LEN`] characters.
    pub fn debug(msg: &str) -> Self {
        let mut out = DebugMessage::new();
        for ch in msg.chars() {
            if out.push(ch).is_err() {
                break;
            }
        }
        Self::Debug(out)
    }

    /// Render without the line terminator.
    pub fn render(&self) -> String {
        match self {
            Self::Ack(kind) => json("ACK", &AckBody { kind }),
            Self::Error { cmd, reason } => json(
                "ERROR",
                &ErrorBody {
                    kind: cmd.as_str(),
                    msg: reason,
                },
            ),
            Self::Status(report) => json("STATUS", report),
            Self::Pong => json("PONG", &Empty {}),
            Self::Debug(msg) => json("DEBUG", &MsgBody { msg: msg.as_str() }),
            Self::Odometry(delta) => json("ODOM", delta),
            Self::PlainOk(cmd) => {
                let mut s = String::from("OK ");
                s.push_str(cmd);
                s
            }
            Self::PlainErr { head, tail } => {
                let mut s = String::new();
                let _ = write!(s, "ERR {} {}", head, tail);
                s
            }
        }
    }
}
