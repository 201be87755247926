//! Command parsing.
//!
//! A line is *structured* if it starts with `{` and must then be a JSON
//! object `{"cmd": NAME, "args": ...}`.  Anything else is the legacy
//! whitespace-token form `NAME arg arg ...`.  Both land in the same closed
//! [`Command`] enum; the dispatcher matches it exhaustively.
//!
//! | Structured              | Legacy plain                           |
//! |-------------------------|----------------------------------------|
//! | M, PWM, INIT, DEBUG     | SET_V, MALL, M1..M4                    |
//! | MODE, ENABLE, DISABLE   | FWD, BACK, LEFT, RIGHT (default 150)   |
//! | STATUS, PING, STOP      | STOP, ENABLE, DISABLE, STATUS, PING    |
//! | REQ_ODOM                | REQ_ODOM                               |

use log::debug;
use serde_json::Value;

use crate::error::ProtocolError;
use crate::motors::WHEEL_COUNT;

/// Speed used by the plain-form motion shorthands when no argument is given.
pub const DEFAULT_SPEED: i32 = 150;

/// Longest accepted MODE label.
pub const MODE_LABEL_LEN: usize = 16;

/// Command or argument name echoed back in replies.
pub type Token = heapless::String<24>;

/// Operator mode label.
pub type ModeLabel = heapless::String<MODE_LABEL_LEN>;

/// Which encoding a request arrived in; replies use the same one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wire {
    Json,
    Plain,
}

/// Targets of the `INIT` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subsystem {
    System,
    Motors,
    Sensors,
}

impl Subsystem {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "SYSTEM" => Some(Self::System),
            "MOTORS" => Some(Self::Motors),
            "SENSORS" => Some(Self::Sensors),
            _ => None,
        }
    }
}

/// Named shorthand motions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Motion {
    Forward,
    Backward,
    Left,
    Right,
}

impl Motion {
    pub fn name(self) -> &'static str {
        match self {
            Self::Forward => "FWD",
            Self::Backward => "BACK",
            Self::Left => "LEFT",
            Self::Right => "RIGHT",
        }
    }
}

/// Every command the controller understands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `M [m1,m2,m3,m4,enable]`
    Motor {
        speeds: [i32; WHEEL_COUNT],
        enable: bool,
    },
    /// `PWM [m1,m2,m3,m4]`
    PwmAll([i32; WHEEL_COUNT]),
    /// `PWM {"motor":1..4,"value":v}`; `wheel` is zero-based.
    PwmSingle { wheel: usize, value: i32 },
    /// `SET_V L R`: wheels 1/3 get L, 2/4 get R.
    SetVelocity { left: i32, right: i32 },
    /// `MALL m1 m2 m3 m4`
    DriveAll([i32; WHEEL_COUNT]),
    /// `M1..M4 v`; `wheel` is zero-based.
    SetWheel { wheel: usize, speed: i32 },
    Drive { motion: Motion, speed: i32 },
    Stop,
    Init(Subsystem),
    Enable,
    Disable,
    Status,
    Ping,
    Debug(bool),
    Mode(ModeLabel),
    RequestOdometry,
}

const WHEEL_NAMES: [&str; WHEEL_COUNT] = ["M1", "M2", "M3", "M4"];

impl Command {
    /// Wire name of the command, as echoed in `OK <NAME>`.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Motor { .. } => "M",
            Self::PwmAll(_) | Self::PwmSingle { .. } => "PWM",
            Self::SetVelocity { .. } => "SET_V",
            Self::DriveAll(_) => "MALL",
            Self::SetWheel { wheel, .. } => WHEEL_NAMES.get(*wheel).copied().unwrap_or("M"),
            Self::Drive { motion, .. } => motion.name(),
            Self::Stop => "STOP",
            Self::Init(_) => "INIT",
            Self::Enable => "ENABLE",
            Self::Disable => "DISABLE",
            Self::Status => "STATUS",
            Self::Ping => "PING",
            Self::Debug(_) => "DEBUG",
            Self::Mode(_) => "MODE",
            Self::RequestOdometry => "REQ_ODOM",
        }
    }
}

/// A parsed command plus the encoding it arrived in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub command: Command,
    pub wire: Wire,
}

/// Why a line did not become a [`Request`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Not a JSON object, or no `cmd` string.  Logged and dropped.
    Malformed,
    /// Well-formed, but the name is not in the command set.
    UnknownCommand { name: Token, wire: Wire },
    /// Known command with arguments of the wrong shape.
    BadArgs {
        cmd: &'static str,
        reason: ProtocolError,
        wire: Wire,
    },
    /// INIT with a target outside SYSTEM/MOTORS/SENSORS.  Logged only.
    UnknownTarget(Token),
}

/// Parse one trimmed line.
pub fn parse_line(line: &str) -> Result<Request, ParseError> {
    if line.starts_with('{') {
        parse_json(line).map(|command| Request {
            command,
            wire: Wire::Json,
        })
    } else {
        parse_plain(line).map(|command| Request {
            command,
            wire: Wire::Plain,
        })
    }
}

/// Copy `s` into a [`Token`], truncating at capacity.
pub(crate) fn token(s: &str) -> Token {
    let mut t = Token::new();
    for ch in s.chars() {
        if t.push(ch).is_err() {
            break;
        }
    }
    t
}

// ── Structured form ───────────────────────────────────────────

fn parse_json(line: &str) -> Result<Command, ParseError> {
    let value: Value = serde_json::from_str(line).map_err(|e| {
        debug!("Protocol: JSON parse error: {}", e);
        ParseError::Malformed
    })?;
    let obj = value.as_object().ok_or(ParseError::Malformed)?;
    let name = obj
        .get("cmd")
        .and_then(Value::as_str)
        .ok_or(ParseError::Malformed)?;
    let args = obj.get("args");

    let bad = |cmd: &'static str, reason: ProtocolError| ParseError::BadArgs {
        cmd,
        reason,
        wire: Wire::Json,
    };

    match name {
        "M" => {
            let arr = args
                .ok_or(bad("M", ProtocolError::MissingArgs))?
                .as_array()
                .ok_or(bad("M", ProtocolError::BadType))?;
            if arr.len() != WHEEL_COUNT + 1 {
                return Err(bad("M", ProtocolError::BadArity));
            }
            let mut ints = [0i32; WHEEL_COUNT + 1];
            for (slot, v) in ints.iter_mut().zip(arr) {
                *slot = json_int(v).ok_or(bad("M", ProtocolError::BadType))?;
            }
            Ok(Command::Motor {
                speeds: [ints[0], ints[1], ints[2], ints[3]],
                enable: ints[4] != 0,
            })
        }
        "PWM" => match args {
            Some(Value::Array(arr)) if arr.len() == WHEEL_COUNT => {
                let mut speeds = [0i32; WHEEL_COUNT];
                for (slot, v) in speeds.iter_mut().zip(arr) {
                    *slot = json_int(v).ok_or(bad("PWM", ProtocolError::BadArgs))?;
                }
                Ok(Command::PwmAll(speeds))
            }
            Some(Value::Object(o)) => {
                let motor = o.get("motor").and_then(json_int);
                let value = o.get("value").and_then(json_int);
                match (motor, value) {
                    (Some(m @ 1..=4), Some(value)) => Ok(Command::PwmSingle {
                        wheel: (m - 1) as usize,
                        value,
                    }),
                    _ => Err(bad("PWM", ProtocolError::BadArgs)),
                }
            }
            _ => Err(bad("PWM", ProtocolError::BadArgs)),
        },
        "INIT" => {
            let target = args.and_then(Value::as_str).unwrap_or("");
            Subsystem::from_name(target)
                .map(Command::Init)
                .ok_or_else(|| ParseError::UnknownTarget(token(target)))
        }
        "DEBUG" => match args.and_then(Value::as_str) {
            Some("ON") => Ok(Command::Debug(true)),
            Some("OFF") => Ok(Command::Debug(false)),
            Some(_) => Err(bad("DEBUG", ProtocolError::BadArgs)),
            None => Err(bad("DEBUG", ProtocolError::MissingArgs)),
        },
        "MODE" => {
            let label = args
                .ok_or(bad("MODE", ProtocolError::MissingArgs))?
                .as_str()
                .ok_or(bad("MODE", ProtocolError::BadType))?;
            let mut mode = ModeLabel::new();
            mode.push_str(label)
                .map_err(|()| bad("MODE", ProtocolError::BadArgs))?;
            Ok(Command::Mode(mode))
        }
        "ENABLE" => Ok(Command::Enable),
        "DISABLE" => Ok(Command::Disable),
        "STATUS" => Ok(Command::Status),
        "PING" => Ok(Command::Ping),
        "STOP" => Ok(Command::Stop),
        "REQ_ODOM" => Ok(Command::RequestOdometry),
        other => Err(ParseError::UnknownCommand {
            name: token(other),
            wire: Wire::Json,
        }),
    }
}

/// Integer argument, saturated into `i32`.  Floats and strings are rejected.
fn json_int(v: &Value) -> Option<i32> {
    v.as_i64()
        .map(|n| n.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32)
}

// ── Legacy plain form ─────────────────────────────────────────

fn parse_plain(line: &str) -> Result<Command, ParseError> {
    let mut tokens = line.split_whitespace();
    let Some(name) = tokens.next() else {
        return Err(ParseError::Malformed);
    };

    let bad = |cmd: &'static str| ParseError::BadArgs {
        cmd,
        reason: ProtocolError::BadArgs,
        wire: Wire::Plain,
    };

    // Next token as an integer: `None` if absent, `Err` if not a number.
    let mut int_arg = |cmd: &'static str| -> Result<Option<i32>, ParseError> {
        tokens
            .next()
            .map(|t| t.parse::<i32>().map_err(|_| bad(cmd)))
            .transpose()
    };

    let motion = |motion: Motion, arg: Option<i32>| Command::Drive {
        motion,
        speed: arg.unwrap_or(DEFAULT_SPEED),
    };

    match name {
        "SET_V" => {
            let left = int_arg("SET_V")?.ok_or(bad("SET_V"))?;
            let right = int_arg("SET_V")?.ok_or(bad("SET_V"))?;
            Ok(Command::SetVelocity { left, right })
        }
        "MALL" => {
            let mut speeds = [0i32; WHEEL_COUNT];
            for slot in &mut speeds {
                *slot = int_arg("MALL")?.ok_or(bad("MALL"))?;
            }
            Ok(Command::DriveAll(speeds))
        }
        "M1" | "M2" | "M3" | "M4" => {
            let wheel = WHEEL_NAMES
                .iter()
                .position(|n| *n == name)
                .unwrap_or_default();
            let cmd = WHEEL_NAMES[wheel];
            let speed = int_arg(cmd)?.ok_or(bad(cmd))?;
            Ok(Command::SetWheel { wheel, speed })
        }
        "FWD" => Ok(motion(Motion::Forward, int_arg("FWD")?)),
        "BACK" => Ok(motion(Motion::Backward, int_arg("BACK")?)),
        "LEFT" => Ok(motion(Motion::Left, int_arg("LEFT")?)),
        "RIGHT" => Ok(motion(Motion::Right, int_arg("RIGHT")?)),
        "STOP" => Ok(Command::Stop),
        "ENABLE" => Ok(Command::Enable),
        "DISABLE" => Ok(Command::Disable),
        "STATUS" => Ok(Command::Status),
        "PING" => Ok(Command::Ping),
        "REQ_ODOM" => Ok(Command::RequestOdometry),
        other => Err(ParseError::UnknownCommand {
            name: token(other),
            wire: Wire::Plain,
        }),
    }
}
