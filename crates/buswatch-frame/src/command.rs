//! Command byte decoding for the air-conditioner bus.

use std::fmt;

use crate::codec::{payload_of, COMMAND_OFFSET, HEADER_SIZE};

pub const CMD_POWER: u8 = 0x01;
pub const CMD_SET_TEMPERATURE: u8 = 0x02;
pub const CMD_FAN: u8 = 0x03;
pub const CMD_SWING: u8 = 0x04;
pub const CMD_STATUS_REQUEST: u8 = 0x10;
pub const CMD_STATUS_REPLY: u8 = 0x11;

/// Operating mode carried by a power command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Unknown,
    Cool,
    Dry,
    Fan,
    Heat,
    Auto,
}

impl Mode {
    const ALL: [Mode; 6] = [
        Mode::Unknown,
        Mode::Cool,
        Mode::Dry,
        Mode::Fan,
        Mode::Heat,
        Mode::Auto,
    ];

    /// Index into the mode table, wrapping like the indoor unit does.
    pub fn from_raw(raw: u8) -> Self {
        Self::ALL[raw as usize % Self::ALL.len()]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Unknown => "?",
            Mode::Cool => "Cool",
            Mode::Dry => "Dry",
            Mode::Fan => "Fan",
            Mode::Heat => "Heat",
            Mode::Auto => "Auto",
        }
    }
}

/// Fan speed carried by a fan command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FanSpeed {
    Unknown,
    Low,
    Med,
    High,
    Auto,
}

impl FanSpeed {
    const ALL: [FanSpeed; 5] = [
        FanSpeed::Unknown,
        FanSpeed::Low,
        FanSpeed::Med,
        FanSpeed::High,
        FanSpeed::Auto,
    ];

    pub fn from_raw(raw: u8) -> Self {
        Self::ALL[raw as usize % Self::ALL.len()]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FanSpeed::Unknown => "?",
            FanSpeed::Low => "Low",
            FanSpeed::Med => "Med",
            FanSpeed::High => "High",
            FanSpeed::Auto => "Auto",
        }
    }
}

/// A decoded command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Too short to carry a command byte.
    Invalid,
    Power { on: bool, mode: Mode },
    /// Target temperature in whole degrees Celsius.
    SetTemperature(u8),
    Fan(FanSpeed),
    Swing(bool),
    StatusRequest,
    StatusReply,
    Unknown(u8),
}

impl Command {
    /// Decode raw frame bytes (sentinel through CRC).
    ///
    /// Payload bytes the frame does not carry read as zero. Only the header
    /// length is checked here: on bytes too short to hold a command and a
    /// CRC, the command byte is the CRC low byte. [`Frame::command`] rules
    /// that case out for verified frames.
    ///
    /// [`Frame::command`]: crate::Frame::command
    pub fn decode(frame: &[u8]) -> Self {
        if frame.len() < HEADER_SIZE {
            return Command::Invalid;
        }

        let payload = payload_of(frame);
        let arg = |i: usize| payload.get(i).copied().unwrap_or(0);

        match frame[COMMAND_OFFSET] {
            CMD_POWER => Command::Power {
                on: arg(0) != 0,
                mode: Mode::from_raw(arg(1)),
            },
            CMD_SET_TEMPERATURE => Command::SetTemperature(arg(0)),
            CMD_FAN => Command::Fan(FanSpeed::from_raw(arg(0))),
            CMD_SWING => Command::Swing(arg(0) != 0),
            CMD_STATUS_REQUEST => Command::StatusRequest,
            CMD_STATUS_REPLY => Command::StatusReply,
            other => Command::Unknown(other),
        }
    }

    /// The command byte this decodes from, if any.
    pub fn code(&self) -> Option<u8> {
        match self {
            Command::Invalid => None,
            Command::Power { .. } => Some(CMD_POWER),
            Command::SetTemperature(_) => Some(CMD_SET_TEMPERATURE),
            Command::Fan(_) => Some(CMD_FAN),
            Command::Swing(_) => Some(CMD_SWING),
            Command::StatusRequest => Some(CMD_STATUS_REQUEST),
            Command::StatusReply => Some(CMD_STATUS_REPLY),
            Command::Unknown(code) => Some(*code),
        }
    }
}

fn on_off(on: bool) -> &'static str {
    if on {
        "ON"
    } else {
        "OFF"
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Invalid => f.write_str("Invalid"),
            Command::Power { on, mode } => {
                write!(f, "Power {}, Mode {}", on_off(*on), mode.as_str())
            }
            Command::SetTemperature(degrees) => write!(f, "Set temp {degrees} °C"),
            Command::Fan(speed) => write!(f, "Fan {}", speed.as_str()),
            Command::Swing(on) => write!(f, "Swing {}", on_off(*on)),
            Command::StatusRequest => f.write_str("Status request"),
            Command::StatusReply => f.write_str("Status reply"),
            Command::Unknown(code) => write!(f, "Unknown command 0x{code:02X}"),
        }
    }
}
