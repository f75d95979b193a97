use std::fmt;
use std::str::FromStr;

use bytes::{BufMut, Bytes, BytesMut};

use crate::command::Command;
use crate::crc;
use crate::error::{FrameError, Result};

/// Sentinel byte opening every frame on the observed bus.
pub const DEFAULT_SENTINEL: u8 = 0xAA;

/// Sentinel + length + CRC low + CRC high.
pub const MIN_FRAME_LEN: usize = 4;

/// Sentinel + length + two address bytes + command.
pub const HEADER_SIZE: usize = 5;

/// Trailing checksum bytes.
pub const CRC_LEN: usize = 2;

/// Offset of the command byte.
pub const COMMAND_OFFSET: usize = 4;

/// How the declared length byte maps to the on-wire frame size.
///
/// Captures disagree on this, so it is a configuration choice rather than a
/// constant. The default matches the units this tool was first used on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FramingPolicy {
    /// `LEN` counts everything but the sentinel and length byte:
    /// total = `LEN + 2`, with the CRC as the last two of those bytes.
    #[default]
    Inclusive,
    /// `LEN` counts only the bytes between the length byte and the CRC:
    /// total = `LEN + 4`.
    PayloadOnly,
}

impl FramingPolicy {
    /// Total frame size, sentinel through CRC, for a declared length.
    pub fn total_len(self, declared: u8) -> usize {
        match self {
            FramingPolicy::Inclusive => declared as usize + 2,
            FramingPolicy::PayloadOnly => declared as usize + 4,
        }
    }

    /// The length byte to put on the wire for a frame of `total` bytes.
    pub fn declared_len(self, total: usize) -> Option<u8> {
        let declared = match self {
            FramingPolicy::Inclusive => total.checked_sub(2)?,
            FramingPolicy::PayloadOnly => total.checked_sub(4)?,
        };
        u8::try_from(declared).ok()
    }

    /// Largest frame the length byte can describe.
    pub fn max_total_len(self) -> usize {
        self.total_len(u8::MAX)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FramingPolicy::Inclusive => "inclusive",
            FramingPolicy::PayloadOnly => "payload-only",
        }
    }
}

impl fmt::Display for FramingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FramingPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "inclusive" | "len+2" => Ok(FramingPolicy::Inclusive),
            "payload-only" | "payload_only" | "len+4" => Ok(FramingPolicy::PayloadOnly),
            other => Err(format!(
                "unknown framing policy '{other}' (expected inclusive or payload-only)"
            )),
        }
    }
}

/// A frame whose checksum has been verified.
///
/// Only [`validate`] constructs one, so holding a `Frame` means the CRC
/// matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    bytes: Bytes,
}

impl Frame {
    /// All bytes, sentinel through CRC.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Cheap clone of the underlying buffer.
    pub fn bytes(&self) -> Bytes {
        self.bytes.clone()
    }

    pub fn into_bytes(self) -> Bytes {
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// The length byte as transmitted.
    pub fn declared_len(&self) -> u8 {
        self.bytes[1]
    }

    /// The two addressing bytes, when the frame is long enough to carry them.
    pub fn address(&self) -> Option<[u8; 2]> {
        match self.bytes.get(2..4) {
            Some(&[a, b]) if self.bytes.len() >= HEADER_SIZE + CRC_LEN => Some([a, b]),
            _ => None,
        }
    }

    /// The command byte, when the frame is long enough to carry one.
    pub fn command_code(&self) -> Option<u8> {
        if self.bytes.len() >= HEADER_SIZE + CRC_LEN {
            Some(self.bytes[COMMAND_OFFSET])
        } else {
            None
        }
    }

    /// Bytes after the command and before the CRC.
    pub fn payload(&self) -> &[u8] {
        payload_of(&self.bytes)
    }

    /// The verified checksum.
    pub fn crc(&self) -> u16 {
        let n = self.bytes.len();
        u16::from_le_bytes([self.bytes[n - 2], self.bytes[n - 1]])
    }

    /// Decode the command carried by this frame.
    ///
    /// [`Command::Invalid`] whenever [`Frame::command_code`] is `None`, so a
    /// CRC byte is never read as a command.
    pub fn command(&self) -> Command {
        match self.command_code() {
            Some(_) => Command::decode(&self.bytes),
            None => Command::Invalid,
        }
    }
}

impl AsRef<[u8]> for Frame {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

/// Payload slice of raw frame bytes, never reaching into the CRC.
pub(crate) fn payload_of(frame: &[u8]) -> &[u8] {
    let end = frame.len().saturating_sub(CRC_LEN).max(HEADER_SIZE);
    frame.get(HEADER_SIZE..end).unwrap_or(&[])
}

/// Check the CRC trailer of a candidate frame.
///
/// Everything but the last two bytes is covered by the checksum; the last two
/// are the checksum itself, low byte first.
pub fn validate(candidate: Bytes) -> Result<Frame> {
    if candidate.len() < MIN_FRAME_LEN {
        return Err(FrameError::TooShort {
            len: candidate.len(),
            min: MIN_FRAME_LEN,
        });
    }

    let body = &candidate[..candidate.len() - CRC_LEN];
    let computed = crc::crc16(body);
    let received = crc::trailer(&candidate).unwrap_or_default();

    if computed != received {
        return Err(FrameError::CrcMismatch {
            frame: candidate,
            received,
            computed,
        });
    }

    Ok(Frame { bytes: candidate })
}

/// Build a well-formed frame.
///
/// Wire format:
/// ```text
/// ┌──────────┬─────┬──────────┬─────┬────────────┬────────┬────────┐
/// │ Sentinel │ LEN │ Addr (2) │ Cmd │ Payload    │ CRC lo │ CRC hi │
/// │ 0xAA     │     │          │     │ (n bytes)  │        │        │
/// └──────────┴─────┴──────────┴─────┴────────────┴────────┴────────┘
/// ```
/// `LEN` is derived from the total size according to `policy`.
pub fn encode_frame(
    policy: FramingPolicy,
    sentinel: u8,
    address: [u8; 2],
    command: u8,
    payload: &[u8],
    dst: &mut BytesMut,
) -> Result<()> {
    let total = HEADER_SIZE + payload.len() + CRC_LEN;
    let declared = policy
        .declared_len(total)
        .ok_or(FrameError::PayloadTooLarge {
            size: payload.len(),
            max: policy.max_total_len() - HEADER_SIZE - CRC_LEN,
        })?;

    let start = dst.len();
    dst.reserve(total);
    dst.put_u8(sentinel);
    dst.put_u8(declared);
    dst.put_slice(&address);
    dst.put_u8(command);
    dst.put_slice(payload);
    let crc = crc::crc16(&dst[start..]);
    dst.put_u16_le(crc);
    Ok(())
}
