//! Frame recovery for a sentinel-delimited, CRC-16 checked serial protocol.
//!
//! Every frame on the bus is laid out as:
//! - a 1-byte sentinel (`0xAA`) for stream synchronization
//! - a 1-byte declared length (see [`FramingPolicy`])
//! - two addressing bytes and a command byte
//! - an optional payload
//! - a CRC-16 (Modbus parameters), low byte first
//!
//! [`FrameSynchronizer`] finds frames in an unaligned stream, [`validate`]
//! checks them and [`Command`] turns them into something readable.

pub mod codec;
pub mod command;
pub mod crc;
pub mod error;
pub mod sync;

pub use codec::{
    encode_frame, validate, Frame, FramingPolicy, CRC_LEN, DEFAULT_SENTINEL, HEADER_SIZE,
    MIN_FRAME_LEN,
};
pub use command::{Command, FanSpeed, Mode};
pub use crc::crc16;
pub use error::{FrameError, Result};
pub use sync::{FrameSynchronizer, SyncConfig, SyncState, DEFAULT_MAX_PENDING, DEFAULT_NOISE_THRESHOLD};
