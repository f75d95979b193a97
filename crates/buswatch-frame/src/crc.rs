//! CRC-16 as used by the bus (the Modbus RTU parameters).
//!
//! Polynomial 0x8005 reflected (0xA001), init 0xFFFF, no final XOR,
//! transmitted low byte first.

/// Reflected polynomial.
pub const POLY: u16 = 0xA001;

/// Initial register value.
pub const INIT: u16 = 0xFFFF;

/// Fold one byte into a running CRC.
#[inline]
pub fn update(mut crc: u16, byte: u8) -> u16 {
    crc ^= byte as u16;
    for _ in 0..8 {
        if crc & 0x0001 != 0 {
            crc = (crc >> 1) ^ POLY;
        } else {
            crc >>= 1;
        }
    }
    crc
}

/// Compute the CRC over `data`, bit at a time (no table).
pub fn crc16(data: &[u8]) -> u16 {
    data.iter().fold(INIT, |crc, &byte| update(crc, byte))
}

/// Read the little-endian CRC trailer from the last two bytes of a frame.
///
/// Returns `None` when fewer than two bytes are present.
pub fn trailer(frame: &[u8]) -> Option<u16> {
    match frame {
        [.., lo, hi] => Some(u16::from_le_bytes([*lo, *hi])),
        _ => None,
    }
}
