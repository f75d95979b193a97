use bytes::Bytes;

/// Problems found while recovering frames from the bus.
///
/// None of these are fatal. The synchronizer discards the offending bytes,
/// resynchronizes on the next sentinel and hands the error out as a
/// diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    /// The checksum trailer does not match the frame contents.
    #[error("crc mismatch (received 0x{received:04X}, computed 0x{computed:04X})")]
    CrcMismatch {
        frame: Bytes,
        received: u16,
        computed: u16,
    },

    /// Bytes seen while hunting for a sentinel.
    #[error("{} unsynchronized bytes before sentinel", .noise.len())]
    Unsynchronized { noise: Bytes },

    /// The declared length cannot describe a frame under the active policy.
    #[error("declared length {declared} is shorter than the minimum frame")]
    InvalidLength { header: Bytes, declared: u8 },

    /// The pending buffer grew past its ceiling without completing a frame.
    #[error("frame buffer overflow ({} bytes discarded)", .discarded.len())]
    Overflow { discarded: Bytes },

    /// A frame was cut short by the end of its burst.
    #[error("truncated frame ({} of {expected} bytes)", .partial.len())]
    Truncated { partial: Bytes, expected: usize },

    /// Fewer bytes than the smallest possible frame.
    #[error("frame too short ({len} bytes, min {min})")]
    TooShort { len: usize, min: usize },

    /// The payload does not fit the one-byte length field.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },
}

impl FrameError {
    /// Stable short name, used for statistics and structured output.
    pub fn kind(&self) -> &'static str {
        match self {
            FrameError::CrcMismatch { .. } => "crc_mismatch",
            FrameError::Unsynchronized { .. } => "unsynchronized",
            FrameError::InvalidLength { .. } => "invalid_length",
            FrameError::Overflow { .. } => "overflow",
            FrameError::Truncated { .. } => "truncated",
            FrameError::TooShort { .. } => "too_short",
            FrameError::PayloadTooLarge { .. } => "payload_too_large",
        }
    }

    /// The raw bytes this diagnostic is about, if it carries any.
    pub fn bytes(&self) -> Option<&Bytes> {
        match self {
            FrameError::CrcMismatch { frame, .. } => Some(frame),
            FrameError::Unsynchronized { noise } => Some(noise),
            FrameError::InvalidLength { header, .. } => Some(header),
            FrameError::Overflow { discarded } => Some(discarded),
            FrameError::Truncated { partial, .. } => Some(partial),
            FrameError::TooShort { .. } | FrameError::PayloadTooLarge { .. } => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
