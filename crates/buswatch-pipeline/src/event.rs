use buswatch_frame::{Command, Frame, FrameError};
use buswatch_source::Micros;
use bytes::Bytes;

use crate::segment::Burst;

/// One classified unit handed to an [`EventSink`](crate::EventSink).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnifferEvent {
    /// A raw burst that passed the noise filter.
    Burst { burst: Burst, novel: bool },

    /// A CRC-valid frame that passed the noise filter.
    Frame {
        frame: Frame,
        command: Command,
        at: Micros,
        novel: bool,
    },

    /// Something went wrong on the wire. Never filtered.
    Diagnostic { error: FrameError, at: Micros },
}

impl SnifferEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            SnifferEvent::Burst { .. } => "burst",
            SnifferEvent::Frame { .. } => "frame",
            SnifferEvent::Diagnostic { .. } => "diagnostic",
        }
    }

    /// When the event was observed. For bursts, the time of the last byte.
    pub fn at(&self) -> Micros {
        match self {
            SnifferEvent::Burst { burst, .. } => burst.end_us,
            SnifferEvent::Frame { at, .. } | SnifferEvent::Diagnostic { at, .. } => *at,
        }
    }

    /// Bytes carried by the event.
    pub fn bytes(&self) -> Option<Bytes> {
        match self {
            SnifferEvent::Burst { burst, .. } => Some(burst.bytes.clone()),
            SnifferEvent::Frame { frame, .. } => Some(frame.bytes()),
            SnifferEvent::Diagnostic { error, .. } => error.bytes().cloned(),
        }
    }

    pub fn is_novel(&self) -> bool {
        match self {
            SnifferEvent::Burst { novel, .. } | SnifferEvent::Frame { novel, .. } => *novel,
            SnifferEvent::Diagnostic { .. } => false,
        }
    }
}
