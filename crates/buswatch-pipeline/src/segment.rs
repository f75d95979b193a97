//! Timing-based burst segmentation.
//!
//! Bytes on a half-duplex bus arrive in clumps separated by idle line time.
//! The segmenter closes a burst when:
//! 1. the line has been idle for longer than the gap threshold,
//! 2. the burst reaches its maximum length, or
//! 3. the burst has been open for too long without either of the above.

use std::fmt;

use buswatch_source::{elapsed, Micros};
use bytes::{BufMut, Bytes, BytesMut};

/// A bit over one character time at 9600 baud 8N1.
pub const DEFAULT_IDLE_GAP_US: Micros = 1200;
pub const DEFAULT_MAX_BURST_LEN: usize = 256;
pub const DEFAULT_MAX_BURST_AGE_US: Micros = 50_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmenterConfig {
    /// Idle time that ends a burst.
    pub idle_gap_us: Micros,
    /// Bursts are cut at this many bytes.
    pub max_burst_len: usize,
    /// Bursts are cut after being open this long.
    pub max_burst_age_us: Micros,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            idle_gap_us: DEFAULT_IDLE_GAP_US,
            max_burst_len: DEFAULT_MAX_BURST_LEN,
            max_burst_age_us: DEFAULT_MAX_BURST_AGE_US,
        }
    }
}

/// Which rule closed a burst.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    IdleGap,
    MaxLength,
    MaxAge,
    Flush,
}

impl CloseReason {
    pub fn as_str(self) -> &'static str {
        match self {
            CloseReason::IdleGap => "idle_gap",
            CloseReason::MaxLength => "max_length",
            CloseReason::MaxAge => "max_age",
            CloseReason::Flush => "flush",
        }
    }

    /// True when the burst was cut by a resource ceiling rather than by the
    /// line going quiet.
    pub fn is_forced(self) -> bool {
        matches!(self, CloseReason::MaxLength | CloseReason::MaxAge)
    }
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A closed run of bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Burst {
    pub bytes: Bytes,
    /// Timestamp of the first byte.
    pub start_us: Micros,
    /// Timestamp of the last byte.
    pub end_us: Micros,
    pub closed_by: CloseReason,
}

impl Burst {
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Time from first to last byte.
    pub fn duration_us(&self) -> Micros {
        elapsed(self.end_us, self.start_us)
    }
}

/// Groups bytes into bursts.
#[derive(Debug)]
pub struct Segmenter {
    config: SegmenterConfig,
    buf: BytesMut,
    start_us: Micros,
    last_us: Micros,
}

impl Segmenter {
    pub fn new(config: SegmenterConfig) -> Self {
        Self {
            config,
            buf: BytesMut::with_capacity(config.max_burst_len),
            start_us: 0,
            last_us: 0,
        }
    }

    pub fn config(&self) -> &SegmenterConfig {
        &self.config
    }

    /// Bytes in the open burst.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }

    /// Append a byte received at `now`.
    ///
    /// Returns the burst closed before the byte (idle gap or age) or after it
    /// (length). At most one closes per byte: when an earlier rule fires, the
    /// new burst starts with this byte alone.
    pub fn ingest(&mut self, byte: u8, now: Micros) -> Option<Burst> {
        let before = self.expired(now).and_then(|reason| self.close(reason));

        if self.buf.is_empty() {
            self.buf.reserve(self.config.max_burst_len);
            self.start_us = now;
        }
        self.buf.put_u8(byte);
        self.last_us = now;

        if self.buf.len() >= self.config.max_burst_len {
            return before.or_else(|| self.close(CloseReason::MaxLength));
        }
        before
    }

    /// Apply the time-based rules without a new byte.
    pub fn tick(&mut self, now: Micros) -> Option<Burst> {
        let reason = self.expired(now)?;
        self.close(reason)
    }

    /// Close whatever is buffered.
    pub fn flush(&mut self) -> Option<Burst> {
        self.close(CloseReason::Flush)
    }

    fn expired(&self, now: Micros) -> Option<CloseReason> {
        if self.buf.is_empty() {
            return None;
        }
        if elapsed(now, self.last_us) > self.config.idle_gap_us {
            Some(CloseReason::IdleGap)
        } else if elapsed(now, self.start_us) > self.config.max_burst_age_us {
            Some(CloseReason::MaxAge)
        } else {
            None
        }
    }

    fn close(&mut self, reason: CloseReason) -> Option<Burst> {
        if self.buf.is_empty() {
            return None;
        }
        let burst = Burst {
            bytes: self.buf.split().freeze(),
            start_us: self.start_us,
            end_us: self.last_us,
            closed_by: reason,
        };
        if reason.is_forced() {
            tracing::debug!(len = burst.len(), reason = %reason, "burst force-closed");
        }
        Some(burst)
    }
}

impl Default for Segmenter {
    fn default() -> Self {
        Self::new(SegmenterConfig::default())
    }
}
