use bytes::{BufMut, BytesMut};

use crate::codec::{validate, Frame, FramingPolicy, DEFAULT_SENTINEL, MIN_FRAME_LEN};
use crate::error::{FrameError, Result};

/// Default ceiling on bytes held while assembling one frame.
pub const DEFAULT_MAX_PENDING: usize = 128;

/// Default number of non-sentinel bytes tolerated before reporting noise.
pub const DEFAULT_NOISE_THRESHOLD: usize = 16;

/// Configuration for the frame synchronizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncConfig {
    /// Byte that opens every frame.
    pub sentinel: u8,
    /// How the declared length maps to the frame size.
    pub policy: FramingPolicy,
    /// Pending bytes allowed before the buffer is discarded.
    pub max_pending: usize,
    /// Non-sentinel bytes dropped silently before an `Unsynchronized`
    /// diagnostic is raised.
    pub noise_threshold: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            sentinel: DEFAULT_SENTINEL,
            policy: FramingPolicy::default(),
            max_pending: DEFAULT_MAX_PENDING,
            noise_threshold: DEFAULT_NOISE_THRESHOLD,
        }
    }
}

/// Where the synchronizer is within a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// Hunting for a sentinel.
    Seeking,
    /// Sentinel seen, waiting for the length byte.
    Header,
    /// Collecting a frame of `expected` total bytes.
    Body { expected: usize },
}

/// Recovers frames from an unaligned byte stream.
///
/// Bytes go in one at a time. A frame is sliced off as soon as its declared
/// size is buffered, which leaves the buffer empty: whatever arrives next
/// must itself be a sentinel or it is treated as noise. There is no
/// byte-stuffing on this bus, so nothing after a bad frame is salvaged.
#[derive(Debug)]
pub struct FrameSynchronizer {
    config: SyncConfig,
    buf: BytesMut,
    noise: BytesMut,
}

impl FrameSynchronizer {
    pub fn new(config: SyncConfig) -> Self {
        Self {
            config,
            buf: BytesMut::with_capacity(config.max_pending + 1),
            noise: BytesMut::with_capacity(config.noise_threshold + 1),
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn state(&self) -> SyncState {
        match self.buf.len() {
            0 => SyncState::Seeking,
            1 => SyncState::Header,
            _ => SyncState::Body {
                expected: self.config.policy.total_len(self.buf[1]),
            },
        }
    }

    /// Bytes currently held towards the next frame.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }

    /// Offer one byte. Returns a frame or diagnostic when one completes.
    pub fn push(&mut self, byte: u8) -> Option<Result<Frame>> {
        if self.buf.is_empty() {
            return self.seek(byte);
        }

        self.buf.put_u8(byte);
        let expected = self.config.policy.total_len(self.buf[1]);

        if self.buf.len() == 2 && expected < MIN_FRAME_LEN {
            tracing::debug!(declared = byte, "declared length below minimum frame");
            return Some(Err(FrameError::InvalidLength {
                header: self.buf.split().freeze(),
                declared: byte,
            }));
        }

        if self.buf.len() >= expected {
            let candidate = self.buf.split_to(expected).freeze();
            let result = validate(candidate);
            match &result {
                Ok(frame) => tracing::debug!(len = frame.len(), "frame validated"),
                Err(err) => tracing::debug!(error = %err, "frame rejected"),
            }
            return Some(result);
        }

        if self.buf.len() > self.config.max_pending {
            tracing::debug!(
                pending = self.buf.len(),
                expected,
                "frame buffer overflow, resynchronizing"
            );
            return Some(Err(FrameError::Overflow {
                discarded: self.buf.split().freeze(),
            }));
        }

        None
    }

    fn seek(&mut self, byte: u8) -> Option<Result<Frame>> {
        if byte == self.config.sentinel {
            if !self.noise.is_empty() {
                tracing::trace!(dropped = self.noise.len(), "noise before sentinel");
                self.noise.clear();
            }
            self.buf.put_u8(byte);
            return None;
        }

        self.noise.put_u8(byte);
        if self.noise.len() > self.config.noise_threshold {
            return Some(Err(FrameError::Unsynchronized {
                noise: self.noise.split().freeze(),
            }));
        }
        None
    }

    /// Offer a run of bytes, collecting everything that completes.
    pub fn feed(&mut self, data: &[u8]) -> Vec<Result<Frame>> {
        data.iter().filter_map(|&byte| self.push(byte)).collect()
    }

    /// Mark the end of a burst.
    ///
    /// A partially assembled frame cannot continue into the next burst, so it
    /// is reported as truncated. Sub-threshold noise is dropped quietly.
    pub fn finish(&mut self) -> Option<Result<Frame>> {
        if !self.noise.is_empty() {
            tracing::trace!(dropped = self.noise.len(), "noise at end of burst");
            self.noise.clear();
        }
        if self.buf.is_empty() {
            return None;
        }
        let expected = match self.state() {
            SyncState::Body { expected } => expected,
            _ => MIN_FRAME_LEN,
        };
        Some(Err(FrameError::Truncated {
            partial: self.buf.split().freeze(),
            expected,
        }))
    }

    /// Drop all buffered bytes and return to seeking.
    pub fn reset(&mut self) {
        self.buf.clear();
        self.noise.clear();
    }
}

impl Default for FrameSynchronizer {
    fn default() -> Self {
        Self::new(SyncConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use bytes::BytesMut;

    use super::*;
    use crate::codec::encode_frame;
    use crate::command::{Command, Mode};
    use crate::crc::crc16;

    fn frame(command: u8, payload: &[u8]) -> Vec<u8> {
        let mut buf = BytesMut::new();
        encode_frame(
            FramingPolicy::Inclusive,
            DEFAULT_SENTINEL,
            [0x00, 0x00],
            command,
            payload,
            &mut buf,
        )
        .unwrap();
        buf.to_vec()
    }

    #[test]
    fn single_frame() {
        let mut sync = FrameSynchronizer::default();
        let events = sync.feed(&frame(0x01, &[0x01, 0x01]));
        assert_eq!(events.len(), 1);
        let frame = events[0].as_ref().unwrap();
        assert_eq!(
            frame.command(),
            Command::Power {
                on: true,
                mode: Mode::Cool
            }
        );
        assert_eq!(sync.state(), SyncState::Seeking);
    }

    #[test]
    fn inclusive_policy_fixture() {
        // Power ON / Cool with LEN = 0x07 and nine bytes on the wire,
        // i.e. total = LEN + 2. Replace with a bench capture per installation.
        let wire = [0xAA, 0x07, 0x00, 0x00, 0x01, 0x01, 0x01, 0x81, 0x2D];
        let mut sync = FrameSynchronizer::default();
        let events = sync.feed(&wire);
        assert_eq!(events.len(), 1);
        assert!(events[0].is_ok());

        let mut other = FrameSynchronizer::new(SyncConfig {
            policy: FramingPolicy::PayloadOnly,
            ..SyncConfig::default()
        });
        assert!(other.feed(&wire).is_empty());
        assert_eq!(other.state(), SyncState::Body { expected: 11 });
    }

    #[test]
    fn payload_only_policy() {
        let mut buf = BytesMut::new();
        encode_frame(
            FramingPolicy::PayloadOnly,
            DEFAULT_SENTINEL,
            [0x01, 0x02],
            0x02,
            &[22],
            &mut buf,
        )
        .unwrap();
        let mut sync = FrameSynchronizer::new(SyncConfig {
            policy: FramingPolicy::PayloadOnly,
            ..SyncConfig::default()
        });
        let events = sync.feed(&buf);
        assert_eq!(events.len(), 1);
        assert_eq!(
            events[0].as_ref().unwrap().command(),
            Command::SetTemperature(22)
        );
    }

    #[test]
    fn garbage_before_sentinel_is_skipped() {
        let mut sync = FrameSynchronizer::default();
        let mut wire = vec![0x00, 0x13, 0x55];
        wire.extend(frame(0x10, &[]));
        let events = sync.feed(&wire);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].as_ref().unwrap().command(), Command::StatusRequest);
    }

    #[test]
    fn long_noise_is_reported() {
        let mut sync = FrameSynchronizer::default();
        let noise = vec![0x11; DEFAULT_NOISE_THRESHOLD + 1];
        let events = sync.feed(&noise);
        assert_eq!(events.len(), 1);
        match &events[0] {
            Err(FrameError::Unsynchronized { noise: bytes }) => {
                assert_eq!(bytes.len(), DEFAULT_NOISE_THRESHOLD + 1)
            }
            other => panic!("unexpected event: {other:?}"),
        }
        // The next run starts counting from zero.
        assert!(sync.feed(&[0x11; 4]).is_empty());
    }

    #[test]
    fn crc_mismatch_then_recovery() {
        let mut bad = frame(0x02, &[24]);
        let last = bad.len() - 1;
        bad[last] ^= 0x01;
        let good = frame(0x11, &[]);

        let mut sync = FrameSynchronizer::default();
        let mut wire = bad.clone();
        wire.extend(&good);
        let events = sync.feed(&wire);

        assert_eq!(events.len(), 2);
        match &events[0] {
            Err(FrameError::CrcMismatch {
                frame,
                received,
                computed,
            }) => {
                assert_eq!(frame.as_ref(), bad.as_slice());
                assert_eq!(*computed, crc16(&bad[..bad.len() - 2]));
                assert_ne!(received, computed);
            }
            other => panic!("unexpected event: {other:?}"),
        }
        assert_eq!(events[1].as_ref().unwrap().command(), Command::StatusReply);
    }

    #[test]
    fn bytes_after_frame_must_be_sentinel() {
        let mut sync = FrameSynchronizer::default();
        let mut wire = frame(0x10, &[]);
        // Trailing junk that happens to look like a header is not salvaged.
        wire.extend([0x05, 0xAA]);
        let events = sync.feed(&wire);
        assert_eq!(events.len(), 1);
        assert_eq!(sync.state(), SyncState::Header);
    }

    #[test]
    fn invalid_declared_length() {
        let mut sync = FrameSynchronizer::default();
        let events = sync.feed(&[0xAA, 0x01]);
        assert_eq!(events.len(), 1);
        assert!(matches!(
            events[0],
            Err(FrameError::InvalidLength { declared: 1, .. })
        ));
        assert_eq!(sync.state(), SyncState::Seeking);
    }

    #[test]
    fn overflow_guard_discards_and_resyncs() {
        let config = SyncConfig {
            max_pending: 16,
            ..SyncConfig::default()
        };
        let mut sync = FrameSynchronizer::new(config);
        // Declares a 202-byte frame, which can never fit.
        let mut wire = vec![0xAA, 200];
        wire.extend(vec![0x00; 15]);
        let events = sync.feed(&wire);
        assert_eq!(events.len(), 1);
        match &events[0] {
            Err(FrameError::Overflow { discarded }) => assert_eq!(discarded.len(), 17),
            other => panic!("unexpected event: {other:?}"),
        }
        assert_eq!(sync.pending(), 0);

        let events = sync.feed(&frame(0x10, &[]));
        assert!(events[0].is_ok());
    }

    #[test]
    fn pending_never_exceeds_guard() {
        let config = SyncConfig {
            max_pending: 32,
            ..SyncConfig::default()
        };
        let mut sync = FrameSynchronizer::new(config);
        let mut seed = 0x1234_5678u32;
        for _ in 0..20_000 {
            seed ^= seed << 13;
            seed ^= seed >> 17;
            seed ^= seed << 5;
            let byte = if seed % 7 == 0 { 0xAA } else { seed as u8 };
            let _ = sync.push(byte);
            assert!(sync.pending() <= config.max_pending);
        }
    }

    #[test]
    fn finish_reports_truncated_frame() {
        let mut sync = FrameSynchronizer::default();
        let wire = frame(0x01, &[0x01, 0x02]);
        assert!(sync.feed(&wire[..5]).is_empty());
        match sync.finish() {
            Some(Err(FrameError::Truncated { partial, expected })) => {
                assert_eq!(partial.len(), 5);
                assert_eq!(expected, wire.len());
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(sync.state(), SyncState::Seeking);
        assert!(sync.finish().is_none());
    }

    #[test]
    fn frames_split_across_feeds() {
        let wire = frame(0x03, &[0x02]);
        let mut sync = FrameSynchronizer::default();
        assert!(sync.feed(&wire[..3]).is_empty());
        let events = sync.feed(&wire[3..]);
        assert_eq!(events.len(), 1);
        assert!(events[0].is_ok());
    }

    #[test]
    fn reset_drops_partial_state() {
        let mut sync = FrameSynchronizer::default();
        sync.feed(&[0x01, 0xAA, 0x09]);
        assert_eq!(sync.pending(), 2);
        sync.reset();
        assert_eq!(sync.state(), SyncState::Seeking);
        assert!(sync.finish().is_none());
    }
}
