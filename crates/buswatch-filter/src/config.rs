use crate::byteset::ByteSet;

/// Tail bytes that commonly close a frame on unknown protocols.
pub const DEFAULT_LIKELY_TAILS: [u8; 2] = [0x7E, 0xFE];

/// Controls which noise stages run and how they are tuned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterConfig {
    /// Units shorter than this are dropped. 1 only drops empty units.
    pub min_len: usize,
    /// Enable idle-byte suppression.
    pub idle_filter: bool,
    /// Byte values considered background chatter.
    pub idle_bytes: ByteSet,
    /// Only units of at most this many bytes are checked against the idle set.
    pub idle_max_len: usize,
    /// Enable the frame-likelihood heuristic (raw capture only).
    pub frame_likelihood: bool,
    /// Accepted final bytes for the frame-likelihood heuristic.
    pub likely_tails: ByteSet,
    /// Units shorter than this are never frame-like.
    pub likely_min_len: usize,
    /// Identical repeats of the last emitted unit are dropped inside this
    /// window. 0 disables.
    pub dedupe_window_ms: u32,
    /// Emissions allowed per signature per window. 0 disables.
    pub chatter_threshold: u32,
    /// Length of the chatter counting window.
    pub chatter_window_ms: u32,
    /// Maximum distinct signatures tracked per window.
    pub max_signatures: usize,
    /// Remembered short units for novelty marking.
    pub novelty_capacity: usize,
    /// Units longer than this are not tracked for novelty.
    pub novelty_max_len: usize,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            min_len: 1,
            idle_filter: false,
            idle_bytes: ByteSet::new(),
            idle_max_len: 8,
            frame_likelihood: false,
            likely_tails: DEFAULT_LIKELY_TAILS.into_iter().collect(),
            likely_min_len: 10,
            dedupe_window_ms: 1000,
            chatter_threshold: 10,
            chatter_window_ms: 5000,
            max_signatures: 1024,
            novelty_capacity: 32,
            novelty_max_len: 16,
        }
    }
}
