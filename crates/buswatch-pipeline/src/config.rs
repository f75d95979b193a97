use std::fmt;
use std::str::FromStr;

use buswatch_filter::FilterConfig;
use buswatch_frame::{SyncConfig, MIN_FRAME_LEN};

use crate::error::{PipelineError, Result};
use crate::segment::SegmenterConfig;

/// Default cap on bytes consumed by one [`Sniffer::poll`](crate::Sniffer::poll).
pub const DEFAULT_MAX_BYTES_PER_POLL: usize = 256;

/// What the pipeline does with incoming bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CaptureMode {
    /// Emit timing-delimited bursts without protocol decoding.
    #[default]
    Raw,
    /// Decode frames inside each burst. Line silence ends a partial frame.
    Bursts,
    /// Decode frames from the continuous byte stream. No segmentation.
    Stream,
}

impl CaptureMode {
    pub fn as_str(self) -> &'static str {
        match self {
            CaptureMode::Raw => "raw",
            CaptureMode::Bursts => "bursts",
            CaptureMode::Stream => "stream",
        }
    }

    /// Modes that run the frame synchronizer.
    pub fn is_protocol(self) -> bool {
        !matches!(self, CaptureMode::Raw)
    }
}

impl fmt::Display for CaptureMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CaptureMode {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "raw" => Ok(CaptureMode::Raw),
            "bursts" | "burst" => Ok(CaptureMode::Bursts),
            "stream" => Ok(CaptureMode::Stream),
            other => Err(PipelineError::InvalidConfig(format!(
                "unknown capture mode '{other}' (expected raw, bursts or stream)"
            ))),
        }
    }
}

/// Everything needed to build a [`Pipeline`](crate::Pipeline).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    pub mode: CaptureMode,
    pub segmenter: SegmenterConfig,
    pub sync: SyncConfig,
    pub filter: FilterConfig,
    /// Bytes consumed per poll at most.
    pub max_bytes_per_poll: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            mode: CaptureMode::default(),
            segmenter: SegmenterConfig::default(),
            sync: SyncConfig::default(),
            filter: FilterConfig::default(),
            max_bytes_per_poll: DEFAULT_MAX_BYTES_PER_POLL,
        }
    }
}

impl PipelineConfig {
    pub fn new(mode: CaptureMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    /// Reject values that would stall or unbound the pipeline.
    pub fn validate(&self) -> Result<()> {
        if self.segmenter.idle_gap_us == 0 {
            return Err(invalid("idle gap must be greater than 0 us"));
        }
        if self.segmenter.max_burst_len == 0 {
            return Err(invalid("max burst length must be at least 1"));
        }
        if self.segmenter.max_burst_age_us < self.segmenter.idle_gap_us {
            return Err(invalid(format!(
                "max burst age ({} us) must not be shorter than the idle gap ({} us)",
                self.segmenter.max_burst_age_us, self.segmenter.idle_gap_us
            )));
        }
        if self.sync.max_pending < MIN_FRAME_LEN {
            return Err(invalid(format!(
                "max pending must be at least {MIN_FRAME_LEN} bytes"
            )));
        }
        if self.max_bytes_per_poll == 0 {
            return Err(invalid("max bytes per poll must be at least 1"));
        }
        if self.filter.chatter_threshold > 0 && self.filter.chatter_window_ms == 0 {
            return Err(invalid("chatter window must be greater than 0 ms"));
        }
        if self.filter.idle_filter && self.filter.idle_bytes.is_empty() {
            return Err(invalid("idle filter enabled with an empty idle-byte set"));
        }
        Ok(())
    }
}

fn invalid(msg: impl Into<String>) -> PipelineError {
    PipelineError::InvalidConfig(msg.into())
}
