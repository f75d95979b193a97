use buswatch_filter::FilterStats;
use buswatch_frame::FrameError;

/// Running counters for one pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineStats {
    /// Bytes ingested.
    pub bytes: u64,
    /// Bursts closed by the segmenter.
    pub bursts: u64,
    /// Bursts cut by the length or age ceiling.
    pub forced_closes: u64,
    /// CRC-valid frames, before filtering.
    pub frames: u64,
    pub crc_errors: u64,
    pub unsynchronized: u64,
    pub overflows: u64,
    pub truncated: u64,
    pub invalid_length: u64,
    /// Events handed to the sink, diagnostics included.
    pub emitted: u64,
    /// Noise filter counters.
    pub filter: FilterStats,
}

impl PipelineStats {
    pub(crate) fn record_diagnostic(&mut self, error: &FrameError) {
        match error {
            FrameError::CrcMismatch { .. } => self.crc_errors += 1,
            FrameError::Unsynchronized { .. } => self.unsynchronized += 1,
            FrameError::Overflow { .. } => self.overflows += 1,
            FrameError::Truncated { .. } => self.truncated += 1,
            FrameError::InvalidLength { .. } => self.invalid_length += 1,
            FrameError::TooShort { .. } | FrameError::PayloadTooLarge { .. } => {}
        }
    }

    /// All diagnostics raised so far.
    pub fn diagnostics(&self) -> u64 {
        self.crc_errors + self.unsynchronized + self.overflows + self.truncated + self.invalid_length
    }
}
