//! The buswatch capture pipeline.
//!
//! Bytes flow through three stages on a single thread:
//! - the [`Segmenter`] cuts the stream into bursts on line silence
//! - the frame synchronizer recovers CRC-checked frames (protocol modes)
//! - the noise filter decides what reaches the [`EventSink`]
//!
//! [`Pipeline`] owns that state and takes explicit timestamps.
//! [`Sniffer`] drives it from a [`ByteSource`](buswatch_source::ByteSource)
//! and a [`Clock`](buswatch_source::Clock).

pub mod config;
pub mod error;
pub mod event;
pub mod lifecycle;
pub mod pipeline;
pub mod segment;
pub mod sink;
pub mod sniffer;
pub mod stats;

pub use config::{CaptureMode, PipelineConfig, DEFAULT_MAX_BYTES_PER_POLL};
pub use error::{PipelineError, Result};
pub use event::SnifferEvent;
pub use lifecycle::Lifecycle;
pub use pipeline::Pipeline;
pub use segment::{
    Burst, CloseReason, Segmenter, SegmenterConfig, DEFAULT_IDLE_GAP_US, DEFAULT_MAX_BURST_AGE_US,
    DEFAULT_MAX_BURST_LEN,
};
pub use sink::{EventSink, FnSink, NullSink};
pub use sniffer::Sniffer;
pub use stats::PipelineStats;
