//! Passive sniffer for shared serial buses.
//!
//! buswatch listens to a noisy RS-485 style link and turns the byte stream
//! into timing-delimited bursts, CRC-checked frames and diagnostics, with
//! background chatter filtered out.
//!
//! # Crate Structure
//!
//! - [`source`]: byte source and clock traits, reader adapters
//! - [`frame`]: CRC, framing policy, frame synchronizer, command decoder
//! - [`filter`]: noise stages and the filter chain
//! - [`pipeline`]: burst segmenter, pipeline and sniffer

/// Re-export source types.
pub mod source {
    pub use buswatch_source::*;
}

/// Re-export frame types.
pub mod frame {
    pub use buswatch_frame::*;
}

/// Re-export filter types.
pub mod filter {
    pub use buswatch_filter::*;
}

/// Re-export pipeline types.
pub mod pipeline {
    pub use buswatch_pipeline::*;
}

pub use buswatch_pipeline::{
    CaptureMode, EventSink, Pipeline, PipelineConfig, PipelineError, PipelineStats, Sniffer,
    SnifferEvent,
};
