//! Noise suppression for captured bus traffic.
//!
//! A shared bus carries a steady background of polls and status beacons.
//! [`FilterChain`] runs each captured unit through an ordered list of
//! independent [`NoiseStage`]s and reports whether it is worth emitting.

pub mod byteset;
pub mod chain;
pub mod config;
pub mod novelty;
pub mod stage;

pub use byteset::ByteSet;
pub use chain::{FilterChain, FilterStats, Verdict};
pub use config::{FilterConfig, DEFAULT_LIKELY_TAILS};
pub use novelty::NoveltyCache;
pub use stage::{
    ChatterWindow, Decision, FrameLikelihood, IdleBytes, MinLength, NoiseStage, RecencyDedupe,
    StageKind,
};
