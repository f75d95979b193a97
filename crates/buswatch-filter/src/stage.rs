use std::collections::HashMap;

use buswatch_source::{elapsed, Micros};
use bytes::Bytes;

use crate::byteset::ByteSet;

/// Identifies a stage, for statistics and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageKind {
    MinLength,
    IdleBytes,
    FrameLikelihood,
    RecencyDedupe,
    ChatterWindow,
}

impl StageKind {
    pub const ALL: [StageKind; 5] = [
        StageKind::MinLength,
        StageKind::IdleBytes,
        StageKind::FrameLikelihood,
        StageKind::RecencyDedupe,
        StageKind::ChatterWindow,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            StageKind::MinLength => "min_length",
            StageKind::IdleBytes => "idle_bytes",
            StageKind::FrameLikelihood => "frame_likelihood",
            StageKind::RecencyDedupe => "recency_dedupe",
            StageKind::ChatterWindow => "chatter_window",
        }
    }

    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

/// Outcome of one stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Pass,
    Suppress,
}

/// One independent noise predicate.
///
/// `check` decides; `commit` is called on every stage once a unit has passed
/// the whole chain and is actually emitted.
pub trait NoiseStage {
    fn kind(&self) -> StageKind;

    fn check(&mut self, bytes: &Bytes, now: Micros) -> Decision;

    fn commit(&mut self, _bytes: &Bytes, _now: Micros) {}
}

fn suppress_if(cond: bool) -> Decision {
    if cond {
        Decision::Suppress
    } else {
        Decision::Pass
    }
}

/// Drops units below a length floor.
#[derive(Debug, Clone)]
pub struct MinLength {
    pub floor: usize,
}

impl NoiseStage for MinLength {
    fn kind(&self) -> StageKind {
        StageKind::MinLength
    }

    fn check(&mut self, bytes: &Bytes, _now: Micros) -> Decision {
        suppress_if(bytes.len() < self.floor)
    }
}

/// Drops short units made only of idle bytes.
#[derive(Debug, Clone)]
pub struct IdleBytes {
    pub set: ByteSet,
    pub max_len: usize,
}

impl NoiseStage for IdleBytes {
    fn kind(&self) -> StageKind {
        StageKind::IdleBytes
    }

    fn check(&mut self, bytes: &Bytes, _now: Micros) -> Decision {
        suppress_if(bytes.len() <= self.max_len && self.set.covers(bytes))
    }
}

/// Keeps only units that look like frames of some unknown protocol:
/// long enough, closed by a known tail byte, and not repetitive.
#[derive(Debug, Clone)]
pub struct FrameLikelihood {
    pub min_len: usize,
    pub tails: ByteSet,
}

impl FrameLikelihood {
    const DIVERSITY_CAP: usize = 6;
}

impl NoiseStage for FrameLikelihood {
    fn kind(&self) -> StageKind {
        StageKind::FrameLikelihood
    }

    fn check(&mut self, bytes: &Bytes, _now: Micros) -> Decision {
        if bytes.len() < self.min_len {
            return Decision::Suppress;
        }
        match bytes.last() {
            Some(&tail) if self.tails.contains(tail) => {}
            _ => return Decision::Suppress,
        }
        let wanted = Self::DIVERSITY_CAP.min(bytes.len() / 2);
        suppress_if(ByteSet::distinct(bytes) < wanted)
    }
}

/// Drops an exact repeat of the last emitted unit inside a time window.
#[derive(Debug, Clone)]
pub struct RecencyDedupe {
    window_us: Micros,
    last: Option<(Bytes, Micros)>,
}

impl RecencyDedupe {
    pub fn new(window_ms: u32) -> Self {
        Self {
            window_us: window_ms.saturating_mul(1000),
            last: None,
        }
    }
}

impl NoiseStage for RecencyDedupe {
    fn kind(&self) -> StageKind {
        StageKind::RecencyDedupe
    }

    fn check(&mut self, bytes: &Bytes, now: Micros) -> Decision {
        match &self.last {
            Some((last, at)) => suppress_if(last == bytes && elapsed(now, *at) < self.window_us),
            None => Decision::Pass,
        }
    }

    fn commit(&mut self, bytes: &Bytes, now: Micros) {
        self.last = Some((bytes.clone(), now));
    }
}

/// Caps how often any one signature may be emitted per window.
///
/// The whole table is dropped when the window expires; there is no
/// per-entry aging. Once `max_signatures` distinct units are tracked, new
/// ones pass untracked until the next reset.
#[derive(Debug, Clone)]
pub struct ChatterWindow {
    threshold: u32,
    window_us: Micros,
    max_signatures: usize,
    window_start: Option<Micros>,
    counts: HashMap<Bytes, u32>,
}

impl ChatterWindow {
    pub fn new(threshold: u32, window_ms: u32, max_signatures: usize) -> Self {
        Self {
            threshold,
            window_us: window_ms.saturating_mul(1000),
            max_signatures,
            window_start: None,
            counts: HashMap::new(),
        }
    }

    /// Signatures counted in the current window.
    pub fn tracked(&self) -> usize {
        self.counts.len()
    }

    fn roll(&mut self, now: Micros) {
        match self.window_start {
            Some(start) if elapsed(now, start) < self.window_us => {}
            _ => {
                if !self.counts.is_empty() {
                    tracing::debug!(signatures = self.counts.len(), "chatter window reset");
                }
                self.counts.clear();
                self.window_start = Some(now);
            }
        }
    }
}

impl NoiseStage for ChatterWindow {
    fn kind(&self) -> StageKind {
        StageKind::ChatterWindow
    }

    fn check(&mut self, bytes: &Bytes, now: Micros) -> Decision {
        self.roll(now);

        if let Some(count) = self.counts.get_mut(bytes) {
            let saturated = *count >= self.threshold;
            *count = count.saturating_add(1);
            return suppress_if(saturated);
        }

        if self.counts.len() < self.max_signatures {
            self.counts.insert(bytes.clone(), 1);
        }
        suppress_if(self.threshold == 0)
    }
}
