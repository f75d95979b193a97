use buswatch_source::Micros;
use bytes::Bytes;

use crate::config::FilterConfig;
use crate::novelty::NoveltyCache;
use crate::stage::{
    ChatterWindow, Decision, FrameLikelihood, IdleBytes, MinLength, NoiseStage, RecencyDedupe,
    StageKind,
};

/// Result of running a unit through the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Emit the unit. `novel` is set when it was not seen recently.
    Emit { novel: bool },
    /// Dropped by the named stage.
    Suppressed(StageKind),
}

impl Verdict {
    pub fn is_emit(&self) -> bool {
        matches!(self, Verdict::Emit { .. })
    }
}

/// Counters kept by a [`FilterChain`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterStats {
    pub evaluated: u64,
    pub emitted: u64,
    pub novel: u64,
    suppressed: [u64; 5],
}

impl FilterStats {
    pub fn suppressed_by(&self, kind: StageKind) -> u64 {
        self.suppressed[kind.index()]
    }

    pub fn suppressed_total(&self) -> u64 {
        self.suppressed.iter().sum()
    }
}

/// Ordered list of noise stages; the first to object wins.
pub struct FilterChain {
    stages: Vec<Box<dyn NoiseStage>>,
    novelty: NoveltyCache,
    stats: FilterStats,
}

impl FilterChain {
    /// Build the enabled stages from configuration, in their fixed order:
    /// min length, idle bytes, frame likelihood, dedupe, chatter.
    pub fn new(config: &FilterConfig) -> Self {
        let mut stages: Vec<Box<dyn NoiseStage>> = vec![Box::new(MinLength {
            floor: config.min_len,
        })];

        if config.idle_filter {
            stages.push(Box::new(IdleBytes {
                set: config.idle_bytes,
                max_len: config.idle_max_len,
            }));
        }
        if config.frame_likelihood {
            stages.push(Box::new(FrameLikelihood {
                min_len: config.likely_min_len,
                tails: config.likely_tails,
            }));
        }
        if config.dedupe_window_ms > 0 {
            stages.push(Box::new(RecencyDedupe::new(config.dedupe_window_ms)));
        }
        if config.chatter_threshold > 0 {
            stages.push(Box::new(ChatterWindow::new(
                config.chatter_threshold,
                config.chatter_window_ms,
                config.max_signatures,
            )));
        }

        let chain = Self::with_stages(
            stages,
            NoveltyCache::new(config.novelty_capacity, config.novelty_max_len),
        );
        tracing::debug!(stages = ?chain.stage_kinds(), "noise filter configured");
        chain
    }

    /// Assemble a chain from explicit stages.
    pub fn with_stages(stages: Vec<Box<dyn NoiseStage>>, novelty: NoveltyCache) -> Self {
        Self {
            stages,
            novelty,
            stats: FilterStats::default(),
        }
    }

    pub fn stage_kinds(&self) -> Vec<StageKind> {
        self.stages.iter().map(|s| s.kind()).collect()
    }

    pub fn stats(&self) -> &FilterStats {
        &self.stats
    }

    /// Decide whether `bytes`, observed at `now`, should be emitted.
    ///
    /// A unit that passes is committed to every stage's memory.
    pub fn evaluate(&mut self, bytes: &Bytes, now: Micros) -> Verdict {
        self.stats.evaluated += 1;
        let novel = self.novelty.observe(bytes);

        for stage in self.stages.iter_mut() {
            if stage.check(bytes, now) == Decision::Suppress {
                let kind = stage.kind();
                self.stats.suppressed[kind.index()] += 1;
                tracing::trace!(stage = kind.as_str(), len = bytes.len(), "suppressed");
                return Verdict::Suppressed(kind);
            }
        }

        for stage in self.stages.iter_mut() {
            stage.commit(bytes, now);
        }
        self.stats.emitted += 1;
        if novel {
            self.stats.novel += 1;
        }
        Verdict::Emit { novel }
    }
}
