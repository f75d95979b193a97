use buswatch_filter::{FilterChain, Verdict};
use buswatch_frame::{Frame, FrameError, FrameSynchronizer};
use buswatch_source::{elapsed, Micros};

use crate::config::{CaptureMode, PipelineConfig};
use crate::error::Result;
use crate::event::SnifferEvent;
use crate::segment::{Burst, Segmenter};
use crate::sink::EventSink;
use crate::stats::PipelineStats;

/// Segmenter, synchronizer and noise filter wired together for one mode.
///
/// The pipeline is clock-agnostic: every call carries its own timestamp.
/// It never blocks and never fails once built; everything it learns goes to
/// the sink.
pub struct Pipeline<K> {
    mode: CaptureMode,
    segmenter: Segmenter,
    sync: FrameSynchronizer,
    filter: FilterChain,
    sink: K,
    stats: PipelineStats,
    last_us: Micros,
    /// Line silence after which a partial frame is abandoned.
    stale_frame_us: Micros,
}

impl<K: EventSink> Pipeline<K> {
    pub fn new(config: &PipelineConfig, sink: K) -> Result<Self> {
        config.validate()?;

        let mut filter_config = config.filter.clone();
        if config.mode.is_protocol() && filter_config.frame_likelihood {
            tracing::warn!(
                mode = %config.mode,
                "frame likelihood only applies to raw capture, disabling it"
            );
            filter_config.frame_likelihood = false;
        }

        tracing::debug!(
            mode = %config.mode,
            policy = %config.sync.policy,
            idle_gap_us = config.segmenter.idle_gap_us,
            "pipeline configured"
        );

        Ok(Self {
            mode: config.mode,
            segmenter: Segmenter::new(config.segmenter),
            sync: FrameSynchronizer::new(config.sync),
            filter: FilterChain::new(&filter_config),
            sink,
            stats: PipelineStats::default(),
            last_us: 0,
            stale_frame_us: match config.mode {
                CaptureMode::Stream => config.segmenter.max_burst_age_us,
                _ => config.segmenter.idle_gap_us,
            },
        })
    }

    pub fn mode(&self) -> CaptureMode {
        self.mode
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut K {
        &mut self.sink
    }

    pub fn into_sink(self) -> K {
        self.sink
    }

    /// Snapshot of the counters, filter included.
    pub fn stats(&self) -> PipelineStats {
        PipelineStats {
            filter: self.filter.stats().clone(),
            ..self.stats.clone()
        }
    }

    /// Bytes buffered in the segmenter and synchronizer.
    pub fn pending(&self) -> usize {
        self.segmenter.pending() + self.sync.pending()
    }

    /// Process one byte received at `now`.
    pub fn ingest(&mut self, byte: u8, now: Micros) {
        self.expire_partial_frame(now);
        self.stats.bytes += 1;
        self.last_us = now;

        if self.mode == CaptureMode::Stream {
            if let Some(result) = self.sync.push(byte) {
                self.on_frame(result, now);
            }
            return;
        }

        if let Some(burst) = self.segmenter.ingest(byte, now) {
            self.on_burst(burst);
        }
    }

    /// Process a run of bytes that all arrived at `now`.
    pub fn ingest_all(&mut self, bytes: &[u8], now: Micros) {
        for &byte in bytes {
            self.ingest(byte, now);
        }
    }

    /// Let time-based rules fire without new input.
    pub fn tick(&mut self, now: Micros) {
        if self.mode != CaptureMode::Stream {
            if let Some(burst) = self.segmenter.tick(now) {
                self.on_burst(burst);
            }
        }
        self.expire_partial_frame(now);
    }

    /// End of capture: close the open burst and any partial frame.
    pub fn finish(&mut self) {
        if self.mode != CaptureMode::Stream {
            if let Some(burst) = self.segmenter.flush() {
                self.on_burst(burst);
            }
        }
        // Also covers a frame left open by a forced cut in bursts mode.
        if self.mode.is_protocol() {
            if let Some(result) = self.sync.finish() {
                self.on_frame(result, self.last_us);
            }
        }
    }

    /// Report a partial frame as truncated once nothing has arrived for
    /// `stale_frame_us`.
    ///
    /// In bursts mode this ends frames left open by a length or age cut,
    /// since no later burst close will. Stream mode uses the burst age
    /// ceiling, so frames may still span ordinary gaps.
    fn expire_partial_frame(&mut self, now: Micros) {
        if !self.mode.is_protocol() || self.sync.pending() == 0 || self.segmenter.pending() > 0 {
            return;
        }
        if elapsed(now, self.last_us) > self.stale_frame_us {
            if let Some(result) = self.sync.finish() {
                self.on_frame(result, self.last_us);
            }
        }
    }

    fn on_burst(&mut self, burst: Burst) {
        self.stats.bursts += 1;
        if burst.closed_by.is_forced() {
            self.stats.forced_closes += 1;
        }
        tracing::debug!(
            len = burst.len(),
            duration_us = burst.duration_us(),
            closed_by = %burst.closed_by,
            "burst closed"
        );

        if self.mode == CaptureMode::Raw {
            if let Verdict::Emit { novel } = self.filter.evaluate(&burst.bytes, burst.end_us) {
                self.emit(SnifferEvent::Burst { burst, novel });
            }
            return;
        }

        let at = burst.end_us;
        for result in self.sync.feed(&burst.bytes) {
            self.on_frame(result, at);
        }
        // A length or age cut is not line silence; the frame may continue.
        if !burst.closed_by.is_forced() {
            if let Some(result) = self.sync.finish() {
                self.on_frame(result, at);
            }
        }
    }

    fn on_frame(&mut self, result: buswatch_frame::Result<Frame>, at: Micros) {
        match result {
            Ok(frame) => {
                self.stats.frames += 1;
                let bytes = frame.bytes();
                if let Verdict::Emit { novel } = self.filter.evaluate(&bytes, at) {
                    let command = frame.command();
                    tracing::debug!(%command, len = frame.len(), novel, "frame");
                    self.emit(SnifferEvent::Frame {
                        frame,
                        command,
                        at,
                        novel,
                    });
                }
            }
            Err(error) => self.on_diagnostic(error, at),
        }
    }

    fn on_diagnostic(&mut self, error: FrameError, at: Micros) {
        self.stats.record_diagnostic(&error);
        match &error {
            FrameError::CrcMismatch { .. } | FrameError::Overflow { .. } => {
                tracing::warn!(kind = error.kind(), "{error}");
            }
            _ => tracing::debug!(kind = error.kind(), "{error}"),
        }
        self.emit(SnifferEvent::Diagnostic { error, at });
    }

    fn emit(&mut self, event: SnifferEvent) {
        self.stats.emitted += 1;
        self.sink.emit(event);
    }
}
