use buswatch_source::{ByteSource, Clock};

use crate::config::PipelineConfig;
use crate::error::Result;
use crate::lifecycle::Lifecycle;
use crate::pipeline::Pipeline;
use crate::sink::EventSink;
use crate::stats::PipelineStats;

/// Drives a [`Pipeline`] from a byte source and a clock.
///
/// The sniffer is cooperative. Each [`poll`](Self::poll) consumes at most
/// `max_bytes_per_poll` bytes that are already available, timestamps each
/// one, lets the time-based rules fire and returns. It is up to the caller
/// to call it again.
pub struct Sniffer<S, C, K, L = ()> {
    source: S,
    clock: C,
    pipeline: Pipeline<K>,
    lifecycle: L,
    config: PipelineConfig,
    running: bool,
}

impl<S, C, K> Sniffer<S, C, K>
where
    S: ByteSource,
    C: Clock,
    K: EventSink,
{
    pub fn new(source: S, clock: C, sink: K, config: PipelineConfig) -> Result<Self> {
        Self::with_lifecycle(source, clock, sink, config, ())
    }
}

impl<S, C, K, L> Sniffer<S, C, K, L>
where
    S: ByteSource,
    C: Clock,
    K: EventSink,
    L: Lifecycle,
{
    /// Build a sniffer with start/stop hooks.
    pub fn with_lifecycle(
        source: S,
        clock: C,
        sink: K,
        config: PipelineConfig,
        lifecycle: L,
    ) -> Result<Self> {
        let pipeline = Pipeline::new(&config, sink)?;
        Ok(Self {
            source,
            clock,
            pipeline,
            lifecycle,
            config,
            running: false,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn pipeline(&self) -> &Pipeline<K> {
        &self.pipeline
    }

    pub fn sink(&self) -> &K {
        self.pipeline.sink()
    }

    pub fn sink_mut(&mut self) -> &mut K {
        self.pipeline.sink_mut()
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    pub fn lifecycle(&self) -> &L {
        &self.lifecycle
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Run the start hook. Calling it twice has no effect.
    pub fn start(&mut self) {
        if self.running {
            return;
        }
        self.running = true;
        tracing::info!(
            mode = %self.config.mode,
            policy = %self.config.sync.policy,
            "sniffer started"
        );
        self.lifecycle.on_start(&self.config);
    }

    /// Consume what the source has ready. Returns the number of bytes read.
    ///
    /// An empty source is not an error; the only failures come from the
    /// source itself. Starts the sniffer if needed.
    pub fn poll(&mut self) -> Result<usize> {
        self.start();

        let budget = self.source.available()?.min(self.config.max_bytes_per_poll);
        let mut read = 0;
        while read < budget {
            let Some(byte) = self.source.read_byte()? else {
                break;
            };
            let now = self.clock.now_micros();
            self.pipeline.ingest(byte, now);
            read += 1;
        }

        self.pipeline.tick(self.clock.now_micros());
        Ok(read)
    }

    /// Flush buffered state, run the stop hook and return final counters.
    pub fn stop(&mut self) -> PipelineStats {
        self.pipeline.finish();
        let stats = self.pipeline.stats();
        if self.running {
            self.running = false;
            tracing::info!(
                bytes = stats.bytes,
                emitted = stats.emitted,
                diagnostics = stats.diagnostics(),
                "sniffer stopped"
            );
            self.lifecycle.on_stop(&stats);
        }
        stats
    }

    /// Stop and hand back the sink.
    pub fn into_sink(mut self) -> K {
        self.stop();
        self.pipeline.into_sink()
    }
}
