use crate::config::PipelineConfig;
use crate::stats::PipelineStats;

/// Hooks run when a [`Sniffer`](crate::Sniffer) starts and stops.
///
/// Both default to doing nothing; `()` is the no-op lifecycle.
pub trait Lifecycle {
    fn on_start(&mut self, _config: &PipelineConfig) {}

    fn on_stop(&mut self, _stats: &PipelineStats) {}
}

impl Lifecycle for () {}

impl<L: Lifecycle + ?Sized> Lifecycle for &mut L {
    fn on_start(&mut self, config: &PipelineConfig) {
        (**self).on_start(config);
    }

    fn on_stop(&mut self, stats: &PipelineStats) {
        (**self).on_stop(stats);
    }
}
