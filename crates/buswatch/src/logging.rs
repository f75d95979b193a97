use clap::ValueEnum;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Crates whose events follow `--log-level`. Everything else (serial port
/// drivers, signal handling) is held at warn.
const BUSWATCH_TARGETS: [&str; 5] = [
    "buswatch",
    "buswatch_source",
    "buswatch_frame",
    "buswatch_filter",
    "buswatch_pipeline",
];

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_filter(self) -> LevelFilter {
        match self {
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }

    /// Per-layer targets are only worth printing once burst and frame
    /// boundaries are being logged.
    fn shows_targets(self) -> bool {
        matches!(self, LogLevel::Debug | LogLevel::Trace)
    }
}

fn log_targets(level: LogLevel) -> Targets {
    let ours = level.as_filter();
    BUSWATCH_TARGETS
        .iter()
        .fold(Targets::new().with_default(LevelFilter::WARN.min(ours)), |t, name| {
            t.with_target(*name, ours)
        })
}

/// Diagnostics go to stderr so stdout stays clean for captured events.
pub fn init_logging(format: LogFormat, level: LogLevel) {
    let fmt = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(level.shows_targets());
    let registry = tracing_subscriber::registry().with(log_targets(level));

    match format {
        LogFormat::Text => {
            let _ = registry.with(fmt).try_init();
        }
        LogFormat::Json => {
            let _ = registry.with(fmt.json()).try_init();
        }
    }
}

#[cfg(test)]
mod tests {
    use tracing::Level;

    use super::*;

    #[test]
    fn buswatch_crates_follow_the_requested_level() {
        let targets = log_targets(LogLevel::Trace);
        assert!(targets.would_enable("buswatch_pipeline::pipeline", &Level::TRACE));
        assert!(targets.would_enable("buswatch_frame::sync", &Level::DEBUG));
        assert!(!targets.would_enable("serialport::posix", &Level::DEBUG));
        assert!(targets.would_enable("serialport::posix", &Level::WARN));
    }

    #[test]
    fn quiet_levels_also_quiet_dependencies() {
        let targets = log_targets(LogLevel::Error);
        assert!(!targets.would_enable("serialport", &Level::WARN));
        assert!(!targets.would_enable("buswatch_filter::chain", &Level::WARN));
        assert!(targets.would_enable("buswatch", &Level::ERROR));
    }
}
