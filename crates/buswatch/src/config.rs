use std::fs;
use std::path::{Path, PathBuf};

use buswatch_filter::ByteSet;
use buswatch_frame::FramingPolicy;
use buswatch_pipeline::{CaptureMode, PipelineConfig, PipelineError};
use serde::Deserialize;

use crate::cmd::PipelineArgs;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("invalid byte value '{0}' (expected 0-255 or 0x00-0xFF)")]
    InvalidByte(String),

    #[error("{0}")]
    Invalid(String),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

/// A byte given either as a JSON number or as a decimal/hex string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum ByteValue {
    Number(u8),
    Text(String),
}

impl ByteValue {
    fn resolve(&self) -> Result<u8, ConfigError> {
        match self {
            ByteValue::Number(n) => Ok(*n),
            ByteValue::Text(s) => parse_byte(s),
        }
    }
}

/// On-disk configuration. Every field is optional; command-line flags win.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileConfig {
    mode: Option<String>,
    framing: Option<String>,
    sentinel: Option<ByteValue>,
    idle_gap_us: Option<u32>,
    max_burst_len: Option<usize>,
    max_burst_age_us: Option<u32>,
    max_pending: Option<usize>,
    noise_threshold: Option<usize>,
    max_bytes_per_poll: Option<usize>,
    min_len: Option<usize>,
    idle_filter: Option<bool>,
    idle_bytes: Option<Vec<ByteValue>>,
    idle_max_len: Option<usize>,
    frame_likelihood: Option<bool>,
    likely_tails: Option<Vec<ByteValue>>,
    likely_min_len: Option<usize>,
    dedupe_window_ms: Option<u32>,
    chatter_threshold: Option<u32>,
    chatter_window_ms: Option<u32>,
    max_signatures: Option<usize>,
    novelty_capacity: Option<usize>,
    novelty_max_len: Option<usize>,
}

/// Parse a byte from decimal (`24`) or hex (`0x18`).
pub fn parse_byte(input: &str) -> Result<u8, ConfigError> {
    let s = input.trim();
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => s.parse::<u8>(),
    };
    parsed.map_err(|_| ConfigError::InvalidByte(input.to_string()))
}

fn byte_set(values: &[ByteValue]) -> Result<ByteSet, ConfigError> {
    values.iter().map(ByteValue::resolve).collect()
}

/// Build the pipeline configuration: defaults, then the optional file, then
/// flags. The result is validated.
pub fn resolve(path: Option<&Path>, args: &PipelineArgs) -> Result<PipelineConfig, ConfigError> {
    let mut config = PipelineConfig::default();
    if let Some(path) = path {
        let file = load(path)?;
        apply_file(&mut config, file)?;
        tracing::debug!(path = %path.display(), "loaded config file");
    }
    apply_args(&mut config, args);
    config.validate()?;
    Ok(config)
}

fn load(path: &Path) -> Result<FileConfig, ConfigError> {
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn apply_file(config: &mut PipelineConfig, file: FileConfig) -> Result<(), ConfigError> {
    if let Some(mode) = file.mode {
        config.mode = mode.parse::<CaptureMode>()?;
    }
    if let Some(framing) = file.framing {
        config.sync.policy = framing
            .parse::<FramingPolicy>()
            .map_err(ConfigError::Invalid)?;
    }
    if let Some(sentinel) = file.sentinel {
        config.sync.sentinel = sentinel.resolve()?;
    }
    if let Some(bytes) = file.idle_bytes {
        config.filter.idle_bytes = byte_set(&bytes)?;
    }
    if let Some(tails) = file.likely_tails {
        config.filter.likely_tails = byte_set(&tails)?;
    }

    let seg = &mut config.segmenter;
    set(&mut seg.idle_gap_us, file.idle_gap_us);
    set(&mut seg.max_burst_len, file.max_burst_len);
    set(&mut seg.max_burst_age_us, file.max_burst_age_us);

    set(&mut config.sync.max_pending, file.max_pending);
    set(&mut config.sync.noise_threshold, file.noise_threshold);
    set(&mut config.max_bytes_per_poll, file.max_bytes_per_poll);

    let filter = &mut config.filter;
    set(&mut filter.min_len, file.min_len);
    set(&mut filter.idle_filter, file.idle_filter);
    set(&mut filter.idle_max_len, file.idle_max_len);
    set(&mut filter.frame_likelihood, file.frame_likelihood);
    set(&mut filter.likely_min_len, file.likely_min_len);
    set(&mut filter.dedupe_window_ms, file.dedupe_window_ms);
    set(&mut filter.chatter_threshold, file.chatter_threshold);
    set(&mut filter.chatter_window_ms, file.chatter_window_ms);
    set(&mut filter.max_signatures, file.max_signatures);
    set(&mut filter.novelty_capacity, file.novelty_capacity);
    set(&mut filter.novelty_max_len, file.novelty_max_len);
    Ok(())
}

fn apply_args(config: &mut PipelineConfig, args: &PipelineArgs) {
    set(&mut config.mode, args.mode);
    set(&mut config.sync.policy, args.framing);
    set(&mut config.sync.sentinel, args.sentinel);
    set(&mut config.segmenter.idle_gap_us, args.idle_gap_us);
    set(&mut config.segmenter.max_burst_len, args.max_burst);
    set(&mut config.segmenter.max_burst_age_us, args.max_age_us);

    let filter = &mut config.filter;
    set(&mut filter.min_len, args.min_len);
    set(&mut filter.dedupe_window_ms, args.dedupe_ms);
    set(&mut filter.idle_max_len, args.idle_max_len);
    set(&mut filter.chatter_threshold, args.chatter_threshold);
    set(&mut filter.chatter_window_ms, args.chatter_window_ms);
    if let Some(bytes) = &args.idle_bytes {
        filter.idle_bytes = bytes.iter().copied().collect();
        filter.idle_filter = true;
    }
    if args.idle_filter {
        filter.idle_filter = true;
    }
    if args.likelihood {
        filter.frame_likelihood = true;
    }
}

fn set<T>(slot: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *slot = value;
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn temp_config(tag: &str, body: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "buswatch-config-{tag}-{}.json",
            std::process::id()
        ));
        let mut file = fs::File::create(&path).expect("temp config should be creatable");
        file.write_all(body.as_bytes()).expect("temp config should be writable");
        path
    }

    #[test]
    fn parses_decimal_and_hex_bytes() {
        assert_eq!(parse_byte("24").unwrap(), 24);
        assert_eq!(parse_byte("0x18").unwrap(), 0x18);
        assert_eq!(parse_byte(" 0XFE ").unwrap(), 0xFE);
        assert!(matches!(parse_byte("256"), Err(ConfigError::InvalidByte(_))));
        assert!(parse_byte("0xZZ").is_err());
    }

    #[test]
    fn defaults_without_file_or_flags() {
        let config = resolve(None, &PipelineArgs::default()).unwrap();
        assert_eq!(config, PipelineConfig::default());
    }

    #[test]
    fn file_values_are_applied_then_overridden_by_flags() {
        let path = temp_config(
            "overlay",
            r#"{
                "mode": "bursts",
                "idle_gap_us": 2000,
                "idle_filter": true,
                "idle_bytes": [0, "0x06", "24"],
                "dedupe_window_ms": 500
            }"#,
        );
        let args = PipelineArgs {
            idle_gap_us: Some(3000),
            ..PipelineArgs::default()
        };
        let config = resolve(Some(&path), &args).unwrap();
        let _ = fs::remove_file(&path);

        assert_eq!(config.mode, CaptureMode::Bursts);
        assert_eq!(config.segmenter.idle_gap_us, 3000);
        assert!(config.filter.idle_filter);
        assert!(config.filter.idle_bytes.contains(0x00));
        assert!(config.filter.idle_bytes.contains(0x06));
        assert!(config.filter.idle_bytes.contains(0x18));
        assert_eq!(config.filter.idle_bytes.len(), 3);
        assert_eq!(config.filter.dedupe_window_ms, 500);
    }

    #[test]
    fn every_filter_knob_is_settable_from_file() {
        let path = temp_config(
            "filter",
            r#"{
                "mode": "raw",
                "frame_likelihood": true,
                "likely_tails": ["0x7E"],
                "likely_min_len": 6,
                "novelty_capacity": 8,
                "novelty_max_len": 4,
                "max_signatures": 64
            }"#,
        );
        let config = resolve(Some(&path), &PipelineArgs::default()).unwrap();
        let _ = fs::remove_file(&path);

        let filter = &config.filter;
        assert!(filter.frame_likelihood);
        assert_eq!(filter.likely_tails.len(), 1);
        assert_eq!(filter.likely_min_len, 6);
        assert_eq!(filter.novelty_capacity, 8);
        assert_eq!(filter.novelty_max_len, 4);
        assert_eq!(filter.max_signatures, 64);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let path = temp_config("unknown", r#"{ "idle_gap": 1200 }"#);
        let err = resolve(Some(&path), &PipelineArgs::default()).unwrap_err();
        let _ = fs::remove_file(&path);
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn bad_mode_in_file_is_rejected() {
        let path = temp_config("mode", r#"{ "mode": "frames" }"#);
        let err = resolve(Some(&path), &PipelineArgs::default()).unwrap_err();
        let _ = fs::remove_file(&path);
        assert!(err.to_string().contains("unknown capture mode"));
    }

    #[test]
    fn idle_bytes_flag_enables_the_idle_filter() {
        let args = PipelineArgs {
            idle_bytes: Some(vec![0x00, 0x06]),
            ..PipelineArgs::default()
        };
        let config = resolve(None, &args).unwrap();
        assert!(config.filter.idle_filter);
        assert_eq!(config.filter.idle_bytes.len(), 2);
    }

    #[test]
    fn validation_errors_surface() {
        let args = PipelineArgs {
            max_burst: Some(0),
            ..PipelineArgs::default()
        };
        assert!(matches!(
            resolve(None, &args),
            Err(ConfigError::Pipeline(PipelineError::InvalidConfig(_)))
        ));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let path = Path::new("/nonexistent/buswatch.json");
        assert!(matches!(
            resolve(Some(path), &PipelineArgs::default()),
            Err(ConfigError::Read { .. })
        ));
    }
}
