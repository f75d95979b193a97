use std::path::{Path, PathBuf};

use buswatch_frame::FramingPolicy;
use buswatch_pipeline::CaptureMode;
use buswatch_source::Micros;
use clap::{Args, Subcommand};

use crate::config::parse_byte;
use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod decode;
pub mod encode;
pub mod replay;
pub mod sniff;
pub mod version;

/// 10 bits per character at 9600 baud.
pub const DEFAULT_BYTE_US: Micros = 1042;
pub const DEFAULT_LINE_GAP_US: Micros = 10_000;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Capture from a serial device until interrupted.
    Sniff(SniffArgs),
    /// Run a recorded capture through the pipeline.
    Replay(ReplayArgs),
    /// Validate and decode a single frame.
    Decode(DecodeArgs),
    /// Build a frame with a correct checksum.
    Encode(EncodeArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat, config: Option<&Path>) -> CliResult<i32> {
    match command {
        Command::Sniff(args) => sniff::run(args, format, config),
        Command::Replay(args) => replay::run(args, format, config),
        Command::Decode(args) => decode::run(args, format, config),
        Command::Encode(args) => encode::run(args, format, config),
        Command::Version(args) => version::run(args),
    }
}

fn byte_arg(s: &str) -> Result<u8, String> {
    parse_byte(s).map_err(|err| err.to_string())
}

/// Parse hex bytes written as `AA 07 00`, `AA0700`, `0xAA,0x07` or a mix.
/// Single-digit tokens are zero-padded.
pub fn parse_hex<S: AsRef<str>>(parts: &[S]) -> Result<Vec<u8>, hex::FromHexError> {
    let mut digits = String::new();
    for part in parts {
        let tokens = part
            .as_ref()
            .split(|c: char| c.is_whitespace() || c == ',' || c == ':')
            .filter(|t| !t.is_empty());
        for token in tokens {
            let token = token
                .strip_prefix("0x")
                .or_else(|| token.strip_prefix("0X"))
                .unwrap_or(token);
            if token.len() == 1 {
                digits.push('0');
            }
            digits.push_str(token);
        }
    }
    hex::decode(digits)
}

/// Pipeline overrides shared by `sniff` and `replay`.
#[derive(Args, Debug, Default, Clone)]
pub struct PipelineArgs {
    /// Capture mode: raw, bursts or stream.
    #[arg(long, value_name = "MODE")]
    pub mode: Option<CaptureMode>,
    /// How LEN maps to frame size: inclusive (LEN+2) or payload-only (LEN+4).
    #[arg(long, value_name = "POLICY")]
    pub framing: Option<FramingPolicy>,
    /// Frame start byte.
    #[arg(long, value_name = "BYTE", value_parser = byte_arg)]
    pub sentinel: Option<u8>,
    /// Line silence that ends a burst, in microseconds.
    #[arg(long, value_name = "US")]
    pub idle_gap_us: Option<u32>,
    /// Cut bursts at this many bytes.
    #[arg(long, value_name = "BYTES")]
    pub max_burst: Option<usize>,
    /// Cut bursts open longer than this, in microseconds.
    #[arg(long, value_name = "US")]
    pub max_age_us: Option<u32>,
    /// Drop units shorter than this.
    #[arg(long, value_name = "BYTES")]
    pub min_len: Option<usize>,
    /// Drop repeats of the last emitted unit within this window (0 disables).
    #[arg(long, value_name = "MS")]
    pub dedupe_ms: Option<u32>,
    /// Drop short bursts made only of idle bytes.
    #[arg(long)]
    pub idle_filter: bool,
    /// Idle byte values, comma-separated, decimal or 0x hex (implies --idle-filter).
    #[arg(long, value_name = "BYTES", value_delimiter = ',', value_parser = byte_arg)]
    pub idle_bytes: Option<Vec<u8>>,
    /// Longest burst checked against the idle set.
    #[arg(long, value_name = "BYTES")]
    pub idle_max_len: Option<usize>,
    /// Keep only frame-like bursts (raw mode).
    #[arg(long)]
    pub likelihood: bool,
    /// Emissions allowed per signature per window (0 disables).
    #[arg(long, value_name = "N")]
    pub chatter_threshold: Option<u32>,
    /// Chatter counting window.
    #[arg(long, value_name = "MS")]
    pub chatter_window_ms: Option<u32>,
}

#[derive(Args, Debug)]
pub struct SniffArgs {
    /// Serial device, e.g. /dev/ttyUSB0 or COM3.
    #[arg(env = "BUSWATCH_DEVICE")]
    pub device: String,
    /// Baud rate.
    #[arg(long, env = "BUSWATCH_BAUD", default_value_t = 9600)]
    pub baud: u32,
    /// Print counters on exit.
    #[arg(long)]
    pub stats: bool,
    #[command(flatten)]
    pub pipeline: PipelineArgs,
}

#[derive(Args, Debug)]
pub struct ReplayArgs {
    /// Capture file, or `-` for stdin.
    pub input: PathBuf,
    /// Treat the input as raw bytes instead of hex lines.
    #[arg(long)]
    pub binary: bool,
    /// Time between bytes, in microseconds.
    #[arg(long, value_name = "US", default_value_t = DEFAULT_BYTE_US)]
    pub byte_us: Micros,
    /// Silence between lines of a text capture, in microseconds.
    #[arg(long, value_name = "US", default_value_t = DEFAULT_LINE_GAP_US)]
    pub line_gap_us: Micros,
    /// Print counters at the end.
    #[arg(long)]
    pub stats: bool,
    #[command(flatten)]
    pub pipeline: PipelineArgs,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Frame bytes in hex, e.g. "AA 07 00 00 01 01 01 81 2D".
    #[arg(required = true, num_args = 1..)]
    pub hex: Vec<String>,
    /// How LEN maps to frame size.
    #[arg(long, value_name = "POLICY")]
    pub framing: Option<FramingPolicy>,
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// Command byte.
    #[arg(long, value_name = "BYTE", value_parser = byte_arg)]
    pub cmd: u8,
    /// Two address bytes, comma-separated.
    #[arg(long, value_name = "A,B", value_delimiter = ',', value_parser = byte_arg, default_value = "0,0")]
    pub addr: Vec<u8>,
    /// How LEN maps to frame size.
    #[arg(long, value_name = "POLICY")]
    pub framing: Option<FramingPolicy>,
    /// Frame start byte.
    #[arg(long, value_name = "BYTE", value_parser = byte_arg)]
    pub sentinel: Option<u8>,
    /// Payload bytes in hex.
    pub payload: Vec<String>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}
