mod cmd;
mod config;
mod exit;
mod logging;
mod output;

use std::path::PathBuf;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "buswatch", version, about = "Passive RS-485 bus sniffer")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "info", global = true)]
    log_level: LogLevel,

    /// JSON configuration file; flags override its values.
    #[arg(long, value_name = "FILE", env = "BUSWATCH_CONFIG", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = cmd::run(cli.command, format, cli.config.as_deref());

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use buswatch_frame::FramingPolicy;
    use buswatch_pipeline::CaptureMode;

    use super::*;

    #[test]
    fn parses_sniff_with_overrides() {
        let cli = Cli::try_parse_from([
            "buswatch",
            "sniff",
            "/dev/ttyUSB0",
            "--baud",
            "19200",
            "--mode",
            "bursts",
            "--idle-bytes",
            "0x00,6,0x18",
            "--framing",
            "len+4",
        ])
        .expect("sniff args should parse");

        let Command::Sniff(args) = cli.command else {
            panic!("expected sniff");
        };
        assert_eq!(args.device, "/dev/ttyUSB0");
        assert_eq!(args.baud, 19200);
        assert_eq!(args.pipeline.mode, Some(CaptureMode::Bursts));
        assert_eq!(args.pipeline.idle_bytes, Some(vec![0x00, 0x06, 0x18]));
        assert_eq!(args.pipeline.framing, Some(FramingPolicy::PayloadOnly));
    }

    #[test]
    fn rejects_unknown_mode() {
        let err = Cli::try_parse_from(["buswatch", "replay", "-", "--mode", "frames"])
            .expect_err("unknown mode should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn rejects_bad_idle_byte() {
        let err = Cli::try_parse_from(["buswatch", "replay", "-", "--idle-bytes", "0x100"])
            .expect_err("out of range byte should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn parses_replay_defaults() {
        let cli = Cli::try_parse_from(["buswatch", "--format", "json", "replay", "capture.txt"])
            .expect("replay args should parse");
        let Command::Replay(args) = cli.command else {
            panic!("expected replay");
        };
        assert_eq!(args.byte_us, cmd::DEFAULT_BYTE_US);
        assert_eq!(args.line_gap_us, cmd::DEFAULT_LINE_GAP_US);
        assert!(!args.binary);
        assert!(args.pipeline.mode.is_none());
    }

    #[test]
    fn parses_encode() {
        let cli = Cli::try_parse_from([
            "buswatch", "encode", "--cmd", "0x01", "--addr", "0x10,0x20", "01", "01",
        ])
        .expect("encode args should parse");
        let Command::Encode(args) = cli.command else {
            panic!("expected encode");
        };
        assert_eq!(args.cmd, 0x01);
        assert_eq!(args.addr, vec![0x10, 0x20]);
        assert_eq!(args.payload, vec!["01", "01"]);
    }

    #[test]
    fn decode_requires_bytes() {
        let err = Cli::try_parse_from(["buswatch", "decode"]).expect_err("decode needs hex");
        assert_eq!(
            err.kind(),
            clap::error::ErrorKind::MissingRequiredArgument
        );
    }
}
