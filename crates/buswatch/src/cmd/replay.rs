use std::fs;
use std::io::Read;
use std::path::Path;

use buswatch_pipeline::Pipeline;
use buswatch_source::Micros;

use crate::cmd::{parse_hex, ReplayArgs};
use crate::config;
use crate::exit::{config_error, io_error, pipeline_error, CliError, CliResult, DATA_INVALID, SUCCESS};
use crate::output::{print_stats, EventPrinter, OutputFormat};

pub fn run(args: ReplayArgs, format: OutputFormat, config_path: Option<&Path>) -> CliResult<i32> {
    let config = config::resolve(config_path, &args.pipeline).map_err(config_error)?;
    let input = read_input(&args.input)?;

    let lines = if args.binary {
        vec![input]
    } else {
        let text = String::from_utf8(input).map_err(|_| {
            CliError::new(
                DATA_INVALID,
                "capture is not text; use --binary for raw captures",
            )
        })?;
        parse_capture(&text)?
    };
    tracing::debug!(lines = lines.len(), mode = %config.mode, "replaying capture");

    let mut pipeline = Pipeline::new(&config, EventPrinter::new(format))
        .map_err(|err| pipeline_error("replay failed", err))?;

    let mut now: Micros = 0;
    for (i, line) in lines.iter().enumerate() {
        if i > 0 {
            now = now.wrapping_add(args.line_gap_us);
        }
        for (j, &byte) in line.iter().enumerate() {
            if j > 0 {
                now = now.wrapping_add(args.byte_us);
            }
            pipeline.ingest(byte, now);
        }
    }
    pipeline.finish();
    pipeline.sink_mut().flush();

    if args.stats {
        print_stats(&pipeline.stats(), format);
    }
    Ok(SUCCESS)
}

fn read_input(path: &Path) -> CliResult<Vec<u8>> {
    if path.as_os_str() == "-" {
        let mut buf = Vec::new();
        std::io::stdin()
            .read_to_end(&mut buf)
            .map_err(|err| io_error("failed reading stdin", err))?;
        return Ok(buf);
    }
    fs::read(path).map_err(|err| io_error(&format!("failed reading {}", path.display()), err))
}

/// One burst per line of hex. `#` starts a comment; blank lines are skipped.
fn parse_capture(text: &str) -> CliResult<Vec<Vec<u8>>> {
    let mut lines = Vec::new();
    for (number, line) in text.lines().enumerate() {
        let content = line.split('#').next().unwrap_or_default().trim();
        if content.is_empty() {
            continue;
        }
        let bytes = parse_hex(&[content]).map_err(|err| {
            CliError::new(
                DATA_INVALID,
                format!("line {}: invalid hex: {err}", number + 1),
            )
        })?;
        lines.push(bytes);
    }
    Ok(lines)
}
