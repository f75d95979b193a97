use std::path::Path;

use buswatch_frame::{validate, FrameError};
use bytes::Bytes;

use crate::cmd::{parse_hex, DecodeArgs, PipelineArgs};
use crate::config;
use crate::exit::{config_error, frame_error, CliError, CliResult, DATA_INVALID, SUCCESS};
use crate::output::{print_decode, DecodeOutput, OutputFormat};

pub fn run(args: DecodeArgs, format: OutputFormat, config_path: Option<&Path>) -> CliResult<i32> {
    let overrides = PipelineArgs {
        framing: args.framing,
        ..PipelineArgs::default()
    };
    let policy = config::resolve(config_path, &overrides)
        .map_err(config_error)?
        .sync
        .policy;

    let raw = parse_hex(&args.hex).map_err(|err| CliError::usage(format!("invalid hex: {err}")))?;
    let result = validate(Bytes::copy_from_slice(&raw));
    if let Err(err @ FrameError::TooShort { .. }) = result {
        return Err(frame_error("decode failed", err));
    }

    let out = DecodeOutput::from_result(&raw, policy, &result);
    if !out.length_matches {
        tracing::warn!(
            policy = policy.as_str(),
            len = raw.len(),
            "declared length does not match the frame size"
        );
    }
    print_decode(&out, format);
    Ok(if out.valid { SUCCESS } else { DATA_INVALID })
}
