use std::path::Path;

use buswatch_frame::encode_frame;
use bytes::BytesMut;

use crate::cmd::{parse_hex, EncodeArgs, PipelineArgs};
use crate::config;
use crate::exit::{config_error, frame_error, CliError, CliResult, SUCCESS};
use crate::output::{print_encoded, OutputFormat};

pub fn run(args: EncodeArgs, format: OutputFormat, config_path: Option<&Path>) -> CliResult<i32> {
    let overrides = PipelineArgs {
        framing: args.framing,
        sentinel: args.sentinel,
        ..PipelineArgs::default()
    };
    let sync = config::resolve(config_path, &overrides)
        .map_err(config_error)?
        .sync;

    let address: [u8; 2] = args.addr.as_slice().try_into().map_err(|_| {
        CliError::usage(format!(
            "--addr takes exactly two bytes, got {}",
            args.addr.len()
        ))
    })?;
    let payload =
        parse_hex(&args.payload).map_err(|err| CliError::usage(format!("invalid payload: {err}")))?;

    let mut frame = BytesMut::new();
    encode_frame(
        sync.policy,
        sync.sentinel,
        address,
        args.cmd,
        &payload,
        &mut frame,
    )
    .map_err(|err| frame_error("encode failed", err))?;

    print_encoded(&frame, sync.policy.as_str(), format);
    Ok(SUCCESS)
}
