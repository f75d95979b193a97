use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("buswatch {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: buswatch");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!(
        "build_target: {}",
        option_env!("BUSWATCH_BUILD_TARGET").unwrap_or("unknown")
    );
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!("git_hash: {}", option_env!("GIT_HASH").unwrap_or("unknown"));
    println!(
        "defaults: idle_gap_us={}, max_burst_len={}, framing={}",
        buswatch_pipeline::DEFAULT_IDLE_GAP_US,
        buswatch_pipeline::DEFAULT_MAX_BURST_LEN,
        buswatch_frame::FramingPolicy::default()
    );

    Ok(SUCCESS)
}
