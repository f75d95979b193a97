use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use buswatch_pipeline::Sniffer;
use buswatch_source::{MonotonicClock, ReadSource, SourceError};

use crate::cmd::SniffArgs;
use crate::config;
use crate::exit::{config_error, pipeline_error, source_error, CliError, CliResult, SUCCESS};
use crate::output::{print_stats, EventPrinter, OutputFormat};

/// Short enough that byte timestamps stay well inside one character time.
const READ_TIMEOUT: Duration = Duration::from_millis(1);

pub fn run(args: SniffArgs, format: OutputFormat, config_path: Option<&Path>) -> CliResult<i32> {
    let config = config::resolve(config_path, &args.pipeline).map_err(config_error)?;

    let port = serialport::new(&args.device, args.baud)
        .timeout(READ_TIMEOUT)
        .open()
        .map_err(|err| {
            source_error(
                "sniff failed",
                SourceError::Open {
                    device: args.device.clone(),
                    source: err.into(),
                },
            )
        })?;
    tracing::info!(device = %args.device, baud = args.baud, "serial port opened");

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let mut sniffer = Sniffer::new(
        ReadSource::new(port),
        MonotonicClock::new(),
        EventPrinter::streaming(format),
        config,
    )
    .map_err(|err| pipeline_error("sniff failed", err))?;
    sniffer.start();

    let mut outcome = Ok(());
    while running.load(Ordering::SeqCst) {
        match sniffer.poll() {
            Ok(_) => sniffer.sink_mut().flush(),
            Err(err) if err.is_closed() => {
                tracing::warn!(device = %args.device, "serial device closed");
                break;
            }
            Err(err) => {
                outcome = Err(pipeline_error("read failed", err));
                break;
            }
        }
    }

    let stats = sniffer.stop();
    sniffer.sink_mut().flush();
    if args.stats {
        print_stats(&stats, format);
    }
    outcome.map(|()| SUCCESS)
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| {
        CliError::new(
            crate::exit::INTERNAL,
            format!("signal handler setup failed: {err}"),
        )
    })
}
