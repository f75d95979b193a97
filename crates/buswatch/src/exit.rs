use std::fmt;
use std::io;

use buswatch_frame::FrameError;
use buswatch_pipeline::PipelineError;
use buswatch_source::SourceError;

use crate::config::ConfigError;

// Exit codes follow the sysexits-style layout used across our tools.
pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const SOURCE_ERROR: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn usage(message: impl Into<String>) -> Self {
        Self::new(USAGE, message)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::NotFound => SOURCE_ERROR,
        io::ErrorKind::InvalidData | io::ErrorKind::UnexpectedEof => DATA_INVALID,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn source_error(context: &str, err: SourceError) -> CliError {
    match err {
        SourceError::Open { device, source } => {
            let code = match source.kind() {
                io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
                _ => SOURCE_ERROR,
            };
            CliError::new(code, format!("{context}: cannot open {device}: {source}"))
        }
        SourceError::Io(source) => CliError::new(SOURCE_ERROR, format!("{context}: {source}")),
        SourceError::Closed => CliError::new(FAILURE, format!("{context}: {err}")),
    }
}

pub fn pipeline_error(context: &str, err: PipelineError) -> CliError {
    match err {
        PipelineError::Source(err) => source_error(context, err),
        PipelineError::InvalidConfig(_) => CliError::new(USAGE, format!("{context}: {err}")),
    }
}

pub fn config_error(err: ConfigError) -> CliError {
    match err {
        ConfigError::Read { path, source } => {
            io_error(&format!("failed to read config {}", path.display()), source)
        }
        other => CliError::new(USAGE, other.to_string()),
    }
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    match err {
        FrameError::PayloadTooLarge { .. } => CliError::new(USAGE, format!("{context}: {err}")),
        other => CliError::new(DATA_INVALID, format!("{context}: {other}")),
    }
}
