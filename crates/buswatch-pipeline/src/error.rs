use buswatch_source::SourceError;

/// Errors returned by the pipeline and the sniffer.
///
/// Protocol problems on the bus are never errors here. They are delivered
/// to the sink as diagnostics.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The byte source failed or closed.
    #[error("source error: {0}")]
    Source(#[from] SourceError),

    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl PipelineError {
    /// True when the source reached end of stream.
    pub fn is_closed(&self) -> bool {
        matches!(self, PipelineError::Source(SourceError::Closed))
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
