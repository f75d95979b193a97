/// Errors that can occur while reading from a byte source.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// Failed to open the underlying device.
    #[error("failed to open {device}: {source}")]
    Open {
        device: String,
        source: std::io::Error,
    },

    /// An I/O error occurred while reading.
    #[error("source I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The source reached end of stream and will never produce more bytes.
    #[error("source closed")]
    Closed,
}

pub type Result<T> = std::result::Result<T, SourceError>;
