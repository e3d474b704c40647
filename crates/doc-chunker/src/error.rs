use thiserror::Error;

/// Result type for chunker operations
pub type Result<T> = std::result::Result<T, ChunkerError>;

/// Errors that can occur during document chunking
#[derive(Error, Debug)]
pub enum ChunkerError {
    /// Invalid configuration (checked eagerly, before any parsing)
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// No strategy registered under the requested method name
    #[error("Unknown chunking strategy: {0}")]
    UnknownStrategy(String),

    /// A strategy produced chunks whose trimmed content is empty
    #[error("Empty chunks produced at indices {indices:?}")]
    EmptyChunk { indices: Vec<usize> },

    /// A chunk exceeded the hard size limit (1.5x the configured chunk size)
    #[error("Oversized chunk at index {index}: {len} chars exceeds limit {limit}")]
    OversizedChunk {
        index: usize,
        len: usize,
        limit: usize,
    },

    /// Empty or whitespace-only document
    #[error("Empty content provided")]
    EmptyContent,
}

impl ChunkerError {
    /// Create an invalid config error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create an unknown strategy error
    pub fn unknown_strategy(name: impl Into<String>) -> Self {
        Self::UnknownStrategy(name.into())
    }
}
