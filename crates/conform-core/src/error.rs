//! Error types for the conformance engine

/// Errors that can occur while setting up or driving a conformance run
#[derive(Debug, thiserror::Error)]
pub enum ConformError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Device error: {0}")]
    Device(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for conformance engine operations
pub type Result<T> = std::result::Result<T, ConformError>;
