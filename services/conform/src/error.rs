//! Error types for the conformance harness binary

/// Errors that can occur while running the harness
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Engine error: {0}")]
    Engine(#[from] conform_core::ConformError),
}

/// Result type alias for harness operations
pub type Result<T> = std::result::Result<T, HarnessError>;
