//! Error types for the icsync crates.

use thiserror::Error;

/// Errors that can occur during a sync run.
#[derive(Error, Debug)]
pub enum IcsyncError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Feed fetch failed: {0}")]
    Fetch(String),

    #[error("Feed parse error: {0}")]
    FeedParse(String),

    #[error("Unknown timezone: {0}")]
    Timezone(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type alias for icsync operations.
pub type IcsyncResult<T> = Result<T, IcsyncError>;
