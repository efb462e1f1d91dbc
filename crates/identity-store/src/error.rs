//! Error types for identity-store.
//!
//! Only caller misuse and backend failures are errors. Corrupt stored data
//! is never reported here: readers substitute defaults instead.

/// Store error types covering all operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("unknown email address: {0}")]
    UnknownEmail(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("invalid identity: {0}")]
    InvalidIdentity(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("change watch requires a running Tokio runtime")]
    NoRuntime,
}

/// Convenience Result alias.
pub type Result<T> = std::result::Result<T, StoreError>;
