//! Common error types for ReelScout

use thiserror::Error;

/// Common result type for ReelScout operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the ReelScout service
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    Validation(String),

    /// Action requires an automation driver connection that is absent
    #[error("Automation driver not connected: {0}")]
    NotReady(String),

    /// Driver connection attempt exhausted its retry budget
    #[error("Driver connection failed: {0}")]
    Connection(String),

    /// The driver failed to produce an item batch (fatal to one session)
    #[error("Batch fetch failed: {0}")]
    BatchFetch(String),

    /// Analysis or reply generation failed for one item
    #[error("Analysis error: {0}")]
    Analysis(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}
