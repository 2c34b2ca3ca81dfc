//! Error types for the Glaive library.
//!
//! Every fallible operation in the crate returns [`Result`], whose error side is
//! [`GlaiveError`]. The variants follow the failure taxonomy of the index:
//! storage and write-log problems surface as [`GlaiveError::Index`] or
//! [`GlaiveError::Storage`], rejected query text as [`GlaiveError::Query`],
//! unknown records as [`GlaiveError::NotFound`] and rejected input as
//! [`GlaiveError::Validation`].
//!
//! # Examples
//!
//! ```
//! use glaive::error::{GlaiveError, Result};
//!
//! fn lookup(id: i64) -> Result<()> {
//!     Err(GlaiveError::not_found(format!("content {id}")))
//! }
//!
//! let err = lookup(7).unwrap_err();
//! assert!(err.is_not_found());
//! assert!(err.is_client_error());
//! ```

use std::io;

use thiserror::Error;

/// The main error type for Glaive operations.
#[derive(Error, Debug)]
pub enum GlaiveError {
    /// I/O errors from the underlying file system.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Index errors: segment, manifest, write-log or writer session failures.
    #[error("Index error: {0}")]
    Index(String),

    /// Storage backend errors.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Analysis errors (tokenization, filtering).
    #[error("Analysis error: {0}")]
    Analysis(String),

    /// Query text that could not be turned into a query.
    #[error("Query error: {0}")]
    Query(String),

    /// Highlighting failures. These never escape a search; the engine falls back.
    #[error("Highlight error: {0}")]
    Highlight(String),

    /// A record that does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Input rejected before it reached the index.
    #[error("Validation error: {0}")]
    Validation(String),

    /// JSON serialization/deserialization errors.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error for other cases.
    #[error("Error: {0}")]
    Other(String),
}

/// Result type alias for operations that may fail with GlaiveError.
pub type Result<T> = std::result::Result<T, GlaiveError>;

impl GlaiveError {
    /// Create a new index error.
    pub fn index<S: Into<String>>(msg: S) -> Self {
        GlaiveError::Index(msg.into())
    }

    /// Create a new storage error.
    pub fn storage<S: Into<String>>(msg: S) -> Self {
        GlaiveError::Storage(msg.into())
    }

    /// Create a new analysis error.
    pub fn analysis<S: Into<String>>(msg: S) -> Self {
        GlaiveError::Analysis(msg.into())
    }

    /// Create a new query error.
    pub fn query<S: Into<String>>(msg: S) -> Self {
        GlaiveError::Query(msg.into())
    }

    /// Create a new highlight error.
    pub fn highlight<S: Into<String>>(msg: S) -> Self {
        GlaiveError::Highlight(msg.into())
    }

    /// Create a new not found error.
    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        GlaiveError::NotFound(msg.into())
    }

    /// Create a new validation error.
    pub fn validation<S: Into<String>>(msg: S) -> Self {
        GlaiveError::Validation(msg.into())
    }

    /// Create a new invalid config error.
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        GlaiveError::Validation(format!("Invalid configuration: {}", msg.into()))
    }

    /// Create a new invalid argument error.
    pub fn invalid_argument<S: Into<String>>(msg: S) -> Self {
        GlaiveError::Validation(format!("Invalid argument: {}", msg.into()))
    }

    /// Create a new generic error.
    pub fn other<S: Into<String>>(msg: S) -> Self {
        GlaiveError::Other(msg.into())
    }

    /// Whether the caller, not the index, is at fault.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            GlaiveError::Query(_) | GlaiveError::NotFound(_) | GlaiveError::Validation(_)
        )
    }

    /// Whether this error reports a missing record.
    pub fn is_not_found(&self) -> bool {
        matches!(self, GlaiveError::NotFound(_))
    }
}
