//! Common error types for Tilawa

use thiserror::Error;

/// Common result type for Tilawa operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across Tilawa crates
///
/// A recitation that matches nothing is not represented here; it is a
/// regular [`crate::matcher::MatchResult`] without a reference.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Corpus source or configuration unusable; the service must not start
    #[error("Configuration error: {0}")]
    Config(String),

    /// Corpus document could not be decoded
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Requested verse not present in the corpus
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid caller-supplied value (e.g. malformed verse reference)
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
