//! Error types for the fcontext library
//!
//! A single unified error type wraps failures from the wire format, the
//! regex engine and file IO. "No rule matched" is not an error: lookups
//! return `Ok(None)` for that.

use std::path::PathBuf;
use thiserror::Error;

pub use fcontext_format::FormatError;

/// Main error type for fcontext operations
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed compiled rule file
    #[error(transparent)]
    Format(#[from] FormatError),

    /// Compiled rule file was produced by a different regex engine build
    #[error("compiled file regex engine \"{found}\" does not match host \"{host}\"")]
    VersionMismatch { found: String, host: String },

    /// A context failed validation
    #[error("{}: context {context} is invalid", .path.display())]
    Validate { path: PathBuf, context: String },

    /// Duplicate rules found while validating
    #[error("{}: {count} duplicated specification(s)", .path.display())]
    DuplicateSpec { path: PathBuf, count: usize },

    /// A text rule file line could not be parsed
    #[error("{}:{line}: {reason}", .path.display())]
    Parse {
        path: PathBuf,
        line: u32,
        reason: String,
    },

    /// I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Specfile path exceeds the platform limit
    #[error("specfile path too long: {}", .0.display())]
    NameTooLong(PathBuf),

    /// The regex engine returned an unexpected error
    #[error("regex engine error: {0}")]
    Internal(String),
}

/// Result type alias for fcontext operations
pub type Result<T> = std::result::Result<T, Error>;
