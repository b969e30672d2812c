//! Error types for the DecSync engine.

use std::io;
use thiserror::Error;

/// Result type for DecSync operations.
pub type DecsyncResult<T> = Result<T, DecsyncError>;

/// Errors that can occur in DecSync operations.
#[derive(Debug, Error)]
pub enum DecsyncError {
    /// `.decsync-info` exists but does not parse as the expected JSON shape.
    #[error("invalid .decsync-info: {message}")]
    InvalidInfo {
        /// Description of what failed to parse.
        message: String,
    },

    /// `.decsync-info` parses but declares a version this library does not support.
    #[error("unsupported DecSync version: {version}")]
    UnsupportedVersion {
        /// The version found on disk.
        version: u64,
    },

    /// A log line failed the format check.
    ///
    /// Corrupt lines are skipped on the read path; this error never escapes
    /// the public API.
    #[error("corrupt log line: {message}")]
    CorruptLine {
        /// Description of the format violation.
        message: String,
    },

    /// An argument was outside its documented range.
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// Description of the argument issue.
        message: String,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl DecsyncError {
    /// Creates an invalid info error.
    pub fn invalid_info(message: impl Into<String>) -> Self {
        Self::InvalidInfo {
            message: message.into(),
        }
    }

    /// Creates a corrupt line error.
    pub fn corrupt_line(message: impl Into<String>) -> Self {
        Self::CorruptLine {
            message: message.into(),
        }
    }

    /// Creates an invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }
}
