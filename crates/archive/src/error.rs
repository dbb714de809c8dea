//! Archive Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use std::io::{Error as IoError, ErrorKind as IoErrorKind};
use std::path::{Path, PathBuf};

/// An archive error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for archive operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The working directory could not be created under the configured base.
    #[display("cannot create working directory under {}", _0.display())]
    WorkingDirectory(#[error(not(source))] PathBuf),
    /// Upload is not a zip archive, or its central directory is corrupt. Don't
    /// retry with the same input.
    #[display("invalid archive: {_0}")]
    InvalidArchive(#[error(not(source))] String),
    /// An entry name is absolute or resolves outside the working directory.
    #[display("archive entry escapes the working directory: {_0}")]
    UnsafePath(#[error(not(source))] String),
    /// Reading or writing a file on disk failed. The underlying `io::Error`
    /// is kept as the child frame.
    #[display("I/O error on {}: {kind}", path.display())]
    Io { path: PathBuf, kind: IoErrorKind },
}

impl ErrorKind {
    /// Raise an I/O failure on `path`, keeping `err` in the error tree.
    #[track_caller]
    pub(crate) fn io(path: &Path, err: IoError) -> Error {
        let kind = Self::Io { path: path.to_path_buf(), kind: err.kind() };
        exn::Exn::from(err).raise(kind)
    }

    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::WorkingDirectory(_) | Self::Io { .. })
    }
}
