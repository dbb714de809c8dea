//! Scanner Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use std::io::{Error as IoError, ErrorKind as IoErrorKind};
use std::path::{Path, PathBuf};

/// A scanner error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for scanner operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
/// A scanner that ran and exited non-zero is *not* an error; see
/// [`ScanOutput::exit_code`](crate::ScanOutput::exit_code).
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The working directory could not be listed, or the properties file
    /// could not be written.
    #[display("cannot write scanner configuration {}: {kind}", path.display())]
    ConfigWrite { path: PathBuf, kind: IoErrorKind },
    /// Neither docker nor podman is on `PATH`.
    #[display("no container runtime (docker, podman) found")]
    RuntimeNotFound,
    /// The runtime binary could not be started.
    #[display("failed to launch {}: {kind}", program.display())]
    Launch { program: PathBuf, kind: IoErrorKind },
    /// Reading the scanner's output streams failed.
    #[display("failed to collect scanner output: {_0}")]
    Output(#[error(not(source))] IoErrorKind),
    /// The scanner ran past the configured limit and was killed.
    #[display("scanner timed out after {_0} seconds")]
    Timeout(#[error(not(source))] u64),
}

impl ErrorKind {
    /// The `io::Error` behind each of these stays in the tree as the child
    /// frame.
    #[track_caller]
    pub(crate) fn config_write(path: &Path, err: IoError) -> Error {
        let kind = Self::ConfigWrite { path: path.to_path_buf(), kind: err.kind() };
        exn::Exn::from(err).raise(kind)
    }

    #[track_caller]
    pub(crate) fn launch(program: &Path, err: IoError) -> Error {
        let kind = Self::Launch { program: program.to_path_buf(), kind: err.kind() };
        exn::Exn::from(err).raise(kind)
    }

    #[track_caller]
    pub(crate) fn output(err: IoError) -> Error {
        let kind = Self::Output(err.kind());
        exn::Exn::from(err).raise(kind)
    }

    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Output(_) | Self::Timeout(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kind_display() {
        assert_eq!(ErrorKind::Timeout(1800).to_string(), "scanner timed out after 1800 seconds");
        assert_eq!(
            ErrorKind::Launch { program: PathBuf::from("docker"), kind: IoErrorKind::NotFound }.to_string(),
            "failed to launch docker: entity not found"
        );
    }

    #[test]
    fn io_source_is_kept_as_child() {
        let err = ErrorKind::config_write(Path::new("/w"), IoError::new(IoErrorKind::PermissionDenied, "read-only fs"));
        assert_eq!(*err, ErrorKind::ConfigWrite { path: PathBuf::from("/w"), kind: IoErrorKind::PermissionDenied });
        assert!(format!("{err:?}").contains("read-only fs"));
    }

    #[test]
    fn error_kind_retryable() {
        assert!(ErrorKind::Timeout(1).is_retryable());
        assert!(!ErrorKind::RuntimeNotFound.is_retryable());
    }
}
