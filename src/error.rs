//! Service Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction. Errors from the archive and scanner
//! crates are re-raised here, keeping their frame as a child.

use derive_more::{Display, Error};
use sonargate_archive::error::{Error as ArchiveError, ErrorKind as ArchiveErrorKind};
use sonargate_scanner::error::{Error as ScannerError, ErrorKind as ScannerErrorKind};

/// A service error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for service operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Classifies the origin of a failed analysis request.
///
/// ### Client Errors
/// - [`ErrorKind::MissingParameters`]
/// - [`ErrorKind::InvalidAuthorization`]
///
/// ### Operational Errors
/// - [`ErrorKind::Extraction`]
/// - [`ErrorKind::ConfigWrite`]
/// - [`ErrorKind::Execution`]
/// - [`ErrorKind::Internal`]
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// Archive, project key, organization or authorization header is absent
    /// or empty.
    #[display("Missing parameters")]
    MissingParameters,
    /// Authorization header is not `Bearer <token>`.
    #[display("Authorization header invalid")]
    InvalidAuthorization,
    /// Creating the working directory or expanding the archive failed.
    #[display("{_0}")]
    Extraction(ArchiveErrorKind),
    /// `sonar-project.properties` could not be generated.
    #[display("{_0}")]
    ConfigWrite(ScannerErrorKind),
    /// The scanner could not be launched, read, or ran out of time.
    #[display("{_0}")]
    Execution(ScannerErrorKind),
    /// The blocking preparation task panicked or was cancelled.
    #[display("analysis task failed: {_0}")]
    Internal(#[error(not(source))] String),
}

impl ErrorKind {
    #[track_caller]
    pub fn extraction(err: ArchiveError) -> Error {
        let inner = (*err).clone();
        err.raise(ErrorKind::Extraction(inner))
    }

    #[track_caller]
    pub fn config_write(err: ScannerError) -> Error {
        let inner = (*err).clone();
        err.raise(ErrorKind::ConfigWrite(inner))
    }

    #[track_caller]
    pub fn execution(err: ScannerError) -> Error {
        let inner = (*err).clone();
        err.raise(ErrorKind::Execution(inner))
    }

    /// The request itself is at fault; nothing was created on disk.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::MissingParameters | Self::InvalidAuthorization)
    }

    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::MissingParameters | Self::InvalidAuthorization => false,
            Self::Extraction(inner) => inner.is_retryable(),
            Self::ConfigWrite(inner) | Self::Execution(inner) => inner.is_retryable(),
            Self::Internal(_) => true,
        }
    }
}
