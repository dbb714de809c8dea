//! Generate `sonar-project.properties` and run `sonar-scanner-cli`.
//!
//! - [`ScannerProperties`] decides `sonar.sources` from the extracted tree and
//!   writes the properties file the scanner picks up.
//! - [`Scanner`] is the seam between the HTTP workflow and the external
//!   process. [`ContainerScanner`] is the real implementation; a
//!   [`MockScanner`] is available behind the `mock` feature for tests.

mod container;
pub mod error;
#[cfg(feature = "mock")]
mod mock;
mod output;
pub mod properties;
mod runtime;

pub use crate::container::{ContainerScanner, Invocation};
#[cfg(feature = "mock")]
pub use crate::mock::{MockScanner, ObservedScan};
pub use crate::output::ScanOutput;
pub use crate::properties::{Project, ScannerProperties};
pub use crate::runtime::ContainerRuntime;
use crate::error::Result;
use async_trait::async_trait;
use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::path::Path;
use std::sync::Arc;

/// Anything able to analyse a prepared working directory.
///
/// Implementations receive a directory that already contains the extracted
/// sources and `sonar-project.properties`.
#[async_trait]
pub trait Scanner: Send + Sync {
    async fn scan(&self, workdir: &Path, credential: &Credential) -> Result<ScanOutput>;
}

pub type ScannerHandle = Arc<dyn Scanner>;

/// The SonarCloud token a scan authenticates with.
///
/// `Debug` never prints the value; use [`expose`](Self::expose) at the single
/// point where it is handed to the child process.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl Debug for Credential {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str("Credential(***)")
    }
}
