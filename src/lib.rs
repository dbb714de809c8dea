//! Accept a zipped repository over HTTP, run `sonar-scanner-cli` against it
//! and return the scanner's output.
//!
//! The pieces, in request order:
//!
//! - [`http`] parses the multipart upload and maps errors to status codes.
//! - [`request`] validates fields and the bearer credential.
//! - [`workflow`] owns the per-request working directory, extraction,
//!   properties generation and the scan itself.

pub mod error;
pub mod http;
pub mod request;
pub mod telemetry;
pub mod workflow;

pub use crate::http::{AppState, router};
pub use crate::request::AnalysisRequest;
pub use crate::workflow::Analyzer;
use sonargate_config::{Config, ScannerConfig};
use sonargate_scanner::{ContainerRuntime, ContainerScanner};
use std::sync::Arc;

/// Container runtime used when neither configuration nor `PATH` provides one.
/// Scans then fail individually with a launch error instead of the service
/// refusing to start.
const FALLBACK_RUNTIME: &str = "docker";

/// Build the production scanner from configuration.
pub fn container_scanner(config: &ScannerConfig) -> ContainerScanner {
    let runtime = match &config.runtime {
        Some(path) => ContainerRuntime::from_path(path),
        None => ContainerRuntime::discover().unwrap_or_else(|err| {
            tracing::warn!(error = ?err, fallback = FALLBACK_RUNTIME, "No container runtime found on PATH");
            ContainerRuntime::from_path(FALLBACK_RUNTIME)
        }),
    };
    tracing::info!(runtime = %runtime.program().display(), image = %config.image, "Scanner configured");
    ContainerScanner::new(runtime)
        .with_image(&config.image)
        .with_mount_path(&config.mount_path)
        .with_token_env(&config.token_env)
        .with_timeout(config.timeout())
}

/// Wire the application state for a loaded configuration.
pub fn app_state(config: &Config) -> AppState {
    let analyzer = Analyzer::new(
        config.workspace.base(),
        &config.workspace.prefix,
        &config.scanner.host_url,
        Arc::new(container_scanner(&config.scanner)),
    );
    AppState::new(analyzer, config.scanner.default_branch.as_str())
}
