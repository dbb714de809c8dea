//! Tracing subscriber setup for the binary.

use sonargate_config::{LogFormat, LoggingConfig};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const FALLBACK_DIRECTIVE: &str = "info";

/// Resolve the filter: `RUST_LOG` first, then the configured directive, then
/// `info` when the configured directive does not parse.
pub fn filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new(FALLBACK_DIRECTIVE))
}

/// Install the global subscriber. Calling this twice is a no-op.
pub fn init(config: &LoggingConfig) {
    let registry = tracing_subscriber::registry().with(filter(config));
    let installed = match config.format {
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer().with_target(false)).try_init(),
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).try_init(),
    };
    if installed.is_err() {
        tracing::debug!("Tracing subscriber already installed");
    }
}
