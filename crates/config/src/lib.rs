//! Configuration loading and validation.
//!
//! Values are layered with [figment], later layers winning:
//!
//! 1. Built-in defaults ([`Config::default`])
//! 2. `config.toml`, `config.yaml` or `config.json` in the platform config
//!    directory (`~/.config/sonargate/` on Linux)
//! 3. An explicit file passed on the command line
//! 4. Environment variables prefixed with `SONARGATE_`, using `__` to reach
//!    nested keys: `SONARGATE_SCANNER__TIMEOUT_SECS=600`
//!
//! A loaded [`Config`] has already been [validated](Config::validate).

pub mod error;
mod sections;

pub use crate::sections::{LogFormat, LoggingConfig, ScannerConfig, ServerConfig, WorkspaceConfig};
use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const ENV_PREFIX: &str = "SONARGATE_";

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub workspace: WorkspaceConfig,
    pub scanner: ScannerConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Load, merge and validate configuration from every layer.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        Self::from_figment(Self::figment(explicit)?)
    }

    /// The layered provider stack, before extraction. Callers may merge
    /// further overrides (e.g. command-line flags) on top.
    pub fn figment(explicit: Option<&Path>) -> Result<Figment> {
        layered(user_config_dir(), explicit)
    }

    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config: Self = figment.extract().map_err(|e| ErrorKind::Malformed(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that parse but cannot work at runtime.
    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: &str| -> Result<()> { exn::bail!(ErrorKind::Invalid(reason.to_string())) };
        if self.server.max_upload_bytes == 0 {
            return invalid("server.max_upload_bytes must be greater than zero");
        }
        if self.workspace.prefix.is_empty() || self.workspace.prefix.contains(['/', '\\']) {
            return invalid("workspace.prefix must be a non-empty file name fragment");
        }
        if self.scanner.image.trim().is_empty() {
            return invalid("scanner.image must not be empty");
        }
        if !self.scanner.mount_path.starts_with('/') {
            return invalid("scanner.mount_path must be an absolute container path");
        }
        if !is_env_name(&self.scanner.token_env) {
            return invalid("scanner.token_env must be a valid environment variable name");
        }
        if self.scanner.host_url.trim().is_empty() {
            return invalid("scanner.host_url must not be empty");
        }
        if self.scanner.default_branch.trim().is_empty() {
            return invalid("scanner.default_branch must not be empty");
        }
        if self.scanner.timeout_secs == 0 {
            return invalid("scanner.timeout_secs must be greater than zero");
        }
        Ok(())
    }
}

fn user_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "sonargate").map(|dirs| dirs.config_dir().to_path_buf())
}

fn layered(user_dir: Option<PathBuf>, explicit: Option<&Path>) -> Result<Figment> {
    let mut figment = Figment::from(Serialized::defaults(Config::default()));
    if let Some(dir) = user_dir {
        tracing::trace!(dir = %dir.display(), "Looking for user configuration");
        // Missing files are silently empty providers.
        figment = figment
            .merge(Toml::file(dir.join("config.toml")))
            .merge(Yaml::file(dir.join("config.yaml")))
            .merge(Json::file(dir.join("config.json")));
    }
    if let Some(path) = explicit {
        if !path.is_file() {
            exn::bail!(ErrorKind::NotFound(path.to_path_buf()));
        }
        figment = match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => figment.merge(Toml::file(path)),
            Some("yaml" | "yml") => figment.merge(Yaml::file(path)),
            Some("json") => figment.merge(Json::file(path)),
            _ => exn::bail!(ErrorKind::UnsupportedFormat(path.to_path_buf())),
        };
    }
    Ok(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
}

fn is_env_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
