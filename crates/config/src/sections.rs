use serde::{Deserialize, Serialize};
use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

/// HTTP listener settings.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the HTTP listener binds to.
    pub bind: SocketAddr,
    /// Largest accepted request body, in bytes. Repository archives are big;
    /// the framework default of 2 MiB is not.
    pub max_upload_bytes: usize,
}
impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from((Ipv4Addr::UNSPECIFIED, 8080)),
            max_upload_bytes: 512 * 1024 * 1024,
        }
    }
}

/// Where per-request working directories are created.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct WorkspaceConfig {
    /// Base directory; the system temporary directory when unset.
    pub temp_dir: Option<PathBuf>,
    /// Name prefix of each working directory. A random suffix is appended.
    pub prefix: String,
}
impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self { temp_dir: None, prefix: "sonar_repo_".to_string() }
    }
}
impl WorkspaceConfig {
    /// Resolved base directory for working directories.
    pub fn base(&self) -> PathBuf {
        self.temp_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

/// How the external scanner container is launched.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct ScannerConfig {
    /// Container runtime binary. Discovered from `PATH` (`docker`, then
    /// `podman`) when unset.
    pub runtime: Option<PathBuf>,
    pub image: String,
    /// Container path the working directory is bind-mounted to.
    pub mount_path: String,
    /// Environment variable the credential is passed through.
    pub token_env: String,
    /// Value of `sonar.host.url` in the generated properties.
    pub host_url: String,
    /// Branch analysed when a request does not name one.
    pub default_branch: String,
    /// Upper bound on a single scan. The container is killed past this.
    pub timeout_secs: u64,
}
impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            runtime: None,
            image: "sonarsource/sonar-scanner-cli".to_string(),
            mount_path: "/usr/src".to_string(),
            token_env: "SONAR_TOKEN".to_string(),
            host_url: "https://sonarcloud.io".to_string(),
            default_branch: "main".to_string(),
            timeout_secs: 30 * 60,
        }
    }
}
impl ScannerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    /// An `EnvFilter` directive such as `info` or `sonargate=debug,info`.
    /// `RUST_LOG` takes precedence when set.
    pub level: String,
    pub format: LogFormat,
}
impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), format: LogFormat::default() }
    }
}
