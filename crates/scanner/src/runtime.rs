use crate::error::{ErrorKind, Result};
use std::path::{Path, PathBuf};

/// A container runtime CLI able to `run --rm -v ... <image>`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ContainerRuntime {
    Docker { path: PathBuf },
    /// Podman needs an SELinux relabel on bind mounts; otherwise it is CLI
    /// compatible with Docker.
    Podman { path: PathBuf },
}

impl ContainerRuntime {
    /// Search `PATH` for a runtime, preferring Docker.
    pub fn discover() -> Result<Self> {
        if let Ok(path) = which::which("docker") {
            return Ok(Self::Docker { path });
        }
        tracing::info!("docker not found in PATH; trying podman");
        if let Ok(path) = which::which("podman") {
            return Ok(Self::Podman { path });
        }
        exn::bail!(ErrorKind::RuntimeNotFound);
    }

    /// Use an explicitly configured binary. The flavour is guessed from the
    /// file name; anything not called `podman*` is driven like Docker.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let is_podman = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.starts_with("podman"));
        match is_podman {
            true => Self::Podman { path },
            false => Self::Docker { path },
        }
    }

    pub fn program(&self) -> &Path {
        match self {
            Self::Docker { path } | Self::Podman { path } => path,
        }
    }

    /// The `-v` argument mounting `host` at `container`.
    pub(crate) fn volume(&self, host: &Path, container: &str) -> String {
        match self {
            Self::Docker { .. } => format!("{}:{container}", host.display()),
            Self::Podman { .. } => format!("{}:{container}:Z", host.display()),
        }
    }
}
