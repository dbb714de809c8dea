use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use std::path::{Path, PathBuf};

/// File name the uploaded archive is persisted under.
pub const ARCHIVE_FILE_NAME: &str = "repo.zip";

/// A uniquely named directory owned by a single analysis request.
///
/// The directory (and everything extracted into it) is deleted by
/// [`remove`](Self::remove), or when the value is dropped on any other exit
/// path. Deletion failures are logged and never surfaced: they must not mask
/// whatever error the request is already reporting, nor fail a request that
/// otherwise succeeded.
///
/// Removal is blocking; async callers should hand the value to a blocking
/// thread rather than letting it drop on a runtime worker.
#[derive(Debug)]
pub struct WorkingDirectory {
    path: PathBuf,
    removed: bool,
}

impl WorkingDirectory {
    /// Create a fresh directory `<base>/<prefix><random>`.
    ///
    /// The random suffix comes from [`tempfile`], so concurrent requests
    /// sharing the same base never collide.
    pub fn create(base: impl AsRef<Path>, prefix: &str) -> Result<Self> {
        let base = base.as_ref();
        let path = tempfile::Builder::new()
            .prefix(prefix)
            .tempdir_in(base)
            .or_raise(|| ErrorKind::WorkingDirectory(base.to_path_buf()))?
            // Removal is handled by our own Drop so that failures get logged.
            .keep();
        tracing::debug!(path = %path.display(), "Working directory created");
        Ok(Self { path, removed: false })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Final path component, unique per request.
    pub fn name(&self) -> &str {
        self.path.file_name().and_then(|n| n.to_str()).unwrap_or_default()
    }

    /// Write the uploaded archive bytes to [`ARCHIVE_FILE_NAME`] inside the
    /// directory and return the file path.
    pub fn persist_archive(&self, bytes: &[u8]) -> Result<PathBuf> {
        let target = self.path.join(ARCHIVE_FILE_NAME);
        std::fs::write(&target, bytes).map_err(|e| ErrorKind::io(&target, e))?;
        tracing::trace!(path = %target.display(), bytes = bytes.len(), "Archive persisted");
        Ok(target)
    }

    /// Delete the directory tree now. Returns `false` if it could not be
    /// removed (already logged).
    pub fn remove(mut self) -> bool {
        self.remove_tree()
    }

    fn remove_tree(&mut self) -> bool {
        self.removed = true;
        match std::fs::remove_dir_all(&self.path) {
            Ok(()) => {
                tracing::debug!(path = %self.path.display(), "Working directory removed");
                true
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => true,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Failed to remove working directory");
                false
            },
        }
    }
}

impl Drop for WorkingDirectory {
    fn drop(&mut self) {
        if !self.removed {
            self.remove_tree();
        }
    }
}
