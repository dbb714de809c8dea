//! Entry name validation.
//!
//! Archive entry names are attacker-controlled. Before an entry touches the
//! disk its name is resolved lexically and rejected if it would land outside
//! the working directory.

use crate::error::{ErrorKind, Result};
use std::path::{Component, Path, PathBuf};

/// Resolves an archive entry name into a path relative to the extraction root.
///
/// `.` components and repeated separators are dropped; `..` pops the previous
/// component. The name is rejected when it is absolute, carries a platform
/// prefix, contains a null byte, or climbs above the root at any point.
///
/// The returned path may be empty (e.g. for `./` or `a/..`), meaning the root
/// itself.
///
/// ```
/// use std::path::Path;
/// use sonargate_archive::normalize_entry;
/// assert_eq!(normalize_entry("repo/./src//main.rs").unwrap(), Path::new("repo/src/main.rs"));
/// assert_eq!(normalize_entry("repo/docs/../README.md").unwrap(), Path::new("repo/README.md"));
/// assert!(normalize_entry("../../etc/passwd").is_err());
/// assert!(normalize_entry("/etc/passwd").is_err());
/// ```
pub fn normalize(name: &str) -> Result<PathBuf> {
    let unsafe_path = || ErrorKind::UnsafePath(name.to_string());
    if name.as_bytes().contains(&0) {
        exn::bail!(unsafe_path());
    }
    let mut components = Vec::new();
    for component in Path::new(name).components() {
        match component {
            Component::Normal(s) => components.push(s),
            Component::CurDir => {},
            // Zip stores relative names; a leading slash is either a broken
            // archiver or someone aiming at `/etc`.
            Component::RootDir | Component::Prefix(_) => exn::bail!(unsafe_path()),
            Component::ParentDir => {
                if components.pop().is_none() {
                    exn::bail!(unsafe_path());
                }
            },
        }
    }
    Ok(components.into_iter().collect())
}

/// Joins a normalized entry onto `root`, asserting the result stays inside it.
pub(crate) fn resolve(root: &Path, name: &str) -> Result<Option<PathBuf>> {
    let relative = normalize(name)?;
    if relative.as_os_str().is_empty() {
        return Ok(None);
    }
    let target = root.join(relative);
    if !target.starts_with(root) {
        exn::bail!(ErrorKind::UnsafePath(name.to_string()));
    }
    Ok(Some(target))
}
