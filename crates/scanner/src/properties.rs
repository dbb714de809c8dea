//! `sonar-project.properties` generation.
//!
//! The scanner container reads its project settings from a properties file at
//! the root of the mounted directory. [`ScannerProperties`] renders the fixed
//! set of keys, one `key=value` per line, in a stable order.

use crate::error::{ErrorKind, Result};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::instrument;

/// File name the scanner looks for in its working directory.
pub const PROPERTIES_FILE_NAME: &str = "sonar-project.properties";

/// `sonar.sources` value used unless the tree has exactly one top-level folder.
pub const CURRENT_DIR_SOURCES: &str = ".";

/// Which SonarCloud project a scan reports to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Project {
    pub key: String,
    pub organization: String,
    pub branch: String,
}

/// Ordered scanner settings rendered as a Java `.properties` file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScannerProperties {
    entries: Vec<(&'static str, String)>,
}

impl ScannerProperties {
    pub fn new(project: &Project, host_url: impl Into<String>, sources: impl Into<String>) -> Self {
        let entries = vec![
            ("sonar.projectKey", project.key.clone()),
            ("sonar.organization", project.organization.clone()),
            ("sonar.host.url", host_url.into()),
            ("sonar.sources", sources.into()),
            ("sonar.branch.name", project.branch.clone()),
        ];
        Self { entries }
    }

    /// Build the properties for an extracted tree, deriving `sonar.sources`
    /// from its top-level directories.
    pub fn for_tree(root: &Path, project: &Project, host_url: impl Into<String>) -> Result<Self> {
        let sources = sources_for(&top_level_directories(root)?);
        tracing::debug!(sources = %sources, "Resolved sonar.sources");
        Ok(Self::new(project, host_url, sources))
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.iter().find(|(k, _)| *k == key).map(|(_, v)| v.as_str())
    }

    /// Write [`PROPERTIES_FILE_NAME`] into `dir`, returning its path.
    #[instrument(skip(self), fields(dir = %dir.display()))]
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf> {
        let path = dir.join(PROPERTIES_FILE_NAME);
        fs::write(&path, self.to_string()).map_err(|e| ErrorKind::config_write(&path, e))?;
        tracing::debug!(path = %path.display(), "Scanner properties written");
        Ok(path)
    }
}

impl Display for ScannerProperties {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        for (key, value) in &self.entries {
            writeln!(f, "{key}={}", escape_value(value))?;
        }
        Ok(())
    }
}

/// A single top-level folder is the project root (the usual shape of a
/// "Download ZIP" archive). Zero or several folders scan the whole tree.
pub fn sources_for(directories: &[String]) -> String {
    match directories {
        [only] => only.clone(),
        _ => CURRENT_DIR_SOURCES.to_string(),
    }
}

/// Names of the immediate child directories of `root`, sorted. Regular files
/// (the persisted archive among them) are ignored.
pub fn top_level_directories(root: &Path) -> Result<Vec<String>> {
    let listing_failed = |e: std::io::Error| ErrorKind::config_write(root, e);
    let mut names = Vec::new();
    for entry in fs::read_dir(root).map_err(listing_failed)? {
        let entry = entry.map_err(listing_failed)?;
        if entry.path().is_dir() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    names.sort();
    Ok(names)
}

/// https://docs.oracle.com/javase/8/docs/api/java/util/Properties.html#load-java.io.Reader-
///
/// Line terminators would otherwise let a request value start a new key.
fn escape_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for (i, c) in value.chars().enumerate() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\t' => escaped.push_str("\\t"),
            '\x0C' => escaped.push_str("\\f"),
            // Leading whitespace is stripped by the loader.
            ' ' if i == 0 => escaped.push_str("\\ "),
            c => escaped.push(c),
        }
    }
    escaped
}
