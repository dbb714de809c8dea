//! Scripted scanner for testing.

use crate::error::{ErrorKind, Result};
use crate::properties::PROPERTIES_FILE_NAME;
use crate::{Credential, ScanOutput, Scanner};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// What a [`MockScanner`] saw when it was invoked.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObservedScan {
    pub workdir: PathBuf,
    pub credential: String,
    /// Contents of `sonar-project.properties`, if present at scan time.
    pub properties: Option<String>,
    /// Every regular file under the working directory, relative and sorted.
    pub files: Vec<PathBuf>,
}

enum Outcome {
    Output(ScanOutput),
    Fail(ErrorKind),
}

/// A [`Scanner`] that never launches anything.
///
/// It snapshots the working directory it is handed (the directory is gone by
/// the time a test can look at it) and replies with a scripted result.
///
/// # Examples
///
/// ```
/// use sonargate_scanner::{Credential, MockScanner, Scanner};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let dir = tempfile::tempdir().unwrap();
/// let scanner = MockScanner::exiting(2, "INFO: EXECUTION FAILURE\n", "");
/// let output = scanner.scan(dir.path(), &Credential::new("token")).await.unwrap();
/// assert_eq!(output.exit_code, 2);
/// assert_eq!(scanner.observed().len(), 1);
/// # }
/// ```
pub struct MockScanner {
    outcome: Outcome,
    observed: Mutex<Vec<ObservedScan>>,
}

impl MockScanner {
    pub fn exiting(exit_code: i32, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self::with_outcome(Outcome::Output(ScanOutput::new(stdout, stderr, exit_code)))
    }

    pub fn failing(kind: ErrorKind) -> Self {
        Self::with_outcome(Outcome::Fail(kind))
    }

    fn with_outcome(outcome: Outcome) -> Self {
        Self { outcome, observed: Mutex::new(Vec::new()) }
    }

    pub fn observed(&self) -> Vec<ObservedScan> {
        self.observed.lock().expect("MockScanner lock poisoned").clone()
    }
}

impl Default for MockScanner {
    fn default() -> Self {
        Self::exiting(0, "", "")
    }
}

#[async_trait]
impl Scanner for MockScanner {
    async fn scan(&self, workdir: &Path, credential: &Credential) -> Result<ScanOutput> {
        let observed = ObservedScan {
            workdir: workdir.to_path_buf(),
            credential: credential.expose().to_string(),
            properties: std::fs::read_to_string(workdir.join(PROPERTIES_FILE_NAME)).ok(),
            files: walk(workdir),
        };
        self.observed.lock().expect("MockScanner lock poisoned").push(observed);
        match &self.outcome {
            Outcome::Output(output) => Ok(output.clone()),
            Outcome::Fail(kind) => exn::bail!(kind.clone()),
        }
    }
}

fn walk(root: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        let Ok(entries) = std::fs::read_dir(&dir) else {
            continue;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
            } else if let Ok(relative) = path.strip_prefix(root) {
                files.push(relative.to_path_buf());
            }
        }
    }
    files.sort();
    files
}
