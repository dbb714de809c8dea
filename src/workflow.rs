//! The analysis workflow: working directory, extraction, properties, scan.

use crate::error::{ErrorKind, Result};
use crate::request::AnalysisRequest;
use bytes::Bytes;
use sonargate_archive::{WorkingDirectory, extract};
use sonargate_scanner::{Project, ScanOutput, ScannerHandle, ScannerProperties};
use std::io::Cursor;
use std::path::PathBuf;
use std::time::Instant;
use tracing::instrument;

/// Runs validated requests end to end.
///
/// Every request gets its own [`WorkingDirectory`], which is removed when
/// [`analyze`](Self::analyze) returns, whatever the outcome. If the caller's
/// future is dropped mid-scan, the scanner process is killed and the directory
/// is removed all the same.
#[derive(Clone)]
pub struct Analyzer {
    base: PathBuf,
    prefix: String,
    host_url: String,
    scanner: ScannerHandle,
}

impl Analyzer {
    pub fn new(base: impl Into<PathBuf>, prefix: impl Into<String>, host_url: impl Into<String>, scanner: ScannerHandle) -> Self {
        Self {
            base: base.into(),
            prefix: prefix.into(),
            host_url: host_url.into(),
            scanner,
        }
    }

    #[instrument(skip_all, fields(project = %request.project.key, organization = %request.project.organization, branch = %request.project.branch))]
    pub async fn analyze(&self, request: AnalysisRequest) -> Result<ScanOutput> {
        let started = Instant::now();
        let AnalysisRequest { archive, project, credential } = request;
        let workdir = WorkingDirectory::create(&self.base, &self.prefix).map_err(ErrorKind::extraction)?;
        tracing::info!(workdir = workdir.name(), archive_bytes = archive.len(), "Analysis started");

        // The guard travels into the blocking task and back, so a dropped
        // request can never race extraction against removal.
        let host_url = self.host_url.clone();
        let (workdir, prepared) = tokio::task::spawn_blocking(move || {
            let prepared = prepare(&workdir, &archive, &project, host_url);
            (workdir, prepared)
        })
        .await
        .map_err(|e| ErrorKind::Internal(e.to_string()))?;

        let result = match prepared {
            Ok(()) => self.scanner.scan(workdir.path(), &credential).await.map_err(ErrorKind::execution),
            Err(err) => Err(err),
        };
        release(workdir).await;

        let output = result?;
        tracing::info!(
            exit_code = output.exit_code,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Analysis finished"
        );
        Ok(output)
    }
}

/// Remove the working directory on the blocking pool. If this future is
/// dropped first, the guard's `Drop` still removes it.
async fn release(workdir: WorkingDirectory) {
    if let Err(e) = tokio::task::spawn_blocking(move || workdir.remove()).await {
        tracing::warn!(error = %e, "Working directory removal task failed");
    }
}

/// Persist the archive, expand it and write `sonar-project.properties`.
fn prepare(workdir: &WorkingDirectory, archive: &Bytes, project: &Project, host_url: String) -> Result<()> {
    workdir.persist_archive(archive).map_err(ErrorKind::extraction)?;
    extract(Cursor::new(archive.as_ref()), workdir.path()).map_err(ErrorKind::extraction)?;
    let properties =
        ScannerProperties::for_tree(workdir.path(), project, host_url).map_err(ErrorKind::config_write)?;
    properties.write_to(workdir.path()).map_err(ErrorKind::config_write)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sonargate_archive::error::ErrorKind as ArchiveErrorKind;
    use sonargate_scanner::error::ErrorKind as ScannerErrorKind;
    use sonargate_scanner::{Credential, MockScanner};
    use std::io::Write;
    use std::sync::Arc;
    use tempfile::TempDir;
    use zip::ZipWriter;
    use zip::write::SimpleFileOptions;

    fn archive(entries: &[(&str, &str)]) -> Bytes {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, contents) in entries {
            match name.ends_with('/') {
                true => writer.add_directory(*name, SimpleFileOptions::default()).unwrap(),
                false => {
                    writer.start_file(*name, SimpleFileOptions::default()).unwrap();
                    writer.write_all(contents.as_bytes()).unwrap();
                },
            }
        }
        Bytes::from(writer.finish().unwrap().into_inner())
    }

    fn request(archive: Bytes) -> AnalysisRequest {
        AnalysisRequest {
            archive,
            project: Project {
                key: "acme_widgets".to_string(),
                organization: "acme".to_string(),
                branch: "main".to_string(),
            },
            credential: Credential::new("squ_token"),
        }
    }

    fn analyzer(base: &TempDir, scanner: Arc<MockScanner>) -> Analyzer {
        Analyzer::new(base.path(), "sonar_repo_", "https://sonarcloud.io", scanner)
    }

    fn is_empty(base: &TempDir) -> bool {
        std::fs::read_dir(base.path()).unwrap().next().is_none()
    }

    #[tokio::test]
    async fn test_analyze_prepares_directory_and_cleans_up() {
        let base = TempDir::new().unwrap();
        let scanner = Arc::new(MockScanner::exiting(0, "INFO: EXECUTION SUCCESS\n", ""));
        let output = analyzer(&base, scanner.clone())
            .analyze(request(archive(&[("widgets/", ""), ("widgets/main.rs", "fn main() {}")])))
            .await
            .unwrap();
        assert_eq!(output.exit_code, 0);

        let observed = scanner.observed();
        assert_eq!(observed.len(), 1);
        let scan = &observed[0];
        assert_eq!(scan.credential, "squ_token");
        assert!(scan.workdir.file_name().unwrap().to_str().unwrap().starts_with("sonar_repo_"));
        assert!(scan.properties.as_deref().unwrap().contains("sonar.sources=widgets\n"));
        assert_eq!(
            scan.files,
            [
                PathBuf::from("repo.zip"),
                PathBuf::from("sonar-project.properties"),
                PathBuf::from("widgets/main.rs"),
            ]
        );
        assert!(is_empty(&base));
    }

    #[tokio::test]
    async fn test_analyze_bad_archive_skips_scanner() {
        let base = TempDir::new().unwrap();
        let scanner = Arc::new(MockScanner::default());
        let err = analyzer(&base, scanner.clone())
            .analyze(request(archive(&[("../escape.txt", "nope")])))
            .await
            .unwrap_err();
        assert!(matches!(&*err, ErrorKind::Extraction(ArchiveErrorKind::UnsafePath(_))));
        assert!(scanner.observed().is_empty());
        assert!(is_empty(&base));
    }

    #[tokio::test]
    async fn test_analyze_scanner_failure_cleans_up() {
        let base = TempDir::new().unwrap();
        let scanner = Arc::new(MockScanner::failing(ScannerErrorKind::Timeout(5)));
        let err = analyzer(&base, scanner).analyze(request(archive(&[("a.txt", "a")]))).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Execution(ScannerErrorKind::Timeout(5))));
        assert!(is_empty(&base));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_directory_gone_when_analyze_returns() {
        let base = TempDir::new().unwrap();
        let scanner = Arc::new(MockScanner::default());
        let entries: Vec<(String, String)> = (0..64).map(|i| (format!("src/m{i}/lib.rs"), "x".repeat(1024))).collect();
        let entries: Vec<(&str, &str)> = entries.iter().map(|(n, c)| (n.as_str(), c.as_str())).collect();
        analyzer(&base, scanner.clone()).analyze(request(archive(&entries))).await.unwrap();
        assert_eq!(scanner.observed()[0].files.len(), 64 + 2);
        assert!(!scanner.observed()[0].workdir.exists());
        assert!(is_empty(&base));
    }

    #[tokio::test]
    async fn test_analyze_missing_base_directory() {
        let base = TempDir::new().unwrap();
        let scanner = Arc::new(MockScanner::default());
        let analyzer = Analyzer::new(base.path().join("missing"), "sonar_repo_", "https://sonarcloud.io", scanner);
        let err = analyzer.analyze(request(archive(&[("a.txt", "a")]))).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Extraction(ArchiveErrorKind::WorkingDirectory(_))));
    }
}
