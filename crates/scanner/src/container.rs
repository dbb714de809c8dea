use crate::error::{ErrorKind, Result};
use crate::{ContainerRuntime, Credential, ScanOutput, Scanner};
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tracing::instrument;

pub const DEFAULT_IMAGE: &str = "sonarsource/sonar-scanner-cli";
pub const DEFAULT_MOUNT_PATH: &str = "/usr/src";
pub const DEFAULT_TOKEN_ENV: &str = "SONAR_TOKEN";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// How long to wait for `<runtime> rm -f` after a timed-out scan.
const REMOVE_TIMEOUT: Duration = Duration::from_secs(30);

/// Runs `sonar-scanner-cli` in a throwaway container.
///
/// The working directory is bind-mounted at the image's expected source path
/// and the credential travels as an environment variable of the runtime
/// process, forwarded by name (`-e SONAR_TOKEN`), so it never shows up on a
/// command line. No shell is involved at any point.
#[derive(Clone, Debug)]
pub struct ContainerScanner {
    runtime: ContainerRuntime,
    image: String,
    mount_path: String,
    token_env: String,
    timeout: Duration,
}

impl ContainerScanner {
    pub fn new(runtime: ContainerRuntime) -> Self {
        Self {
            runtime,
            image: DEFAULT_IMAGE.to_string(),
            mount_path: DEFAULT_MOUNT_PATH.to_string(),
            token_env: DEFAULT_TOKEN_ENV.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = image.into();
        self
    }

    pub fn with_mount_path(mut self, mount_path: impl Into<String>) -> Self {
        self.mount_path = mount_path.into();
        self
    }

    pub fn with_token_env(mut self, token_env: impl Into<String>) -> Self {
        self.token_env = token_env.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn runtime(&self) -> &ContainerRuntime {
        &self.runtime
    }

    /// The exact process that [`scan`](Scanner::scan) will launch.
    pub fn invocation(&self, workdir: &Path, credential: &Credential) -> Invocation {
        let container = container_name(workdir);
        let args = [
            "run".into(),
            "--rm".into(),
            "--name".into(),
            container.clone(),
            "-e".into(),
            self.token_env.clone(),
            "-v".into(),
            self.runtime.volume(workdir, &self.mount_path),
            self.image.clone(),
        ];
        Invocation {
            program: self.runtime.program().to_path_buf(),
            args: args.into_iter().map(OsString::from).collect(),
            token_env: self.token_env.clone(),
            credential: credential.clone(),
            container: Some(container),
        }
    }
}

#[async_trait]
impl Scanner for ContainerScanner {
    async fn scan(&self, workdir: &Path, credential: &Credential) -> Result<ScanOutput> {
        self.invocation(workdir, credential).execute(self.timeout).await
    }
}

/// A fully resolved runtime command line plus its environment.
#[derive(Debug)]
pub struct Invocation {
    program: PathBuf,
    args: Vec<OsString>,
    token_env: String,
    credential: Credential,
    /// Container to force-remove if the run has to be abandoned.
    container: Option<String>,
}

impl Invocation {
    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn args(&self) -> &[OsString] {
        &self.args
    }

    fn command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .env(&self.token_env, self.credential.expose())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        command
    }

    /// Launch, collect both streams to completion, and wait for exit.
    ///
    /// A non-zero exit status is returned as data. Only failing to launch,
    /// failing to read the streams, or running past `timeout` are errors; on
    /// timeout the runtime client is killed and the container removed.
    #[instrument(skip_all, fields(program = %self.program.display(), container = self.container.as_deref()))]
    pub async fn execute(&self, timeout: Duration) -> Result<ScanOutput> {
        let started = Instant::now();
        let child = self.command().spawn().map_err(|e| ErrorKind::launch(&self.program, e))?;
        tracing::debug!(pid = child.id(), "Scanner launched");
        let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(result) => result.map_err(ErrorKind::output)?,
            Err(_) => {
                // Dropping the wait future dropped the child, which kills it.
                tracing::warn!(timeout_secs = timeout.as_secs(), "Scanner timed out; killed");
                self.remove_container().await;
                exn::bail!(ErrorKind::Timeout(timeout.as_secs()));
            },
        };
        let scan = ScanOutput::from_process(&output.stdout, &output.stderr, output.status);
        tracing::info!(
            exit_code = scan.exit_code,
            elapsed_ms = started.elapsed().as_millis() as u64,
            stdout_bytes = output.stdout.len(),
            stderr_bytes = output.stderr.len(),
            "Scanner finished"
        );
        Ok(scan)
    }

    /// Killing the runtime client does not stop the container it started.
    async fn remove_container(&self) {
        let Some(container) = &self.container else {
            return;
        };
        let mut command = Command::new(&self.program);
        command.args(["rm", "-f", container.as_str()]).stdin(Stdio::null()).kill_on_drop(true);
        match tokio::time::timeout(REMOVE_TIMEOUT, command.output()).await {
            Ok(Ok(output)) if output.status.success() => tracing::debug!(container, "Container removed"),
            Ok(Ok(output)) => tracing::warn!(
                container,
                stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                "Container removal failed"
            ),
            Ok(Err(e)) => tracing::warn!(container, error = %e, "Container removal failed to launch"),
            Err(_) => tracing::warn!(container, "Container removal timed out"),
        }
    }
}

/// Docker names allow `[a-zA-Z0-9][a-zA-Z0-9_.-]*`; working directory names
/// already carry a random suffix, which keeps container names unique too.
fn container_name(workdir: &Path) -> String {
    let suffix: String = workdir
        .file_name()
        .map(|name| name.to_string_lossy())
        .unwrap_or_default()
        .chars()
        .map(|c| match c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-') {
            true => c,
            false => '-',
        })
        .collect();
    format!("sonargate-{suffix}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shell(script: &str) -> Invocation {
        Invocation {
            program: PathBuf::from("sh"),
            args: vec!["-c".into(), script.into()],
            token_env: DEFAULT_TOKEN_ENV.to_string(),
            credential: Credential::new("s3cr3t"),
            container: None,
        }
    }

    #[test]
    fn test_invocation_argument_vector() {
        let scanner = ContainerScanner::new(ContainerRuntime::from_path("/usr/bin/docker"));
        let invocation = scanner.invocation(Path::new("/tmp/sonar_repo_Ab12"), &Credential::new("s3cr3t"));
        assert_eq!(invocation.program(), Path::new("/usr/bin/docker"));
        let args: Vec<&str> = invocation.args().iter().map(|a| a.to_str().unwrap()).collect();
        assert_eq!(
            args,
            [
                "run",
                "--rm",
                "--name",
                "sonargate-sonar_repo_Ab12",
                "-e",
                "SONAR_TOKEN",
                "-v",
                "/tmp/sonar_repo_Ab12:/usr/src",
                "sonarsource/sonar-scanner-cli",
            ]
        );
    }

    #[test]
    fn test_credential_never_in_arguments_or_debug() {
        let scanner = ContainerScanner::new(ContainerRuntime::from_path("podman"))
            .with_image("example/scanner:1")
            .with_mount_path("/src")
            .with_token_env("TOKEN");
        let invocation = scanner.invocation(Path::new("/tmp/w"), &Credential::new("s3cr3t"));
        assert!(invocation.args().iter().all(|a| !a.to_string_lossy().contains("s3cr3t")));
        assert!(!format!("{invocation:?}").contains("s3cr3t"));
        assert!(invocation.args().contains(&OsString::from("/tmp/w:/src:Z")));
        assert!(invocation.args().contains(&OsString::from("TOKEN")));
        assert_eq!(invocation.args().last(), Some(&OsString::from("example/scanner:1")));
    }

    #[test]
    fn test_container_name_is_sanitized() {
        assert_eq!(container_name(Path::new("/tmp/sonar repo!x")), "sonargate-sonar-repo-x");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_execute_collects_both_streams() {
        let output = shell("echo out1; echo err1 1>&2; echo out2; exit 3").execute(DEFAULT_TIMEOUT).await.unwrap();
        assert_eq!(output.stdout, "out1\nout2\n");
        assert_eq!(output.stderr, "err1\n");
        assert_eq!(output.exit_code, 3);
        assert_eq!(output.to_string(), "out1\nout2\nerr1\n\nExit code: 3");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_execute_passes_credential_through_env() {
        let output = shell("printf '%s' \"$SONAR_TOKEN\"").execute(DEFAULT_TIMEOUT).await.unwrap();
        assert_eq!(output.stdout, "s3cr3t");
        assert!(output.success());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_execute_reports_signal_as_exit_code() {
        let output = shell("kill -9 $$").execute(DEFAULT_TIMEOUT).await.unwrap();
        assert_eq!(output.exit_code, 128 + 9);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_execute_times_out() {
        let err = shell("exec sleep 10").execute(Duration::from_millis(200)).await.unwrap_err();
        assert!(matches!(*err, ErrorKind::Timeout(_)));
    }

    #[tokio::test]
    async fn test_execute_missing_program() {
        let mut invocation = shell("true");
        invocation.program = PathBuf::from("/definitely/not/a/container/runtime");
        let err = invocation.execute(DEFAULT_TIMEOUT).await.unwrap_err();
        assert!(matches!(*err, ErrorKind::Launch { .. }));
    }
}
