use std::fmt::{Display, Formatter, Result as FmtResult};
use std::process::ExitStatus;

/// Everything a finished scanner run produced.
///
/// Rendered with [`Display`] as every stdout line, then every stderr line
/// (concatenated, not interleaved), then a blank line and `Exit code: <n>`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ScanOutput {
    pub stdout: String,
    pub stderr: String,
    /// Process exit code. `128 + signal` if the process was killed by a
    /// signal, `-1` if neither is known.
    pub exit_code: i32,
}

impl ScanOutput {
    pub fn new(stdout: impl Into<String>, stderr: impl Into<String>, exit_code: i32) -> Self {
        Self { stdout: stdout.into(), stderr: stderr.into(), exit_code }
    }

    pub(crate) fn from_process(stdout: &[u8], stderr: &[u8], status: ExitStatus) -> Self {
        Self {
            stdout: String::from_utf8_lossy(stdout).into_owned(),
            stderr: String::from_utf8_lossy(stderr).into_owned(),
            exit_code: exit_code(status),
        }
    }

    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

impl Display for ScanOutput {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        for line in self.stdout.lines().chain(self.stderr.lines()) {
            writeln!(f, "{line}")?;
        }
        write!(f, "\nExit code: {}", self.exit_code)
    }
}

fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    -1
}
