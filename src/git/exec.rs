use crate::error::GitError;
use std::ffi::OsStr;
use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tokio::time::timeout;
use tracing::debug;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Runs the git binary with a bounded time budget.
#[derive(Debug, Clone)]
pub struct GitRunner {
    program: String,
    timeout: Duration,
}

impl Default for GitRunner {
    fn default() -> Self {
        Self::new("git", DEFAULT_TIMEOUT)
    }
}

impl GitRunner {
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Runs the program in `cwd` and returns its stdout. The child is killed
    /// when the budget is exhausted.
    pub async fn run<I, S>(&self, cwd: &Path, args: I) -> Result<String, GitError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut cmd = Command::new(&self.program);
        cmd.args(args)
            .current_dir(cwd)
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let start = Instant::now();
        let child = cmd.spawn().map_err(GitError::Spawn)?;

        let output = match timeout(self.timeout, child.wait_with_output()).await {
            Ok(result) => result.map_err(GitError::Spawn)?,
            Err(_) => {
                debug!(cwd = %cwd.display(), after = ?self.timeout, "git command timed out");
                return Err(GitError::Timeout { after: self.timeout });
            }
        };

        debug!(
            cwd = %cwd.display(),
            status = %output.status,
            bytes = output.stdout.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "git command finished"
        );

        if !output.status.success() {
            return Err(GitError::CommandFailed {
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    #[tokio::test]
    async fn stalled_command_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let runner = GitRunner::new("sleep", Duration::from_millis(200));

        let start = Instant::now();
        let err = runner.run(dir.path(), ["5"]).await.unwrap_err();

        assert!(matches!(err, GitError::Timeout { .. }));
        assert!(start.elapsed() < Duration::from_secs(3));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn non_zero_exit_is_command_failure() {
        let dir = tempfile::tempdir().unwrap();
        let runner = GitRunner::new("false", Duration::from_secs(5));

        let err = runner.run(dir.path(), Vec::<&str>::new()).await.unwrap_err();
        assert!(matches!(err, GitError::CommandFailed { .. }));
    }

    #[tokio::test]
    async fn missing_program_fails_to_spawn() {
        let dir = tempfile::tempdir().unwrap();
        let runner = GitRunner::new("gitpulse-no-such-binary", Duration::from_secs(1));

        let err = runner.run(dir.path(), ["--version"]).await.unwrap_err();
        assert!(matches!(err, GitError::Spawn(_)));
    }
}
