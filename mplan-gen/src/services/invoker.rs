//! External generator invocation
//!
//! Sole point of contact with the generator program. Runs it as a child
//! process in a fixed working directory, captures stdout and stderr, and
//! enforces a hard wall-clock timeout. The generator may write artifact
//! files as a side channel; the invoker never inspects the file system.
//! Artifact paths travel through the output markers (`services::parser`).

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::process::Command;

/// Invocation errors, kept distinct from a non-zero exit of a child that
/// did start (that is a normal `InvocationResult`)
#[derive(Debug, Error)]
pub enum InvokeError {
    /// The child process could not be started (missing executable,
    /// permission error)
    #[error("Failed to launch generator: {0}")]
    LaunchFailed(String),

    /// The child exceeded its wall-clock budget and was terminated
    #[error("Generator timed out after {0:?}")]
    TimedOut(Duration),
}

/// Result of one completed invocation
#[derive(Debug, Clone)]
pub struct InvocationResult {
    /// Exit code; None when the child was killed by a signal
    pub exit_code: Option<i32>,
    /// Combined stdout + stderr text
    pub output: String,
    /// Wall-clock duration of the invocation
    pub elapsed: Duration,
}

impl InvocationResult {
    /// Whether the child signaled success
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Runs one external program with a timeout
#[derive(Debug, Clone)]
pub struct GeneratorInvoker {
    program: PathBuf,
    workdir: PathBuf,
}

impl GeneratorInvoker {
    pub fn new(program: impl Into<PathBuf>, workdir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            workdir: workdir.into(),
        }
    }

    /// Program this invoker runs
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Run the generator with the given argument vector
    ///
    /// On timeout expiry the child is terminated (`kill_on_drop`) and a
    /// distinguished `TimedOut` is returned, never an empty success.
    pub async fn invoke(
        &self,
        args: &[String],
        timeout: Duration,
    ) -> Result<InvocationResult, InvokeError> {
        tracing::info!(
            program = %self.program.display(),
            args = ?args,
            timeout_secs = timeout.as_secs(),
            "Invoking generator"
        );

        let start = Instant::now();

        let child = Command::new(&self.program)
            .args(args)
            .current_dir(&self.workdir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| InvokeError::LaunchFailed(e.to_string()))?;

        // Dropping the wait future on timeout drops the child handle, and
        // kill_on_drop terminates the process.
        let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => return Err(InvokeError::LaunchFailed(e.to_string())),
            Err(_) => {
                let elapsed = start.elapsed();
                tracing::warn!(
                    program = %self.program.display(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Generator timed out, child terminated"
                );
                return Err(InvokeError::TimedOut(timeout));
            }
        };

        let elapsed = start.elapsed();

        // stdout first, then stderr, matching the historical consumer of
        // the marker protocol
        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));

        let result = InvocationResult {
            exit_code: output.status.code(),
            output: combined,
            elapsed,
        };

        tracing::info!(
            program = %self.program.display(),
            exit_code = ?result.exit_code,
            elapsed_ms = elapsed.as_millis() as u64,
            output_bytes = result.output.len(),
            "Generator invocation finished"
        );

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invoker_for(program: &str) -> GeneratorInvoker {
        GeneratorInvoker::new(program, std::env::temp_dir())
    }

    #[tokio::test]
    async fn captures_stdout_and_exit_code() {
        let invoker = invoker_for("sh");
        let result = invoker
            .invoke(
                &["-c".to_string(), "echo AUDIO_FILE=/tmp/a.wav".to_string()],
                Duration::from_secs(5),
            )
            .await
            .unwrap();
        assert!(result.success());
        assert!(result.output.contains("AUDIO_FILE=/tmp/a.wav"));
    }

    #[tokio::test]
    async fn stderr_is_appended_after_stdout() {
        let invoker = invoker_for("sh");
        let result = invoker
            .invoke(
                &["-c".to_string(), "echo out; echo err >&2".to_string()],
                Duration::from_secs(5),
            )
            .await
            .unwrap();
        let out_pos = result.output.find("out").unwrap();
        let err_pos = result.output.find("err").unwrap();
        assert!(out_pos < err_pos);
    }

    #[tokio::test]
    async fn nonzero_exit_is_a_result_not_an_error() {
        let invoker = invoker_for("sh");
        let result = invoker
            .invoke(
                &["-c".to_string(), "echo partial; exit 3".to_string()],
                Duration::from_secs(5),
            )
            .await
            .unwrap();
        assert!(!result.success());
        assert_eq!(result.exit_code, Some(3));
        assert!(result.output.contains("partial"));
    }

    #[tokio::test]
    async fn missing_executable_is_launch_failed() {
        let invoker = invoker_for("/nonexistent/generator-binary");
        let err = invoker
            .invoke(&[], Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, InvokeError::LaunchFailed(_)));
    }

    #[tokio::test]
    async fn timeout_is_distinguished() {
        let invoker = invoker_for("sh");
        let start = Instant::now();
        let err = invoker
            .invoke(
                &["-c".to_string(), "sleep 30".to_string()],
                Duration::from_millis(200),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, InvokeError::TimedOut(_)));
        // The invocation must not run anywhere near the child's sleep
        assert!(start.elapsed() < Duration::from_secs(5));
    }
}
