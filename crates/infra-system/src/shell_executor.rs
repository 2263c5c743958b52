// Shell executor implementation
// reason: async-trait, tokio for async process management
use async_trait::async_trait;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tokio::process::Command as ProcessCommand;
use tracing::debug;

use tierd_core::domain::Command;
use tierd_core::port::command_executor::{CommandExecutor, ExecutionError, ExecutionOutcome};
use tierd_core::port::TimeProvider;

/// Default shell used to interpret command lines
pub const DEFAULT_SHELL: &str = "bash";

const READ_CHUNK: usize = 4096;

/// Runs each command line through `<shell> -c <line>`.
///
/// The child inherits the daemon's environment and working directory; no
/// sandboxing or timeout is applied.
pub struct ShellExecutor {
    shell: String,
    time_provider: Arc<dyn TimeProvider>,
}

impl ShellExecutor {
    /// Create a new shell executor
    ///
    /// # Example
    /// ```ignore
    /// let executor = ShellExecutor::new("bash", Arc::new(SystemTimeProvider));
    /// ```
    pub fn new(shell: impl Into<String>, time_provider: Arc<dyn TimeProvider>) -> Self {
        Self {
            shell: shell.into(),
            time_provider,
        }
    }

    pub fn shell(&self) -> &str {
        &self.shell
    }

    /// Spawn child process, collect its output, and wait for it to exit.
    ///
    /// stdout and stderr are read concurrently and appended to a single
    /// buffer in the order chunks arrive.
    async fn spawn_and_wait(&self, line: &str) -> Result<(ExitStatus, Vec<u8>), ExecutionError> {
        let mut child = ProcessCommand::new(&self.shell)
            .arg("-c")
            .arg(line)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| ExecutionError::SpawnFailed(format!("{}: {}", self.shell, e)))?;

        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| ExecutionError::IoError("stdout not captured".to_string()))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| ExecutionError::IoError("stderr not captured".to_string()))?;

        let mut combined = Vec::new();
        let mut out_buf = [0u8; READ_CHUNK];
        let mut err_buf = [0u8; READ_CHUNK];
        let (mut out_open, mut err_open) = (true, true);

        while out_open || err_open {
            tokio::select! {
                read = stdout.read(&mut out_buf), if out_open => {
                    let n = read.map_err(|e| ExecutionError::IoError(e.to_string()))?;
                    if n == 0 {
                        out_open = false;
                    } else {
                        combined.extend_from_slice(&out_buf[..n]);
                    }
                }
                read = stderr.read(&mut err_buf), if err_open => {
                    let n = read.map_err(|e| ExecutionError::IoError(e.to_string()))?;
                    if n == 0 {
                        err_open = false;
                    } else {
                        combined.extend_from_slice(&err_buf[..n]);
                    }
                }
            }
        }

        let status = child
            .wait()
            .await
            .map_err(|e| ExecutionError::IoError(e.to_string()))?;
        Ok((status, combined))
    }

    /// Build execution outcome from exit status and captured output
    fn build_outcome(&self, status: ExitStatus, output: Vec<u8>, duration_ms: i64) -> ExecutionOutcome {
        let error_detail = if status.success() {
            None
        } else {
            Some(match status.code() {
                Some(code) => format!("exit status: {}", code),
                None => "terminated by signal".to_string(),
            })
        };

        ExecutionOutcome {
            success: status.success(),
            exit_code: status.code(),
            output,
            duration_ms,
            error_detail,
        }
    }
}

#[async_trait]
impl CommandExecutor for ShellExecutor {
    async fn execute(&self, command: &Command) -> Result<ExecutionOutcome, ExecutionError> {
        let start_time = self.time_provider.now_millis();
        debug!(command_id = %command.id, shell = %self.shell, "Spawning shell");

        let (status, output) = self.spawn_and_wait(command.line()).await?;

        let duration_ms = self.time_provider.now_millis() - start_time;
        let outcome = self.build_outcome(status, output, duration_ms);

        debug!(
            command_id = %command.id,
            duration_ms = %duration_ms,
            exit_code = ?outcome.exit_code,
            "Shell exited"
        );

        Ok(outcome)
    }
}
