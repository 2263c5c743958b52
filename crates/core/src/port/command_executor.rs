// Command Executor Port
// Abstraction for running one command line as an external process

use crate::domain::Command;
use async_trait::async_trait;
use thiserror::Error;

/// Outcome of a command that was spawned and ran to completion
#[derive(Debug, Clone)]
pub struct ExecutionOutcome {
    pub success: bool,
    pub exit_code: Option<i32>,
    /// stdout and stderr interleaved in arrival order
    pub output: Vec<u8>,
    pub duration_ms: i64,
    pub error_detail: Option<String>,
}

impl ExecutionOutcome {
    pub fn output_lossy(&self) -> String {
        String::from_utf8_lossy(&self.output).into_owned()
    }
}

/// The command never produced an exit status
#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("Spawn failed: {0}")]
    SpawnFailed(String),

    #[error("IO error: {0}")]
    IoError(String),
}

/// Command Executor trait
///
/// Runs to completion: there is no timeout and no cancellation. A non-zero
/// exit is an `Ok` outcome with `success == false`; the worker treats it the
/// same as an `Err`.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    async fn execute(&self, command: &Command) -> Result<ExecutionOutcome, ExecutionError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    /// Mock executor behavior
    #[derive(Debug, Clone)]
    pub enum MockBehavior {
        /// Always succeed
        Success,
        /// Exit non-zero
        ExitFailure(i32),
        /// Fail to spawn
        SpawnFail(String),
        /// Panic with message (for panic isolation testing)
        Panic(String),
    }

    /// Record of one finished mock execution
    #[derive(Debug, Clone)]
    pub struct ExecutionRecord {
        pub command_id: String,
        pub line: String,
        pub success: bool,
    }

    /// Mock Command Executor for testing
    ///
    /// Records every command it sees (in completion order) and tracks how many
    /// executions overlap, so tests can check the global concurrency ceiling.
    pub struct MockCommandExecutor {
        behavior: MockBehavior,
        /// Lines that fail regardless of `behavior`
        failing_lines: Mutex<HashSet<String>>,
        delay: Duration,
        records: Mutex<Vec<ExecutionRecord>>,
        started: Mutex<Vec<String>>,
        running: AtomicUsize,
        max_running: AtomicUsize,
    }

    impl MockCommandExecutor {
        pub fn new(behavior: MockBehavior) -> Self {
            Self {
                behavior,
                failing_lines: Mutex::new(HashSet::new()),
                delay: Duration::ZERO,
                records: Mutex::new(Vec::new()),
                started: Mutex::new(Vec::new()),
                running: AtomicUsize::new(0),
                max_running: AtomicUsize::new(0),
            }
        }

        pub fn new_success() -> Self {
            Self::new(MockBehavior::Success)
        }

        pub fn new_panic_inducing(message: impl Into<String>) -> Self {
            Self::new(MockBehavior::Panic(message.into()))
        }

        /// Simulate long-running commands
        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        /// Make one specific command line exit non-zero
        pub fn fail_line(&self, line: impl Into<String>) {
            self.failing_lines.lock().insert(line.into());
        }

        pub fn call_count(&self) -> usize {
            self.records.lock().len()
        }

        pub fn records(&self) -> Vec<ExecutionRecord> {
            self.records.lock().clone()
        }

        /// Executed lines in completion order
        pub fn executed_lines(&self) -> Vec<String> {
            self.records.lock().iter().map(|r| r.line.clone()).collect()
        }

        /// Lines in the order execution began
        pub fn started_lines(&self) -> Vec<String> {
            self.started.lock().clone()
        }

        /// Highest number of overlapping executions observed
        pub fn max_concurrent(&self) -> usize {
            self.max_running.load(Ordering::SeqCst)
        }

        pub fn into_shared(self) -> Arc<Self> {
            Arc::new(self)
        }
    }

    #[async_trait]
    impl CommandExecutor for MockCommandExecutor {
        async fn execute(&self, command: &Command) -> Result<ExecutionOutcome, ExecutionError> {
            self.started.lock().push(command.line().to_string());
            let now_running = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_running.fetch_max(now_running, Ordering::SeqCst);

            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }

            self.running.fetch_sub(1, Ordering::SeqCst);

            let forced_failure = self.failing_lines.lock().contains(command.line());
            let behavior = if forced_failure {
                MockBehavior::ExitFailure(1)
            } else {
                self.behavior.clone()
            };

            let result = match behavior {
                MockBehavior::Success => Ok(ExecutionOutcome {
                    success: true,
                    exit_code: Some(0),
                    output: format!("ran: {}\n", command.line()).into_bytes(),
                    duration_ms: self.delay.as_millis() as i64,
                    error_detail: None,
                }),
                MockBehavior::ExitFailure(code) => Ok(ExecutionOutcome {
                    success: false,
                    exit_code: Some(code),
                    output: b"mock failure\n".to_vec(),
                    duration_ms: self.delay.as_millis() as i64,
                    error_detail: Some(format!("exit status: {}", code)),
                }),
                MockBehavior::SpawnFail(msg) => Err(ExecutionError::SpawnFailed(msg)),
                MockBehavior::Panic(msg) => {
                    self.records.lock().push(ExecutionRecord {
                        command_id: command.id.clone(),
                        line: command.line().to_string(),
                        success: false,
                    });
                    panic!("{}", msg); // Actually panic for panic isolation testing
                }
            };

            let success = matches!(&result, Ok(outcome) if outcome.success);
            self.records.lock().push(ExecutionRecord {
                command_id: command.id.clone(),
                line: command.line().to_string(),
                success,
            });

            result
        }
    }
}
