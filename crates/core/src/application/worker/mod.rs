// Worker - Command execution loop bound to one tier

pub mod constants;
mod shutdown;

use constants::*;
pub use shutdown::{shutdown_channel, ShutdownSender, ShutdownToken};

use crate::application::limiter::ConcurrencyLimiter;
use crate::application::queue::CommandQueue;
use crate::domain::{Command, Tier};
use crate::port::{CommandExecutor, ExecutionError, ExecutionOutcome};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinError;
use tokio::time::sleep;
use tracing::{error, info, warn};

/// Worker drains a single tier's queue under the global concurrency gate.
///
/// It never exits on its own: execution failures are logged and the loop
/// goes back to polling. Only the shutdown token stops it, and never in the
/// middle of a command.
pub struct Worker {
    id: usize,
    tier: Tier,
    queue: Arc<CommandQueue>,
    limiter: Arc<ConcurrencyLimiter>,
    executor: Arc<dyn CommandExecutor>,
    idle_sleep: Duration,
}

/// What happened to one dequeued command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandDisposition {
    Succeeded,
    Failed,
    Panicked,
    /// Execution task was cancelled before it finished
    Cancelled,
    /// Never started: the gate closed while waiting for a slot
    Abandoned,
}

impl Worker {
    pub fn new(
        id: usize,
        queue: Arc<CommandQueue>,
        limiter: Arc<ConcurrencyLimiter>,
        executor: Arc<dyn CommandExecutor>,
    ) -> Self {
        Self {
            id,
            tier: queue.tier(),
            queue,
            limiter,
            executor,
            idle_sleep: IDLE_SLEEP_DURATION,
        }
    }

    /// Override the polling backoff (tests use a short one)
    pub fn with_idle_sleep(mut self, idle_sleep: Duration) -> Self {
        self.idle_sleep = idle_sleep;
        self
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn tier(&self) -> Tier {
        self.tier
    }

    /// Run worker loop with graceful shutdown support
    pub async fn run(&self, mut shutdown: ShutdownToken) {
        info!(worker_id = self.id, tier = %self.tier, "Worker started");
        loop {
            if shutdown.is_shutdown() {
                info!(worker_id = self.id, tier = %self.tier, "Worker shutting down");
                break;
            }
            if self.process_next_command().await.is_none() {
                // Empty queue: back off (or wake early for shutdown)
                tokio::select! {
                    _ = sleep(self.idle_sleep) => {},
                    _ = shutdown.wait() => {
                        info!(worker_id = self.id, "Worker interrupted during idle");
                        break;
                    }
                }
            }
        }
        info!(worker_id = self.id, tier = %self.tier, "Worker stopped");
    }

    /// Poll once. Returns `None` if the queue was empty, otherwise how the
    /// dequeued command ended.
    pub async fn process_next_command(&self) -> Option<CommandDisposition> {
        let command = self.queue.get()?;

        // Held until this function returns, on every path
        let _permit = match self.limiter.acquire().await {
            Ok(permit) => permit,
            Err(e) => {
                warn!(
                    worker_id = self.id,
                    tier = %self.tier,
                    command_id = %command.id,
                    command = %command.line(),
                    error = %e,
                    "Command abandoned before it started"
                );
                return Some(CommandDisposition::Abandoned);
            }
        };

        info!(
            worker_id = self.id,
            tier = %self.tier,
            command_id = %command.id,
            command = %command.line(),
            "Executing command"
        );

        let command_id = command.id.clone();
        let line = command.line().to_string();

        // Run on its own task so a panicking executor cannot take the worker down
        let executor = Arc::clone(&self.executor);
        let handle = tokio::task::spawn(async move { executor.execute(&command).await });

        let disposition = match handle.await {
            Ok(result) => self.report(&command_id, &line, result),
            Err(join_err) => self.report_join_error(&command_id, &line, &join_err),
        };

        Some(disposition)
    }

    fn report_join_error(
        &self,
        command_id: &str,
        line: &str,
        join_err: &JoinError,
    ) -> CommandDisposition {
        if join_err.is_panic() {
            error!(
                worker_id = self.id,
                command_id = %command_id,
                command = %line,
                "Command executor panicked: {:?}",
                join_err
            );
            CommandDisposition::Panicked
        } else {
            error!(
                worker_id = self.id,
                command_id = %command_id,
                command = %line,
                "Command execution cancelled: {:?}",
                join_err
            );
            CommandDisposition::Cancelled
        }
    }

    fn report(
        &self,
        command_id: &str,
        line: &str,
        result: std::result::Result<ExecutionOutcome, ExecutionError>,
    ) -> CommandDisposition {
        match result {
            Ok(outcome) if outcome.success => {
                info!(
                    worker_id = self.id,
                    tier = %self.tier,
                    command_id = %command_id,
                    duration_ms = outcome.duration_ms,
                    output = %truncate_output(&outcome.output_lossy()),
                    "Command completed"
                );
                CommandDisposition::Succeeded
            }
            Ok(outcome) => {
                error!(
                    worker_id = self.id,
                    tier = %self.tier,
                    command_id = %command_id,
                    command = %line,
                    exit_code = ?outcome.exit_code,
                    duration_ms = outcome.duration_ms,
                    error = outcome.error_detail.as_deref().unwrap_or("non-zero exit"),
                    output = %truncate_output(&outcome.output_lossy()),
                    "Command failed"
                );
                CommandDisposition::Failed
            }
            Err(e) => {
                warn!(
                    worker_id = self.id,
                    tier = %self.tier,
                    command_id = %command_id,
                    command = %line,
                    error = %e,
                    "Command could not be started"
                );
                CommandDisposition::Failed
            }
        }
    }
}

fn truncate_output(output: &str) -> &str {
    let trimmed = output.trim_end();
    if trimmed.len() <= MAX_LOGGED_OUTPUT_BYTES {
        return trimmed;
    }
    let mut end = MAX_LOGGED_OUTPUT_BYTES;
    while !trimmed.is_char_boundary(end) {
        end -= 1;
    }
    &trimmed[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::command_executor::mocks::{MockBehavior, MockCommandExecutor};

    fn setup(executor: Arc<MockCommandExecutor>) -> (Arc<CommandQueue>, Worker) {
        let queue = Arc::new(CommandQueue::new(Tier::High));
        let limiter = Arc::new(ConcurrencyLimiter::new(1));
        let worker = Worker::new(1, Arc::clone(&queue), limiter, executor)
            .with_idle_sleep(Duration::from_millis(5));
        (queue, worker)
    }

    #[tokio::test]
    async fn test_empty_queue_returns_none() {
        let (_queue, worker) = setup(MockCommandExecutor::new_success().into_shared());
        assert_eq!(worker.process_next_command().await, None);
    }

    #[tokio::test]
    async fn test_failure_then_next_command_runs() {
        let executor = MockCommandExecutor::new_success().into_shared();
        executor.fail_line("exit 3");
        let (queue, worker) = setup(Arc::clone(&executor));

        queue.add(Command::new_test(Tier::High, "exit 3"));
        queue.add(Command::new_test(Tier::High, "echo ok"));

        assert_eq!(
            worker.process_next_command().await,
            Some(CommandDisposition::Failed)
        );
        assert_eq!(
            worker.process_next_command().await,
            Some(CommandDisposition::Succeeded)
        );
        assert_eq!(executor.executed_lines(), vec!["exit 3", "echo ok"]);
    }

    #[tokio::test]
    async fn test_spawn_failure_is_reported_not_raised() {
        let executor =
            MockCommandExecutor::new(MockBehavior::SpawnFail("no such shell".into())).into_shared();
        let (queue, worker) = setup(executor);
        queue.add(Command::new_test(Tier::High, "anything"));

        assert_eq!(
            worker.process_next_command().await,
            Some(CommandDisposition::Failed)
        );
        assert_eq!(worker.limiter.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_panic_is_isolated_and_slot_released() {
        let executor = MockCommandExecutor::new_panic_inducing("executor blew up").into_shared();
        let (queue, worker) = setup(executor);
        queue.add(Command::new_test(Tier::High, "boom"));

        assert_eq!(
            worker.process_next_command().await,
            Some(CommandDisposition::Panicked)
        );
        assert_eq!(worker.limiter.available(), 1);
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let (_queue, worker) = setup(MockCommandExecutor::new_success().into_shared());
        let (tx, token) = shutdown_channel();

        let handle = tokio::spawn(async move { worker.run(token).await });
        tokio::time::sleep(Duration::from_millis(20)).await;
        tx.shutdown();

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("worker should stop promptly")
            .unwrap();
    }

    #[tokio::test]
    async fn test_in_flight_command_finishes_before_stop() {
        let executor = MockCommandExecutor::new_success()
            .with_delay(Duration::from_millis(100))
            .into_shared();
        let (queue, worker) = setup(Arc::clone(&executor));
        queue.add(Command::new_test(Tier::High, "sleep 0.1"));

        let (tx, token) = shutdown_channel();
        let handle = tokio::spawn(async move { worker.run(token).await });

        tokio::time::sleep(Duration::from_millis(30)).await;
        tx.shutdown();
        handle.await.unwrap();

        assert_eq!(executor.executed_lines(), vec!["sleep 0.1"]);
    }

    #[test]
    fn test_truncate_output_respects_char_boundary() {
        let long = "é".repeat(MAX_LOGGED_OUTPUT_BYTES);
        let cut = truncate_output(&long);
        assert!(cut.len() <= MAX_LOGGED_OUTPUT_BYTES);
        assert!(cut.chars().all(|c| c == 'é'));
        assert_eq!(truncate_output("line\n"), "line");
    }

    #[tokio::test]
    async fn test_closed_gate_abandons_dequeued_command() {
        let executor = MockCommandExecutor::new_success().into_shared();
        let (queue, worker) = setup(Arc::clone(&executor));
        queue.add(Command::new_test(Tier::High, "never runs"));
        worker.limiter.close();

        assert_eq!(
            worker.process_next_command().await,
            Some(CommandDisposition::Abandoned)
        );
        assert_eq!(executor.call_count(), 0);
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_join_error_dispositions() {
        let (_queue, worker) = setup(MockCommandExecutor::new_success().into_shared());

        let cancelled = tokio::spawn(tokio::time::sleep(Duration::from_secs(10)));
        cancelled.abort();
        let join_err = cancelled.await.unwrap_err();
        assert!(join_err.is_cancelled());
        assert_eq!(
            worker.report_join_error("cmd-1", "sleep 10", &join_err),
            CommandDisposition::Cancelled
        );

        let panicked = tokio::spawn(async { panic!("boom") });
        let join_err = panicked.await.unwrap_err();
        assert_eq!(
            worker.report_join_error("cmd-2", "boom", &join_err),
            CommandDisposition::Panicked
        );
    }
}
