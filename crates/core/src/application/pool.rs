//! Worker pool: per-tier state, the shared concurrency gate, and worker tasks
//!
//! Owns one `TierState` per tier (queue + live worker count) in priority
//! order. Workers and the scaler receive their tier state explicitly; nothing
//! here is global.

use crate::application::limiter::ConcurrencyLimiter;
use crate::application::queue::CommandQueue;
use crate::application::scaler::{TierScaler, TierSnapshot};
use crate::application::worker::constants::{IDLE_SLEEP_DURATION, SCALE_INTERVAL};
use crate::application::worker::{shutdown_channel, ShutdownSender, ShutdownToken, Worker};
use crate::domain::{Command, PoolConfig, Tier, TierLimits};
use crate::error::{AppError, Result};
use crate::port::CommandExecutor;
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Timing knobs for the pool
#[derive(Debug, Clone)]
pub struct PoolOptions {
    /// Worker polling backoff on an empty queue
    pub idle_sleep: Duration,
    /// Scaler period
    pub scale_interval: Duration,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self {
            idle_sleep: IDLE_SLEEP_DURATION,
            scale_interval: SCALE_INTERVAL,
        }
    }
}

/// Everything the pool knows about one tier
pub struct TierState {
    tier: Tier,
    limits: TierLimits,
    queue: Arc<CommandQueue>,
    workers: AtomicUsize,
}

impl TierState {
    fn new(tier: Tier, limits: TierLimits) -> Self {
        Self {
            tier,
            limits,
            queue: Arc::new(CommandQueue::new(tier)),
            workers: AtomicUsize::new(0),
        }
    }

    pub fn tier(&self) -> Tier {
        self.tier
    }

    pub fn limits(&self) -> TierLimits {
        self.limits
    }

    pub fn queue(&self) -> &Arc<CommandQueue> {
        &self.queue
    }

    /// Live workers bound to this tier. Never decreases while the pool runs.
    pub fn workers(&self) -> usize {
        self.workers.load(Ordering::SeqCst)
    }
}

/// Result of `WorkerPool::shutdown`
///
/// Every accepted command ends up executed, dropped, abandoned, or still
/// running in `unfinished_workers`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShutdownReport {
    /// Pending commands discarded (queues are not durable)
    pub dropped_commands: usize,
    /// Workers still executing a command when the grace period ran out
    pub unfinished_workers: usize,
    /// Dequeued commands still waiting for a slot when the grace period ran
    /// out; the gate is closed on them, so they never start. Sampled at the
    /// deadline.
    pub abandoned_commands: usize,
}

pub struct WorkerPool {
    config: PoolConfig,
    options: PoolOptions,
    /// Priority order (index = `Tier::rank`)
    tiers: Vec<TierState>,
    limiter: Arc<ConcurrencyLimiter>,
    executor: Arc<dyn CommandExecutor>,
    next_worker_id: AtomicUsize,
    handles: Mutex<Vec<JoinHandle<()>>>,
    /// Held shared while enqueueing, exclusively while raising shutdown
    admission: RwLock<()>,
    shutdown_tx: ShutdownSender,
    shutdown_token: ShutdownToken,
}

impl WorkerPool {
    /// Build an idle pool. Cross-tier invariants are the config loader's
    /// job (`PoolConfig::validate`); the pool takes the numbers as given.
    pub fn new(
        config: PoolConfig,
        options: PoolOptions,
        executor: Arc<dyn CommandExecutor>,
    ) -> Arc<Self> {
        let tiers = Tier::ALL
            .iter()
            .map(|tier| TierState::new(*tier, config.limits(*tier)))
            .collect();
        let (shutdown_tx, shutdown_token) = shutdown_channel();

        Arc::new(Self {
            limiter: Arc::new(ConcurrencyLimiter::new(config.global_max_workers)),
            config,
            options,
            tiers,
            executor,
            next_worker_id: AtomicUsize::new(0),
            handles: Mutex::new(Vec::new()),
            admission: RwLock::new(()),
            shutdown_tx,
            shutdown_token,
        })
    }

    /// Spawn every tier's guaranteed workers, then the scaler loop.
    /// Must be called from within a Tokio runtime.
    pub fn start(self: &Arc<Self>) {
        self.spawn_min_workers();

        let scaler = TierScaler::new(Arc::clone(self), self.options.scale_interval);
        let token = self.shutdown_token.clone();
        let handle = tokio::spawn(async move {
            scaler.run(token).await;
        });
        self.handles.lock().push(handle);

        info!(
            global_max_workers = self.config.global_max_workers,
            total_workers = self.total_workers(),
            "Worker pool started"
        );
    }

    /// Spawn `min_workers` per tier without starting the scaler
    pub fn spawn_min_workers(&self) {
        for state in &self.tiers {
            for _ in 0..state.limits.min_workers {
                self.spawn_worker(state.tier);
            }
        }
    }

    /// Add one worker to `tier`. Callers (start-up and the scaler) are
    /// responsible for respecting the ceilings.
    pub(crate) fn spawn_worker(&self, tier: Tier) -> usize {
        let state = self.tier(tier);
        let id = self.next_worker_id.fetch_add(1, Ordering::SeqCst);

        let worker = Worker::new(
            id,
            Arc::clone(&state.queue),
            Arc::clone(&self.limiter),
            Arc::clone(&self.executor),
        )
        .with_idle_sleep(self.options.idle_sleep);

        let token = self.shutdown_token.clone();
        let handle = tokio::spawn(async move {
            worker.run(token).await;
        });
        self.handles.lock().push(handle);

        state.workers.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    pub fn tier(&self, tier: Tier) -> &TierState {
        &self.tiers[tier.rank()]
    }

    /// Tier states, highest priority first
    pub fn tiers(&self) -> &[TierState] {
        &self.tiers
    }

    pub fn queue(&self, tier: Tier) -> &Arc<CommandQueue> {
        &self.tier(tier).queue
    }

    pub fn limiter(&self) -> &Arc<ConcurrencyLimiter> {
        &self.limiter
    }

    pub fn total_workers(&self) -> usize {
        self.tiers.iter().map(|t| t.workers()).sum()
    }

    /// Queue depth and population per tier, in priority order
    pub fn snapshot(&self) -> Vec<TierSnapshot> {
        self.tiers
            .iter()
            .map(|state| TierSnapshot {
                tier: state.tier,
                queue_depth: state.queue.len(),
                workers: state.workers(),
                limits: state.limits,
            })
            .collect()
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutdown_tx.is_shutdown()
    }

    /// Append to the command's tier queue unless shutdown has begun.
    /// Returns the queue depth after the append.
    ///
    /// The check and the append are atomic with respect to `shutdown`, so
    /// an accepted command is always seen by the shutdown drain.
    pub fn admit(&self, command: Command) -> Result<usize> {
        let _open = self.admission.read();
        if self.is_shutting_down() {
            return Err(AppError::ShuttingDown(
                "daemon is not accepting new commands".to_string(),
            ));
        }
        let queue = self.queue(command.tier);
        queue.add(command);
        Ok(queue.len())
    }

    /// Stop workers and the scaler. In-flight commands run to completion
    /// (bounded by `grace`); anything still queued is dropped.
    pub async fn shutdown(&self, grace: Duration) -> ShutdownReport {
        info!("Worker pool shutting down");
        {
            let _closed = self.admission.write();
            self.shutdown_tx.shutdown();
        }

        let handles: Vec<JoinHandle<()>> = std::mem::take(&mut *self.handles.lock());
        let total = handles.len();

        let (unfinished_workers, abandoned_commands) =
            match tokio::time::timeout(grace, futures::future::join_all(handles)).await {
                Ok(_) => (0, 0),
                Err(_) => {
                    let running = self.limiter.in_flight();
                    let waiting = self.limiter.waiting();
                    self.limiter.close();
                    warn!(
                        grace_ms = grace.as_millis() as u64,
                        tasks = total,
                        running,
                        waiting,
                        "Grace period elapsed with commands still running"
                    );
                    (running, waiting)
                }
            };

        let mut dropped_commands = 0;
        for state in &self.tiers {
            let dropped = state.queue.drain();
            if !dropped.is_empty() {
                warn!(
                    tier = %state.tier,
                    dropped = dropped.len(),
                    "Discarding pending commands"
                );
            }
            dropped_commands += dropped.len();
        }

        info!(
            dropped_commands,
            unfinished_workers,
            abandoned_commands,
            "Worker pool stopped"
        );

        ShutdownReport {
            dropped_commands,
            unfinished_workers,
            abandoned_commands,
        }
    }
}
