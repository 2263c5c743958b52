//! TierScaler - grows per-tier worker counts in response to backlog
//!
//! Every tick it walks the tiers highest priority first and adds exactly one
//! worker to the first tier that has a backlog and room under its own
//! ceiling, provided the pool as a whole is below `global_max_workers`.
//! At most one spawn per tick keeps growth rate-limited.
//!
//! Growth only: idle workers are never retired, even once backlog clears.

use crate::application::pool::WorkerPool;
use crate::application::worker::ShutdownToken;
use crate::domain::{Tier, TierLimits};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

/// Observation of one tier at the start of a scaler tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierSnapshot {
    pub tier: Tier,
    pub queue_depth: usize,
    pub workers: usize,
    pub limits: TierLimits,
}

impl TierSnapshot {
    fn wants_worker(&self) -> bool {
        self.queue_depth > 0 && self.workers < self.limits.max_workers
    }
}

/// Pick the tier to grow this tick, if any.
///
/// `snapshots` must be in priority order; the first qualifying entry wins.
pub fn select_tier_to_grow(snapshots: &[TierSnapshot], global_max_workers: usize) -> Option<Tier> {
    let total: usize = snapshots.iter().map(|s| s.workers).sum();
    if total >= global_max_workers {
        return None;
    }
    snapshots.iter().find(|s| s.wants_worker()).map(|s| s.tier)
}

pub struct TierScaler {
    pool: Arc<WorkerPool>,
    interval: Duration,
}

impl TierScaler {
    pub fn new(pool: Arc<WorkerPool>, interval: Duration) -> Self {
        Self { pool, interval }
    }

    /// One control decision: spawn at most one worker
    pub fn scale_once(&self) -> Option<Tier> {
        if self.pool.is_shutting_down() {
            return None;
        }

        let snapshots = self.pool.snapshot();
        let tier = select_tier_to_grow(&snapshots, self.pool.config().global_max_workers)?;
        let workers = self.pool.spawn_worker(tier);

        info!(
            tier = %tier,
            workers,
            queue_depth = snapshots[tier.rank()].queue_depth,
            total_workers = self.pool.total_workers(),
            "Scaled up tier"
        );
        Some(tier)
    }

    /// Control loop; runs until shutdown
    pub async fn run(&self, mut shutdown: ShutdownToken) {
        info!(interval_ms = self.interval.as_millis() as u64, "Tier scaler started");

        let mut tick = interval(self.interval);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            if shutdown.is_shutdown() {
                break;
            }
            tokio::select! {
                _ = tick.tick() => {
                    if self.scale_once().is_none() {
                        debug!("Scaler tick: no tier qualifies");
                    }
                }
                _ = shutdown.wait() => break,
            }
        }

        info!("Tier scaler stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::pool::PoolOptions;
    use crate::domain::{Command, PoolConfig};
    use crate::port::command_executor::mocks::MockCommandExecutor;

    fn snap(tier: Tier, queue_depth: usize, workers: usize, max: usize) -> TierSnapshot {
        TierSnapshot {
            tier,
            queue_depth,
            workers,
            limits: TierLimits::new(1, max),
        }
    }

    #[test]
    fn test_highest_priority_backlog_wins() {
        let snapshots = [
            snap(Tier::High, 3, 1, 10),
            snap(Tier::Medium, 5, 1, 4),
            snap(Tier::Low, 9, 1, 4),
        ];
        assert_eq!(select_tier_to_grow(&snapshots, 10), Some(Tier::High));
    }

    #[test]
    fn test_tier_at_ceiling_is_skipped() {
        let snapshots = [
            snap(Tier::High, 3, 4, 4),
            snap(Tier::Medium, 0, 1, 4),
            snap(Tier::Low, 9, 1, 4),
        ];
        assert_eq!(select_tier_to_grow(&snapshots, 20), Some(Tier::Low));
    }

    #[test]
    fn test_no_backlog_no_growth() {
        let snapshots = [
            snap(Tier::High, 0, 1, 10),
            snap(Tier::Medium, 0, 1, 4),
            snap(Tier::Low, 0, 1, 4),
        ];
        assert_eq!(select_tier_to_grow(&snapshots, 10), None);
    }

    #[test]
    fn test_global_ceiling_blocks_growth() {
        let snapshots = [
            snap(Tier::High, 5, 3, 6),
            snap(Tier::Medium, 5, 2, 4),
            snap(Tier::Low, 5, 1, 4),
        ];
        assert_eq!(select_tier_to_grow(&snapshots, 6), None);
        assert_eq!(select_tier_to_grow(&snapshots, 7), Some(Tier::High));
    }

    fn slow_pool(config: PoolConfig) -> Arc<WorkerPool> {
        let executor = MockCommandExecutor::new_success()
            .with_delay(Duration::from_secs(5))
            .into_shared();
        WorkerPool::new(config, PoolOptions::default(), executor)
    }

    #[tokio::test]
    async fn test_scale_once_spawns_one_worker_per_call() {
        let config = PoolConfig::new(10, 1, TierLimits::new(1, 3), TierLimits::new(1, 2));
        let pool = slow_pool(config);
        for i in 0..5 {
            pool.queue(Tier::Medium)
                .add(Command::new_test(Tier::Medium, format!("job {}", i)));
            pool.queue(Tier::Low)
                .add(Command::new_test(Tier::Low, format!("job {}", i)));
        }

        let scaler = TierScaler::new(Arc::clone(&pool), Duration::from_millis(10));
        // Medium outranks low until it hits its ceiling of 3
        assert_eq!(scaler.scale_once(), Some(Tier::Medium));
        assert_eq!(scaler.scale_once(), Some(Tier::Medium));
        assert_eq!(scaler.scale_once(), Some(Tier::Medium));
        assert_eq!(scaler.scale_once(), Some(Tier::Low));
        assert_eq!(scaler.scale_once(), Some(Tier::Low));
        assert_eq!(scaler.scale_once(), None);

        assert_eq!(pool.tier(Tier::Medium).workers(), 3);
        assert_eq!(pool.tier(Tier::Low).workers(), 2);
        assert_eq!(pool.tier(Tier::High).workers(), 0);

        pool.shutdown(Duration::from_millis(10)).await;
    }

    #[tokio::test]
    async fn test_scale_once_respects_global_max() {
        let config = PoolConfig::new(2, 1, TierLimits::new(1, 2), TierLimits::new(1, 2));
        let pool = slow_pool(config);
        for i in 0..10 {
            pool.queue(Tier::High)
                .add(Command::new_test(Tier::High, format!("job {}", i)));
        }

        let scaler = TierScaler::new(Arc::clone(&pool), Duration::from_millis(10));
        for _ in 0..5 {
            scaler.scale_once();
        }
        assert_eq!(pool.total_workers(), 2);

        pool.shutdown(Duration::from_millis(10)).await;
    }

    #[tokio::test]
    async fn test_scale_once_is_noop_after_shutdown() {
        let pool = slow_pool(PoolConfig::default());
        pool.queue(Tier::High).add(Command::new_test(Tier::High, "job"));
        pool.shutdown(Duration::from_millis(10)).await;

        let scaler = TierScaler::new(Arc::clone(&pool), Duration::from_millis(10));
        assert_eq!(scaler.scale_once(), None);
        assert_eq!(pool.total_workers(), 0);
    }
}
