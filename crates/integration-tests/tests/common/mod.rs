//! Helpers shared by the integration test binaries
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;
use tierd_core::application::{PoolOptions, SubmissionService, SubmitRequest, WorkerPool};
use tierd_core::domain::{PoolConfig, TierLimits};
use tierd_core::port::id_provider::SequentialIdProvider;
use tierd_core::port::time_provider::SystemTimeProvider;
use tierd_core::port::CommandExecutor;

/// Short timings so scenarios finish in milliseconds
pub fn fast_options() -> PoolOptions {
    PoolOptions {
        idle_sleep: Duration::from_millis(5),
        scale_interval: Duration::from_millis(10),
    }
}

/// `PoolConfig` from (global, high_min, (medium min, max), (low min, max))
pub fn pool_config(global: usize, high_min: usize, medium: (usize, usize), low: (usize, usize)) -> PoolConfig {
    PoolConfig::new(
        global,
        high_min,
        TierLimits::new(medium.0, medium.1),
        TierLimits::new(low.0, low.1),
    )
}

pub fn submission_service(
    config: PoolConfig,
    executor: Arc<dyn CommandExecutor>,
) -> (Arc<WorkerPool>, SubmissionService) {
    let pool = WorkerPool::new(config, fast_options(), executor);
    let service = SubmissionService::new(
        Arc::clone(&pool),
        Arc::new(SequentialIdProvider::new()),
        Arc::new(SystemTimeProvider),
    );
    (pool, service)
}

pub fn request(command: impl Into<String>, tier: &str) -> SubmitRequest {
    SubmitRequest {
        command: command.into(),
        tier: tier.to_string(),
    }
}

/// Poll `condition` every 5ms until it holds or `timeout` elapses
pub async fn wait_until(timeout: Duration, condition: impl Fn() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    condition()
}
