//! Pool driving a real shell

mod common;

use common::{fast_options, request, wait_until};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tierd_core::application::{SubmissionService, WorkerPool};
use tierd_core::domain::{PoolConfig, Tier, TierLimits};
use tierd_core::port::id_provider::UuidProvider;
use tierd_core::port::time_provider::SystemTimeProvider;
use tierd_infra_system::ShellExecutor;
use tokio_test::assert_ok;

const WAIT: Duration = Duration::from_secs(10);

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("tierd-e2e-{}-{}", name, std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn shell_service(config: PoolConfig) -> (Arc<WorkerPool>, SubmissionService) {
    let time_provider = Arc::new(SystemTimeProvider);
    let executor = Arc::new(ShellExecutor::new("sh", time_provider.clone()));
    let pool = WorkerPool::new(config, fast_options(), executor);
    let service = SubmissionService::new(
        Arc::clone(&pool),
        Arc::new(UuidProvider),
        time_provider,
    );
    (pool, service)
}

fn read_lines(path: &PathBuf) -> Vec<String> {
    std::fs::read_to_string(path)
        .unwrap_or_default()
        .lines()
        .map(str::to_string)
        .collect()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_low_tier_commands_run_in_order() {
    let dir = scratch_dir("order");
    let log = dir.join("low.log");
    let config = PoolConfig::new(4, 1, TierLimits::new(1, 1), TierLimits::new(1, 1));
    let (pool, service) = shell_service(config);
    pool.start();

    for i in 0..10 {
        let line = format!("echo {} >> {}", i, log.display());
        assert_ok!(service.submit(request(line, "low")));
    }

    assert!(wait_until(WAIT, || read_lines(&log).len() == 10).await);
    let expected: Vec<String> = (0..10).map(|i| i.to_string()).collect();
    assert_eq!(read_lines(&log), expected);

    pool.shutdown(Duration::from_secs(2)).await;
    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_failing_shell_command_does_not_block_queue() {
    let dir = scratch_dir("failure");
    let marker = dir.join("after-failure");
    let config = PoolConfig::new(3, 1, TierLimits::new(1, 1), TierLimits::new(1, 1));
    let (pool, service) = shell_service(config);
    pool.spawn_min_workers();

    assert_ok!(service.submit(request("exit 7", "medium")));
    assert_ok!(service.submit(request("definitely-not-a-command-xyz", "medium")));
    assert_ok!(service.submit(request(
        format!("touch {}", marker.display()),
        "medium"
    )));

    assert!(wait_until(WAIT, || marker.exists()).await);
    assert!(pool.queue(Tier::Medium).is_empty());

    pool.shutdown(Duration::from_secs(2)).await;
    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_shutdown_waits_for_running_shell_command() {
    let dir = scratch_dir("shutdown");
    let marker = dir.join("finished");
    let config = PoolConfig::new(1, 1, TierLimits::new(1, 1), TierLimits::new(1, 1));
    let (pool, service) = shell_service(config);
    pool.spawn_min_workers();

    assert_ok!(service.submit(request(
        format!("sleep 0.3 && touch {}", marker.display()),
        "high"
    )));
    assert!(wait_until(WAIT, || pool.limiter().in_flight() == 1).await);

    let report = pool.shutdown(Duration::from_secs(5)).await;
    assert_eq!(report.unfinished_workers, 0);
    assert!(marker.exists(), "in-flight command ran to completion");

    let _ = std::fs::remove_dir_all(&dir);
}
