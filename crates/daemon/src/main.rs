//! tierd - Priority-tiered command execution daemon
//! Accepts shell commands over JSON-RPC and runs them on a bounded worker pool

mod logging;
mod settings;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

// Import workspace crates
use settings::DaemonConfig;
use tierd_api_rpc::RpcServer;
use tierd_core::application::{SubmissionService, WorkerPool};
use tierd_core::port::id_provider::UuidProvider;
use tierd_core::port::time_provider::SystemTimeProvider;
use tierd_core::port::CommandExecutor;
use tierd_infra_system::ShellExecutor;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "tierd")]
#[command(about = "Priority-tiered command execution daemon", long_about = None)]
#[command(version)]
struct Args {
    /// JSON config file (default: ./config.json if present)
    #[arg(long, env = "TIERD_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // 1. Initialize logging
    let _log_guard = logging::init_logging().context("Failed to initialize logging")?;

    info!("tierd v{} starting...", VERSION);

    // 2. Load configuration (inconsistent values are fatal)
    let config = DaemonConfig::load(args.config.as_deref())?;
    config.validate().context("Invalid configuration")?;

    info!(
        max_total_workers = config.max_total_workers,
        high_min = config.high_priority_min,
        medium_min = config.medium_priority_min,
        medium_max = config.medium_priority_max,
        low_min = config.low_priority_min,
        low_max = config.low_priority_max,
        shell = %config.shell,
        "Configuration loaded"
    );

    // 3. Setup dependencies (DI wiring)
    let time_provider = Arc::new(SystemTimeProvider);
    let executor: Arc<dyn CommandExecutor> =
        Arc::new(ShellExecutor::new(config.shell.clone(), time_provider.clone()));

    // 4. Start worker pool (min workers per tier + scaler)
    let pool = WorkerPool::new(config.pool_config(), config.pool_options(), executor);
    pool.start();

    // 5. Start JSON-RPC ingress
    let submissions = Arc::new(SubmissionService::new(
        pool.clone(),
        Arc::new(UuidProvider),
        time_provider,
    ));
    let (addr, rpc_handle) = RpcServer::new(config.rpc_config(), submissions)
        .start()
        .await
        .map_err(|e| anyhow::anyhow!("RPC server start failed: {}", e))?;

    info!(rpc_addr = %addr, "System ready. Waiting for commands...");
    info!("Press Ctrl+C to shutdown");

    // 6. Wait for shutdown signal
    tokio::signal::ctrl_c().await?;

    info!("Shutdown signal received. Exiting gracefully...");

    // 7. Graceful shutdown: stop ingress, then drain in-flight commands
    if let Err(e) = rpc_handle.stop() {
        warn!(error = %e, "RPC server already stopped");
    }
    let report = pool.shutdown(config.shutdown_grace()).await;

    info!(
        dropped_commands = report.dropped_commands,
        unfinished_workers = report.unfinished_workers,
        abandoned_commands = report.abandoned_commands,
        "Shutdown complete."
    );

    Ok(())
}
