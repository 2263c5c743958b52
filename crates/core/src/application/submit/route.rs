// Route Use Case

use crate::application::pool::WorkerPool;
use crate::domain::{Command, CommandId, DomainError, Tier};
use crate::error::{AppError, Result};
use crate::port::{IdProvider, TimeProvider};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// A raw submission as delivered by an ingress adapter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitRequest {
    pub command: String,
    /// Tier label; parsed here so unknown labels are rejected in one place
    pub tier: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub command_id: CommandId,
    pub tier: Tier,
    pub queue_depth: usize,
}

/// Validate a submission and append it to its tier's queue.
///
/// Rejected submissions (unknown tier, blank command, shutdown in progress)
/// are logged and dropped; they never reach a queue.
pub fn execute(
    pool: &WorkerPool,
    id_provider: &dyn IdProvider,
    time_provider: &dyn TimeProvider,
    req: SubmitRequest,
) -> Result<SubmitResponse> {
    if pool.is_shutting_down() {
        warn!(command = %req.command, "Rejecting submission: shutting down");
        return Err(AppError::ShuttingDown(
            "daemon is not accepting new commands".to_string(),
        ));
    }

    let tier: Tier = req.tier.parse().map_err(|e: DomainError| {
        warn!(tier = %req.tier, command = %req.command, "Unknown tier, dropping command");
        e
    })?;

    let command = Command::new(
        id_provider.generate_id(),
        tier,
        req.command,
        time_provider.now_millis(),
    )
    .map_err(|e| {
        warn!(tier = %tier, "Empty command, dropping");
        e
    })?;

    let command_id = command.id.clone();
    let line = command.line().to_string();
    let queue_depth = pool.admit(command).map_err(|e| {
        warn!(command = %line, "Rejecting submission: shutting down");
        e
    })?;
    info!(
        tier = %tier,
        command_id = %command_id,
        command = %line,
        queue_depth,
        "Command added to queue"
    );

    Ok(SubmitResponse {
        command_id,
        tier,
        queue_depth,
    })
}
