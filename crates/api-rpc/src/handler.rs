//! RPC Method Handlers
//!
//! Implements the logic behind each JSON-RPC method.

use crate::error::to_rpc_error;
use crate::types::{
    StatsRequest, StatsResponse, SubmitCommandRequest, SubmitCommandResponse, TierStats,
};
use jsonrpsee::types::ErrorObjectOwned;
use std::sync::Arc;
use tierd_core::application::{SubmissionService, SubmitRequest};

/// RPC Handler with injected dependencies
pub struct RpcHandler {
    submissions: Arc<SubmissionService>,
    start_time: std::time::Instant,
}

impl RpcHandler {
    pub fn new(submissions: Arc<SubmissionService>) -> Self {
        Self {
            submissions,
            start_time: std::time::Instant::now(),
        }
    }

    /// cmd.submit.v1
    pub fn submit(
        &self,
        params: SubmitCommandRequest,
    ) -> Result<SubmitCommandResponse, ErrorObjectOwned> {
        let resp = self
            .submissions
            .submit(SubmitRequest {
                command: params.command,
                tier: params.tier,
            })
            .map_err(to_rpc_error)?;

        Ok(SubmitCommandResponse {
            command_id: resp.command_id,
            tier: resp.tier.to_string(),
            state: "QUEUED".to_string(),
            queue_depth: resp.queue_depth,
        })
    }

    /// admin.stats.v1
    pub fn stats(&self, _params: StatsRequest) -> Result<StatsResponse, ErrorObjectOwned> {
        let pool = self.submissions.pool();

        let tiers = pool
            .snapshot()
            .into_iter()
            .map(|s| TierStats {
                tier: s.tier.to_string(),
                queue_depth: s.queue_depth,
                workers: s.workers,
                min_workers: s.limits.min_workers,
                max_workers: s.limits.max_workers,
            })
            .collect();

        Ok(StatsResponse {
            tiers,
            in_flight: pool.limiter().in_flight(),
            total_workers: pool.total_workers(),
            global_max_workers: pool.config().global_max_workers,
            uptime_seconds: self.start_time.elapsed().as_secs() as i64,
        })
    }
}
