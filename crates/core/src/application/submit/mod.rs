// Submission Service - Ingress routing into tier queues

pub mod route;


pub use route::{SubmitRequest, SubmitResponse};

use crate::application::pool::WorkerPool;
use crate::error::Result;
use crate::port::{IdProvider, TimeProvider};
use std::sync::Arc;

/// Entry point for every ingress adapter (RPC server, tests)
pub struct SubmissionService {
    pool: Arc<WorkerPool>,
    id_provider: Arc<dyn IdProvider>,
    time_provider: Arc<dyn TimeProvider>,
}

impl SubmissionService {
    pub fn new(
        pool: Arc<WorkerPool>,
        id_provider: Arc<dyn IdProvider>,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            pool,
            id_provider,
            time_provider,
        }
    }

    /// Route a command into its tier's queue. Never blocks.
    pub fn submit(&self, req: SubmitRequest) -> Result<SubmitResponse> {
        route::execute(
            &self.pool,
            self.id_provider.as_ref(),
            self.time_provider.as_ref(),
            req,
        )
    }

    pub fn pool(&self) -> &Arc<WorkerPool> {
        &self.pool
    }
}
