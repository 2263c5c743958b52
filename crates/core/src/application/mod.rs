// Application Layer - Scheduling runtime and use cases

pub mod limiter;
pub mod pool;
pub mod queue;
pub mod scaler;
pub mod submit;
pub mod worker;

// Re-exports
pub use limiter::{ConcurrencyLimiter, ExecutionPermit};
pub use pool::{PoolOptions, ShutdownReport, TierState, WorkerPool};
pub use queue::CommandQueue;
pub use scaler::{select_tier_to_grow, TierScaler, TierSnapshot};
pub use submit::{SubmissionService, SubmitRequest, SubmitResponse};
pub use worker::{shutdown_channel, CommandDisposition, ShutdownSender, ShutdownToken, Worker};
