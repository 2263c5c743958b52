//! RPC Request/Response Types
//!
//! Defines the JSON-RPC method parameters and results.

use serde::{Deserialize, Serialize};

/// cmd.submit.v1 - Submit a command to a tier queue
#[derive(Debug, Deserialize)]
pub struct SubmitCommandRequest {
    pub command: String,
    #[serde(default = "default_tier")]
    pub tier: String,
}

fn default_tier() -> String {
    "high".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitCommandResponse {
    pub command_id: String,
    pub tier: String,
    pub state: String,
    pub queue_depth: usize,
}

/// admin.stats.v1 - Pool statistics
#[derive(Debug, Deserialize)]
pub struct StatsRequest {
    // No parameters needed
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierStats {
    pub tier: String,
    pub queue_depth: usize,
    pub workers: usize,
    pub min_workers: usize,
    pub max_workers: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsResponse {
    /// Highest priority first
    pub tiers: Vec<TierStats>,
    pub in_flight: usize,
    pub total_workers: usize,
    pub global_max_workers: usize,
    pub uptime_seconds: i64,
}
