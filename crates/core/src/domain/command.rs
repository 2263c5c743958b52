// Command Domain Model

use super::error::{DomainError, Result};
use super::tier::Tier;
use serde::{Deserialize, Serialize};

/// Command ID (UUID v4), assigned at ingress for log attribution
pub type CommandId = String;

/// A shell invocation accepted into one tier's queue.
///
/// The command line is opaque: the only rule is that it is not blank.
/// Owned by exactly one queue while pending, then moved into exactly one
/// worker; it is never requeued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    pub id: CommandId,
    pub tier: Tier,
    line: String,
    pub submitted_at: i64, // epoch ms
}

impl Command {
    pub fn new(
        id: impl Into<CommandId>,
        tier: Tier,
        line: impl Into<String>,
        submitted_at: i64,
    ) -> Result<Self> {
        let line = line.into();
        if line.trim().is_empty() {
            return Err(DomainError::EmptyCommand);
        }
        Ok(Self {
            id: id.into(),
            tier,
            line,
            submitted_at,
        })
    }

    /// The shell command line exactly as submitted
    pub fn line(&self) -> &str {
        &self.line
    }

    /// Create a test command with a sequential ID (test helper)
    #[doc(hidden)]
    pub fn new_test(tier: Tier, line: impl Into<String>) -> Self {
        use std::sync::atomic::{AtomicU64, Ordering};
        static NEXT: AtomicU64 = AtomicU64::new(1);
        let seq = NEXT.fetch_add(1, Ordering::Relaxed);
        Self {
            id: format!("test-{}", seq),
            tier,
            line: line.into(),
            submitted_at: 0,
        }
    }
}
