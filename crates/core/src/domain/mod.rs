// Domain Layer - Pure scheduling entities

pub mod command;
pub mod config;
pub mod error;
pub mod tier;

// Re-exports
pub use command::{Command, CommandId};
pub use config::{PoolConfig, TierLimits};
pub use error::DomainError;
pub use tier::Tier;
