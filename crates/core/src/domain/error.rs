// Domain Error Types

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Unknown tier: {0:?} (expected high, medium or low)")]
    UnknownTier(String),

    #[error("Command must not be empty")]
    EmptyCommand,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, DomainError>;
