// Tier Domain Model

use super::error::DomainError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Priority tier a command is classified into.
///
/// Declaration order is priority order: `Tier::ALL` is what the scaler walks
/// when deciding which tier grows first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    High,
    Medium,
    Low,
}

impl Tier {
    /// All tiers, highest priority first
    pub const ALL: [Tier; 3] = [Tier::High, Tier::Medium, Tier::Low];

    /// Position in `Tier::ALL` (0 = most urgent)
    pub fn rank(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Tier::High => "high",
            Tier::Medium => "medium",
            Tier::Low => "low",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tier {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" => Ok(Tier::High),
            "medium" => Ok(Tier::Medium),
            "low" => Ok(Tier::Low),
            _ => Err(DomainError::UnknownTier(s.to_string())),
        }
    }
}
