// Pool Configuration Domain Model

use super::error::{DomainError, Result};
use super::tier::Tier;
use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_TOTAL_WORKERS: usize = 50;
pub const DEFAULT_HIGH_MIN: usize = 40;
pub const DEFAULT_MEDIUM_MIN: usize = 7;
pub const DEFAULT_LOW_MIN: usize = 3;
pub const DEFAULT_MEDIUM_MAX: usize = 10;
pub const DEFAULT_LOW_MAX: usize = 5;

/// Worker bounds for a single tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierLimits {
    pub min_workers: usize,
    pub max_workers: usize,
}

impl TierLimits {
    pub fn new(min_workers: usize, max_workers: usize) -> Self {
        Self {
            min_workers,
            max_workers,
        }
    }
}

/// Resolved worker pool parameters, fixed for the process lifetime.
///
/// The high tier has no ceiling of its own: it may grow up to
/// `global_max_workers`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    pub global_max_workers: usize,
    pub high_min_workers: usize,
    pub medium: TierLimits,
    pub low: TierLimits,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            global_max_workers: DEFAULT_MAX_TOTAL_WORKERS,
            high_min_workers: DEFAULT_HIGH_MIN,
            medium: TierLimits::new(DEFAULT_MEDIUM_MIN, DEFAULT_MEDIUM_MAX),
            low: TierLimits::new(DEFAULT_LOW_MIN, DEFAULT_LOW_MAX),
        }
    }
}

impl PoolConfig {
    pub fn new(
        global_max_workers: usize,
        high_min_workers: usize,
        medium: TierLimits,
        low: TierLimits,
    ) -> Self {
        Self {
            global_max_workers,
            high_min_workers,
            medium,
            low,
        }
    }

    /// Effective bounds for a tier
    pub fn limits(&self, tier: Tier) -> TierLimits {
        match tier {
            Tier::High => TierLimits::new(self.high_min_workers, self.global_max_workers),
            Tier::Medium => self.medium,
            Tier::Low => self.low,
        }
    }

    /// Sum of every tier's guaranteed workers
    pub fn total_min_workers(&self) -> usize {
        Tier::ALL.iter().map(|t| self.limits(*t).min_workers).sum()
    }

    /// Check the startup invariants; any violation is fatal for the daemon.
    pub fn validate(&self) -> Result<()> {
        if self.global_max_workers == 0 {
            return Err(DomainError::InvalidConfig(
                "max_total_workers must be positive".to_string(),
            ));
        }

        for tier in Tier::ALL {
            let limits = self.limits(tier);
            if limits.min_workers == 0 || limits.max_workers == 0 {
                return Err(DomainError::InvalidConfig(format!(
                    "{} tier: min/max workers must be positive (min={}, max={})",
                    tier, limits.min_workers, limits.max_workers
                )));
            }
            if limits.min_workers > limits.max_workers {
                return Err(DomainError::InvalidConfig(format!(
                    "{} tier: min_workers ({}) exceeds max_workers ({})",
                    tier, limits.min_workers, limits.max_workers
                )));
            }
            if limits.max_workers > self.global_max_workers {
                return Err(DomainError::InvalidConfig(format!(
                    "{} tier: max_workers ({}) exceeds max_total_workers ({})",
                    tier, limits.max_workers, self.global_max_workers
                )));
            }
        }

        let total_min = self.total_min_workers();
        if total_min > self.global_max_workers {
            return Err(DomainError::InvalidConfig(format!(
                "sum of min workers ({}) exceeds max_total_workers ({})",
                total_min, self.global_max_workers
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = PoolConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.total_min_workers(), 50);
    }

    #[test]
    fn test_high_ceiling_is_global_max() {
        let config = PoolConfig::new(8, 2, TierLimits::new(1, 3), TierLimits::new(1, 2));
        assert_eq!(config.limits(Tier::High), TierLimits::new(2, 8));
        assert_eq!(config.limits(Tier::Medium), TierLimits::new(1, 3));
        assert_eq!(config.limits(Tier::Low), TierLimits::new(1, 2));
    }

    #[test]
    fn test_min_above_max_rejected() {
        let config = PoolConfig::new(10, 1, TierLimits::new(4, 3), TierLimits::new(1, 1));
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("medium tier"));
    }

    #[test]
    fn test_min_sum_above_global_rejected() {
        let config = PoolConfig::new(3, 2, TierLimits::new(1, 2), TierLimits::new(1, 1));
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("sum of min workers"));
    }

    #[test]
    fn test_zero_values_rejected() {
        let config = PoolConfig::new(0, 1, TierLimits::new(1, 1), TierLimits::new(1, 1));
        assert!(config.validate().is_err());

        let config = PoolConfig::new(5, 1, TierLimits::new(1, 1), TierLimits::new(0, 1));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_tier_max_above_global_rejected() {
        let config = PoolConfig::new(4, 1, TierLimits::new(1, 6), TierLimits::new(1, 1));
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("exceeds max_total_workers"));
    }
}
