//! Daemon settings loading
//!
//! Precedence (lowest first): built-in defaults, JSON config file,
//! environment. Pool sizing keys come from their upper-cased names
//! (`LOW_PRIORITY_MAX`); every other key needs the `TIERD_` prefix
//! (`TIERD_SHELL`, `TIERD_RPC_PORT`).

use anyhow::{Context, Result};
use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tierd_api_rpc::server::{DEFAULT_RPC_HOST, DEFAULT_RPC_PORT};
use tierd_api_rpc::RpcServerConfig;
use tierd_core::application::worker::constants::{
    IDLE_SLEEP_DURATION, SCALE_INTERVAL, SHUTDOWN_GRACE_PERIOD,
};
use tierd_core::application::PoolOptions;
use tierd_core::domain::config::{
    DEFAULT_HIGH_MIN, DEFAULT_LOW_MAX, DEFAULT_LOW_MIN, DEFAULT_MAX_TOTAL_WORKERS,
    DEFAULT_MEDIUM_MAX, DEFAULT_MEDIUM_MIN,
};
use tierd_core::domain::{PoolConfig, TierLimits};
use tierd_infra_system::shell_executor::DEFAULT_SHELL;

/// Used when neither `--config` nor `TIERD_CONFIG` is given
const DEFAULT_CONFIG_FILE: &str = "config.json";

/// Pool sizing keys, read from the bare upper-cased name (`MAX_TOTAL_WORKERS`)
const POOL_ENV_KEYS: &[&str] = &[
    "max_total_workers",
    "high_priority_min",
    "medium_priority_min",
    "low_priority_min",
    "medium_priority_max",
    "low_priority_max",
];

/// Daemon keys, read only with the prefix (`TIERD_SHELL`); a bare `SHELL`
/// is the login shell and must not leak in
const DAEMON_ENV_KEYS: &[&str] = &[
    "scale_interval_ms",
    "idle_poll_ms",
    "shutdown_grace_secs",
    "shell",
    "rpc_host",
    "rpc_port",
];

const ENV_PREFIX: &str = "TIERD_";

/// Pick the recognised overrides out of an environment, keyed by config key
pub fn env_overrides(
    vars: impl IntoIterator<Item = (String, String)>,
) -> config::Map<String, String> {
    vars.into_iter()
        .filter_map(|(name, value)| {
            let key = name.to_ascii_lowercase();
            if POOL_ENV_KEYS.contains(&key.as_str()) {
                return Some((key, value));
            }
            let key = name.strip_prefix(ENV_PREFIX)?.to_ascii_lowercase();
            DAEMON_ENV_KEYS
                .contains(&key.as_str())
                .then_some((key, value))
        })
        .collect()
}

#[derive(Debug, Clone, Deserialize)]
pub struct DaemonConfig {
    pub max_total_workers: usize,
    pub high_priority_min: usize,
    pub medium_priority_min: usize,
    pub low_priority_min: usize,
    pub medium_priority_max: usize,
    pub low_priority_max: usize,
    pub scale_interval_ms: u64,
    pub idle_poll_ms: u64,
    pub shutdown_grace_secs: u64,
    pub shell: String,
    pub rpc_host: String,
    pub rpc_port: u16,
}

impl DaemonConfig {
    /// Load from the given file (must exist) or `./config.json` (optional),
    /// then the process environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with_env(path, env_overrides(std::env::vars()))
    }

    /// Same as `load` with explicit overrides, keyed by config key (tests)
    pub fn load_with_env(path: Option<&Path>, env: config::Map<String, String>) -> Result<Self> {
        let (file, required) = match path {
            Some(p) => (expand_path(p), true),
            None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
        };

        let settings = Config::builder()
            .set_default("max_total_workers", DEFAULT_MAX_TOTAL_WORKERS as u64)?
            .set_default("high_priority_min", DEFAULT_HIGH_MIN as u64)?
            .set_default("medium_priority_min", DEFAULT_MEDIUM_MIN as u64)?
            .set_default("low_priority_min", DEFAULT_LOW_MIN as u64)?
            .set_default("medium_priority_max", DEFAULT_MEDIUM_MAX as u64)?
            .set_default("low_priority_max", DEFAULT_LOW_MAX as u64)?
            .set_default("scale_interval_ms", SCALE_INTERVAL.as_millis() as u64)?
            .set_default("idle_poll_ms", IDLE_SLEEP_DURATION.as_millis() as u64)?
            .set_default("shutdown_grace_secs", SHUTDOWN_GRACE_PERIOD.as_secs())?
            .set_default("shell", DEFAULT_SHELL)?
            .set_default("rpc_host", DEFAULT_RPC_HOST)?
            .set_default("rpc_port", DEFAULT_RPC_PORT as u64)?
            .add_source(
                File::from(file.as_path())
                    .format(FileFormat::Json)
                    .required(required),
            )
            .add_source(Environment::default().source(Some(env)).try_parsing(true))
            .build()
            .with_context(|| format!("Failed to read configuration ({})", file.display()))?;

        settings
            .try_deserialize()
            .context("Failed to parse configuration values")
    }

    pub fn pool_config(&self) -> PoolConfig {
        PoolConfig::new(
            self.max_total_workers,
            self.high_priority_min,
            TierLimits::new(self.medium_priority_min, self.medium_priority_max),
            TierLimits::new(self.low_priority_min, self.low_priority_max),
        )
    }

    pub fn pool_options(&self) -> PoolOptions {
        PoolOptions {
            idle_sleep: Duration::from_millis(self.idle_poll_ms),
            scale_interval: Duration::from_millis(self.scale_interval_ms),
        }
    }

    pub fn rpc_config(&self) -> RpcServerConfig {
        RpcServerConfig {
            host: self.rpc_host.clone(),
            port: self.rpc_port,
        }
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }

    /// Startup invariants; a failure here must stop the daemon
    pub fn validate(&self) -> Result<()> {
        self.pool_config().validate()?;
        if self.scale_interval_ms == 0 || self.idle_poll_ms == 0 {
            anyhow::bail!("scale_interval_ms and idle_poll_ms must be positive");
        }
        if self.shell.trim().is_empty() {
            anyhow::bail!("shell must not be empty");
        }
        Ok(())
    }
}

fn expand_path(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    PathBuf::from(shellexpand::tilde(&raw).into_owned())
}
