//! Tracing subscriber setup
//!
//! - `RUST_LOG`: filter directives (default: info for every tierd crate)
//! - `TIERD_LOG_FORMAT`: `json` for structured output, anything else is pretty
//! - `TIERD_LOG_DIR`: also write a daily-rolling `tierd.log` there

use anyhow::Result;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const DEFAULT_FILTER: &str = "tierd=info,tierd_core=info,tierd_api_rpc=info,tierd_infra_system=info";
const LOG_FILE_NAME: &str = "tierd.log";

/// Install the global subscriber. Keep the returned guard alive for the
/// life of the process so buffered file output is flushed on exit.
pub fn init_logging() -> Result<Option<WorkerGuard>> {
    let log_format = std::env::var("TIERD_LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());

    let env_filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(DEFAULT_FILTER))?;

    let stdout_layer = match log_format.as_str() {
        // Production: JSON structured logging
        "json" => fmt::layer().json().boxed(),
        // Development: Pretty formatting with colors
        _ => fmt::layer().pretty().boxed(),
    };

    let (file_layer, guard) = match std::env::var("TIERD_LOG_DIR") {
        Ok(dir) if !dir.trim().is_empty() => {
            let dir = shellexpand::tilde(&dir).into_owned();
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_NAME);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_ansi(false).with_writer(writer);
            (Some(layer), Some(guard))
        }
        _ => (None, None),
    };

    tracing_subscriber::registry()
        .with(stdout_layer)
        .with(file_layer)
        .with(env_filter)
        .try_init()?;

    Ok(guard)
}
