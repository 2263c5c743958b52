// Worker & scaler constants (No magic values)
use std::time::Duration;

/// Polling backoff when a worker's queue is empty (100ms)
pub const IDLE_SLEEP_DURATION: Duration = Duration::from_millis(100);

/// Period of the tier scaler control loop (500ms)
pub const SCALE_INTERVAL: Duration = Duration::from_millis(500);

/// How long shutdown waits for in-flight commands (30s)
pub const SHUTDOWN_GRACE_PERIOD: Duration = Duration::from_secs(30);

/// Longest command output echoed into a single log line (bytes)
pub const MAX_LOGGED_OUTPUT_BYTES: usize = 4096;
