//! Centralized default constants for the ClearAudit client.
//!
//! **This module is the single source of truth** for shared default values
//! and environment variable names. Crates reference these constants instead
//! of defining their own magic numbers.

// =============================================================================
// BACKEND
// =============================================================================

/// Default backend base URL.
pub const API_URL: &str = "http://localhost:8000";

/// Default per-request timeout in seconds.
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Timeout for the health probe in seconds.
pub const HEALTH_TIMEOUT_SECS: u64 = 5;

// =============================================================================
// TASK POLLING
// =============================================================================

/// Interval between job status queries in milliseconds.
pub const POLL_INTERVAL_MS: u64 = 2000;

/// Maximum job status queries before giving up (60 x 2s = 120s ceiling).
pub const POLL_MAX_ATTEMPTS: u32 = 60;

/// Message used when the backend reports FAILURE without an error text.
pub const TASK_FAILED_MESSAGE: &str = "Task failed";

// =============================================================================
// DASHBOARD
// =============================================================================

/// Full re-fetch period for the document list and stats in milliseconds.
pub const REFRESH_INTERVAL_MS: u64 = 5000;

/// Capacity of the lifecycle event broadcast channel.
pub const EVENT_BUS_CAPACITY: usize = 256;

// =============================================================================
// LOGGING
// =============================================================================

/// Default `EnvFilter` directives when `RUST_LOG` is unset.
pub const LOG_FILTER: &str = "clearaudit=info";

// =============================================================================
// ENVIRONMENT VARIABLES
// =============================================================================

pub const ENV_API_URL: &str = "CLEARAUDIT_API_URL";
pub const ENV_API_TOKEN: &str = "CLEARAUDIT_API_TOKEN";
pub const ENV_TIMEOUT_SECS: &str = "CLEARAUDIT_TIMEOUT_SECS";
pub const ENV_POLL_INTERVAL_MS: &str = "CLEARAUDIT_POLL_INTERVAL_MS";
pub const ENV_POLL_MAX_ATTEMPTS: &str = "CLEARAUDIT_POLL_MAX_ATTEMPTS";
pub const ENV_REFRESH_INTERVAL_MS: &str = "CLEARAUDIT_REFRESH_INTERVAL_MS";
pub const ENV_LOG_FORMAT: &str = "LOG_FORMAT";

/// Read a numeric environment variable, falling back to `default` when it is
/// unset or unparsable.
pub fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}
