//! Dashboard refresh configuration.

use std::time::Duration;

use clearaudit_core::defaults;

/// Configuration for the periodic dashboard refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshConfig {
    /// Refresh period in milliseconds.
    pub interval_ms: u64,
    /// Whether the periodic refresh runs at all. Post-mutation refreshes
    /// happen regardless.
    pub enabled: bool,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval_ms: defaults::REFRESH_INTERVAL_MS,
            enabled: true,
        }
    }
}

impl RefreshConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `CLEARAUDIT_REFRESH_INTERVAL_MS` | `5000` | Refresh period; `0` disables |
    pub fn from_env() -> Self {
        let interval_ms =
            defaults::env_or(defaults::ENV_REFRESH_INTERVAL_MS, defaults::REFRESH_INTERVAL_MS);
        Self {
            interval_ms,
            enabled: interval_ms > 0,
        }
    }

    pub fn with_interval(mut self, ms: u64) -> Self {
        self.interval_ms = ms;
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}
