//! Structured logging schema and subscriber setup for ClearAudit.
//!
//! All crates use these field names for consistent structured logging, so a
//! presentation layer can filter one document's or one task's history out of
//! the combined stream.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Client cannot continue (subscriber setup, broken invariants) |
//! | WARN  | Recoverable issue, stale data kept or attempt consumed |
//! | INFO  | Completed mutations (upload, analysis, review) and poll outcomes |
//! | DEBUG | Decision points, per-attempt polling, refresh snapshots |
//! | TRACE | Per-entity iteration |

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::defaults;

// ─── Identity fields ───────────────────────────────────────────────────────

/// Correlation ID for one orchestrator action and its sub-calls.
/// Format: UUIDv7 (time-ordered).
pub const REQUEST_ID: &str = "request_id";

/// Component originating the log event.
/// Values: "client", "poller", "orchestrator", "store", "dashboard"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "upload", "analyze", "risk_assessment", "review", "refresh"
pub const OPERATION: &str = "op";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Document identifier being operated on.
pub const DOCUMENT_ID: &str = "document_id";

/// Finding identifier being reviewed.
pub const FINDING_ID: &str = "finding_id";

/// Backend task identifier being polled.
pub const TASK_ID: &str = "task_id";

// ─── Measurement fields ────────────────────────────────────────────────────

/// One-based poll attempt number.
pub const ATTEMPT: &str = "attempt";

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of entities returned by a fetch.
pub const RESULT_COUNT: &str = "result_count";

/// HTTP status code of a backend response.
pub const HTTP_STATUS: &str = "http_status";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Boolean success/failure indicator.
pub const SUCCESS: &str = "success";

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";

/// Install the global tracing subscriber.
///
/// | Variable | Default | Description |
/// |----------|---------|-------------|
/// | `RUST_LOG` | `clearaudit=info` | Filter directives |
/// | `LOG_FORMAT` | `text` | `json` or `text` |
///
/// Returns `false` if a global subscriber was already installed.
pub fn init_tracing() -> bool {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| defaults::LOG_FILTER.into());

    let json = std::env::var(defaults::ENV_LOG_FORMAT)
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(env_filter);
    let result = if json {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
    } else {
        registry.with(tracing_subscriber::fmt::layer()).try_init()
    };

    result.is_ok()
}
