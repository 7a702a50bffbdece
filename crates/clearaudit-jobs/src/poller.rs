//! Bounded, cancellable polling of backend job status.
//!
//! A submitted job is polled at a fixed interval until it reports `SUCCESS`
//! or `FAILURE`, the attempt budget runs out, or the caller cancels. Each wait
//! is a timer suspension raced against the cancellation token, so independent
//! polls never block one another and an abandoned poll stops at its next
//! suspension point.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value as JsonValue;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use clearaudit_core::defaults;
use clearaudit_core::{AuditBackend, Error, Result, TaskHandle, TaskState, TaskStatus};

use crate::cancel::CancelToken;

/// Configuration for task polling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    /// Wait between consecutive status queries, in milliseconds.
    pub interval_ms: u64,
    /// Maximum number of status queries before giving up.
    pub max_attempts: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_ms: defaults::POLL_INTERVAL_MS,
            max_attempts: defaults::POLL_MAX_ATTEMPTS,
        }
    }
}

impl PollConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `CLEARAUDIT_POLL_INTERVAL_MS` | `2000` | Wait between status queries |
    /// | `CLEARAUDIT_POLL_MAX_ATTEMPTS` | `60` | Status queries before timing out |
    pub fn from_env() -> Self {
        Self {
            interval_ms: defaults::env_or(defaults::ENV_POLL_INTERVAL_MS, defaults::POLL_INTERVAL_MS),
            max_attempts: defaults::env_or(
                defaults::ENV_POLL_MAX_ATTEMPTS,
                defaults::POLL_MAX_ATTEMPTS,
            )
            .max(1),
        }
    }

    pub fn with_interval(mut self, ms: u64) -> Self {
        self.interval_ms = ms;
        self
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Upper bound on wall time spent waiting (excluding request latency).
    pub fn ceiling(&self) -> Duration {
        Duration::from_millis(
            self.interval_ms
                .saturating_mul(u64::from(self.max_attempts.saturating_sub(1))),
        )
    }
}

/// Polls `GET /tasks/{id}/status` until a terminal outcome.
#[derive(Clone)]
pub struct TaskPoller {
    backend: Arc<dyn AuditBackend>,
    config: PollConfig,
}

impl TaskPoller {
    pub fn new(backend: Arc<dyn AuditBackend>, config: PollConfig) -> Self {
        Self { backend, config }
    }

    pub fn config(&self) -> &PollConfig {
        &self.config
    }

    /// Poll a job to completion.
    ///
    /// Returns the job's result payload on `SUCCESS` (`null` when the backend
    /// sent none). Fails with `TaskFailed` on `FAILURE`, `TaskTimeout` once
    /// `max_attempts` queries have all reported a non-terminal state, and
    /// `Cancelled` if `cancel` fires first. A status query that errors
    /// consumes one attempt and polling continues.
    pub async fn poll(&self, handle: &TaskHandle, cancel: &CancelToken) -> Result<JsonValue> {
        let interval = Duration::from_millis(self.config.interval_ms);
        let max_attempts = self.config.max_attempts.max(1);
        let task_id = handle.task_id.as_str();
        let start = Instant::now();

        for attempt in 1..=max_attempts {
            let status = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(cancelled(handle, attempt - 1)),
                status = self.backend.task_status(task_id) => status,
            };

            match status {
                Ok(TaskStatus {
                    state: TaskState::Success,
                    result,
                    ..
                }) => {
                    info!(
                        task_id,
                        document_id = handle.document_id,
                        attempt,
                        duration_ms = start.elapsed().as_millis() as u64,
                        "Task succeeded"
                    );
                    return Ok(result.unwrap_or(JsonValue::Null));
                }
                Ok(TaskStatus {
                    state: TaskState::Failure,
                    error,
                    ..
                }) => {
                    let message = error
                        .filter(|e| !e.trim().is_empty())
                        .unwrap_or_else(|| defaults::TASK_FAILED_MESSAGE.to_string());
                    warn!(
                        task_id,
                        document_id = handle.document_id,
                        attempt,
                        error = %message,
                        "Task failed"
                    );
                    return Err(Error::TaskFailed(message));
                }
                Ok(_) => {
                    debug!(task_id, attempt, max_attempts, "Task still running");
                }
                Err(e) => {
                    warn!(task_id, attempt, error = %e, "Task status query failed");
                }
            }

            if attempt < max_attempts {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Err(cancelled(handle, attempt)),
                    _ = sleep(interval) => {}
                }
            }
        }

        warn!(
            task_id,
            document_id = handle.document_id,
            attempts = max_attempts,
            duration_ms = start.elapsed().as_millis() as u64,
            "Task polling exhausted"
        );
        Err(Error::TaskTimeout {
            task_id: handle.task_id.clone(),
            attempts: max_attempts,
        })
    }

    /// Poll on a background task.
    ///
    /// The returned handle cancels the poll when dropped, so a poll never
    /// outlives its owner.
    pub fn spawn(&self, handle: TaskHandle) -> PollHandle {
        let cancel = CancelToken::new();
        let poller = self.clone();
        let token = cancel.clone();
        let task_id = handle.task_id.clone();
        let join = tokio::spawn(async move { poller.poll(&handle, &token).await });

        PollHandle {
            task_id,
            cancel,
            join: Some(join),
        }
    }
}

fn cancelled(handle: &TaskHandle, attempts: u32) -> Error {
    info!(task_id = %handle.task_id, attempts, "Task polling cancelled");
    Error::Cancelled(format!(
        "polling for task {} abandoned after {} attempts",
        handle.task_id, attempts
    ))
}

/// Owner of a spawned poll.
pub struct PollHandle {
    task_id: String,
    cancel: CancelToken,
    join: Option<JoinHandle<Result<JsonValue>>>,
}

impl PollHandle {
    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    /// Stop the poll at its next suspension point.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Token shared with the background poll.
    pub fn token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Wait for the poll's outcome.
    pub async fn wait(mut self) -> Result<JsonValue> {
        let Some(join) = self.join.take() else {
            return Err(Error::Cancelled(format!("task {} already awaited", self.task_id)));
        };
        match join.await {
            Ok(result) => result,
            Err(e) => Err(Error::Cancelled(format!(
                "poll task for {} did not complete: {}",
                self.task_id, e
            ))),
        }
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
