//! # clearaudit-jobs
//!
//! Asynchronous job plumbing for the ClearAudit review client.
//!
//! This crate provides:
//! - [`TaskPoller`]: bounded, cancellable polling of backend job status
//! - [`CancelToken`]: cancellation shared between a poll and its owner
//! - [`spawn_periodic`]: fixed-interval background ticks with graceful shutdown
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use clearaudit_jobs::{PollConfig, TaskPoller};
//!
//! let poller = TaskPoller::new(Arc::new(backend), PollConfig::from_env());
//!
//! // Owned poll: dropping the handle abandons it
//! let handle = poller.spawn(task_handle);
//! let payload = handle.wait().await?;
//! ```

pub mod cancel;
pub mod periodic;
pub mod poller;

// Re-export core types
pub use clearaudit_core::*;

pub use cancel::CancelToken;
pub use periodic::{spawn_periodic, PeriodicHandle};
pub use poller::{PollConfig, PollHandle, TaskPoller};
