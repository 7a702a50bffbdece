//! # clearaudit-review
//!
//! Client-side orchestration of the document audit lifecycle.
//!
//! This crate provides:
//! - [`AuditStore`]: the explicitly owned entity store
//! - [`ReviewOrchestrator`]: upload, analysis, risk assessment and finding
//!   review, each applied locally only after the backend acknowledges
//! - [`DocumentSession`]: an open document whose polls end when it closes
//! - [`Dashboard`] and [`DashboardRefresher`]: derived counters, filtered
//!   views and the periodic full refresh
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use clearaudit_client::HttpBackend;
//! use clearaudit_review::{
//!     AuditStore, DashboardRefresher, PollConfig, RefreshConfig, ReviewOrchestrator,
//! };
//!
//! let backend = Arc::new(HttpBackend::from_env()?);
//! let orchestrator =
//!     ReviewOrchestrator::new(backend, AuditStore::new(), PollConfig::from_env());
//! orchestrator.refresh().await?;
//! let refresher = DashboardRefresher::start(orchestrator.clone(), RefreshConfig::from_env());
//!
//! let session = orchestrator.open_document(7).await?;
//! session.analyze().await?;
//! ```

pub mod config;
pub mod dashboard;
pub mod events;
pub mod orchestrator;
pub mod session;
pub mod store;

// Re-export core types
pub use clearaudit_core::*;

pub use clearaudit_jobs::{CancelToken, PollConfig};
pub use config::RefreshConfig;
pub use dashboard::{Dashboard, DashboardRefresher, DocumentFilter};
pub use events::LifecycleEvent;
pub use orchestrator::ReviewOrchestrator;
pub use session::DocumentSession;
pub use store::{ActionGuard, AuditStore};
