//! # clearaudit-client
//!
//! HTTP client for the ClearAudit document audit backend.
//!
//! This crate provides:
//! - [`HttpBackend`], the reqwest implementation of [`AuditBackend`]
//! - Environment-driven [`ClientConfig`]
//! - Status-code classification of backend errors
//! - A scripted in-memory [`mock::MockBackend`] (feature `mock`)
//!
//! # Example
//!
//! ```rust,no_run
//! use clearaudit_client::HttpBackend;
//! use clearaudit_core::AuditBackend;
//!
//! #[tokio::main]
//! async fn main() {
//!     let backend = HttpBackend::from_env().unwrap();
//!     let documents = backend.list_documents().await.unwrap();
//!     println!("{} documents", documents.len());
//! }
//! ```

mod backend;
pub mod config;
pub mod error;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

// Re-export core types
pub use clearaudit_core::*;

pub use backend::HttpBackend;
pub use config::ClientConfig;
pub use error::{to_audit_error, ApiErrorCode};
