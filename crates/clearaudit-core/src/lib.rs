//! # clearaudit-core
//!
//! Core types, traits, and abstractions for the ClearAudit review client.
//!
//! This crate provides the entity models (documents, findings, job handles),
//! the error taxonomy, centralized defaults, the structured-logging schema,
//! and the [`AuditBackend`] trait that other ClearAudit crates depend on.

pub mod defaults;
pub mod error;
pub mod logging;
pub mod models;
pub mod traits;

// Re-export commonly used types at crate root
pub use error::{Error, Result};
pub use models::*;
pub use traits::*;
