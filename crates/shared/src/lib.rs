//! Shared types, errors, and configuration for the corebank ledger.
//!
//! This crate provides the vocabulary every other crate speaks:
//! - Typed IDs for tenants, journal entries and events
//! - Currency codes and money amounts with decimal precision
//! - Paging parameters for list queries
//! - The adapter-facing error type
//! - Configuration loading

pub mod config;
pub mod error;
pub mod types;

pub use config::AppConfig;
pub use error::{AppError, AppResult};
