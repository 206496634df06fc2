//! Foodgram Common Library
//!
//! Shared code for the Foodgram services including:
//! - Database models, schema and repository
//! - Recipe composition rules and shopping list aggregation
//! - Error types and handling
//! - Configuration management
//! - Authentication utilities
//! - Recipe image storage
//! - Metrics and observability

pub mod auth;
pub mod config;
pub mod db;
pub mod domain;
pub mod errors;
pub mod media;
pub mod metrics;

// Re-export commonly used types
pub use config::AppConfig;
pub use db::{DbPool, Repository};
pub use errors::{AppError, Result};
pub use media::ImageStore;

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
