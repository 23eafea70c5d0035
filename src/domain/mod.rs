//! Domain layer for the cortex runtime
//!
//! This module contains core business logic and domain models: thoughts,
//! goals, memory, providers, and alerts, plus the typed error taxonomy and
//! the repository ports the infrastructure layer implements.

pub mod error;
pub mod errors;
pub mod models;
pub mod ports;

// Re-export error types for convenient access
pub use error::{ConfigError, DatabaseError, ProviderError};
pub use errors::{DomainError, DomainResult};
