//! Aggregate domain error used at service boundaries throughout the runtime.

use thiserror::Error;
use uuid::Uuid;

/// Domain-level errors that can occur anywhere in the cortex runtime.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("goal not found: {0}")]
    GoalNotFound(Uuid),

    #[error("memory not found: {0}")]
    MemoryNotFound(Uuid),

    #[error("alert not found: {kind}/{severity}")]
    AlertNotFound { kind: String, severity: String },

    #[error("thought not found: {0}")]
    ThoughtNotFound(Uuid),

    #[error("invalid state transition from {from} to {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("goal has unresolved dependencies: {0}")]
    UnresolvedDependencies(Uuid),

    #[error("validation failed: {0}")]
    ValidationFailed(String),

    #[error("database error: {0}")]
    DatabaseError(String),

    #[error("runtime DDL blocked: {0}")]
    BlockedRuntimeDdl(String),

    #[error("provider error: {0}")]
    ProviderError(String),

    #[error("all providers exhausted: {0:?}")]
    AllProvidersExhausted(Vec<String>),

    #[error("serialization error: {0}")]
    SerializationError(String),

    #[error("concurrency conflict: {entity} {id} was modified")]
    ConcurrencyConflict { entity: String, id: String },

    #[error("execution failed: {0}")]
    ExecutionFailed(String),

    #[error("operation cancelled")]
    Cancelled,
}

pub type DomainResult<T> = Result<T, DomainError>;

impl From<sqlx::Error> for DomainError {
    fn from(err: sqlx::Error) -> Self {
        DomainError::DatabaseError(err.to_string())
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        DomainError::SerializationError(err.to_string())
    }
}

impl From<super::error::DatabaseError> for DomainError {
    fn from(err: super::error::DatabaseError) -> Self {
        match err {
            super::error::DatabaseError::BlockedRuntimeDdl { statement_prefix } => {
                DomainError::BlockedRuntimeDdl(statement_prefix)
            }
            other => DomainError::DatabaseError(other.to_string()),
        }
    }
}

impl From<super::error::ProviderError> for DomainError {
    fn from(err: super::error::ProviderError) -> Self {
        match err {
            super::error::ProviderError::AllProvidersExhausted { errors } => {
                DomainError::AllProvidersExhausted(errors)
            }
            other => DomainError::ProviderError(other.to_string()),
        }
    }
}
