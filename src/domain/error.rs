//! Domain error types for the cortex runtime
//!
//! This module defines all error types using thiserror for structured error handling.
//! Each error enum represents errors from a specific domain or infrastructure component.

use thiserror::Error;

/// Errors related to calling an external generative-AI provider through the
/// fallback gateway.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// The request failed due to network or transport error
    #[error("provider request failed: {0}")]
    RequestFailed(String),

    /// Rate limit has been exceeded
    #[error("rate limit exceeded")]
    RateLimitExceeded,

    /// Authentication failed (invalid or missing API key)
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Provider response was invalid or could not be parsed
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Request timed out after the configured deadline
    #[error("timeout after {0} seconds")]
    Timeout(u64),

    /// Provider returned an error status code
    #[error("provider error {status}: {message}")]
    ApiError { status: u16, message: String },

    /// Provider signalled quota exhaustion; distinct from a generic failure
    /// so the gateway can mark the provider unavailable immediately,
    /// bypassing the failure-streak threshold.
    #[error("quota exceeded for provider")]
    QuotaExceeded,

    /// No configured provider produced a result
    #[error("all providers exhausted: {errors:?}")]
    AllProvidersExhausted { errors: Vec<String> },
}

impl ProviderError {
    /// Returns true if this error is transient and should be retried
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::RateLimitExceeded | Self::Timeout(_) | Self::RequestFailed(_) => true,
            Self::ApiError { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Returns true if this error is permanent and should not be retried
    pub const fn is_permanent(&self) -> bool {
        match self {
            Self::AuthenticationFailed(_) | Self::QuotaExceeded => true,
            Self::ApiError { status, .. } => *status == 400 || *status == 401,
            _ => false,
        }
    }

    /// Returns true if this error should flip the provider's `available`
    /// flag immediately, bypassing the consecutive-failure streak threshold.
    pub const fn bypasses_streak_threshold(&self) -> bool {
        matches!(self, Self::QuotaExceeded)
    }
}

/// Errors related to database operations and the resilient store facade
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Database connection could not be established
    #[error("database connection failed: {0}")]
    ConnectionFailed(String),

    /// A database query failed
    #[error("query failed: {0}")]
    QueryFailed(String),

    /// Database migration failed
    #[error("migration failed: {0}")]
    MigrationFailed(String),

    /// Database transaction failed
    #[error("transaction failed: {0}")]
    TransactionFailed(String),

    /// Database constraint violation
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    /// Row not found in query result
    #[error("row not found")]
    RowNotFound,

    /// Serialization/deserialization error
    #[error("serialization error: {0}")]
    SerializationError(String),

    /// The DDL kill-switch rejected a schema-changing statement
    #[error("runtime DDL blocked: statement begins with {statement_prefix:?}")]
    BlockedRuntimeDdl { statement_prefix: String },
}

impl DatabaseError {
    /// Returns true if this error is transient and could succeed on retry.
    ///
    /// A blocked-DDL error is never transient: retrying would not change
    /// the outcome.
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::ConnectionFailed(_) | Self::TransactionFailed(_))
    }
}

/// Errors related to configuration loading and validation
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file was not found at the specified path
    #[error("config file not found: {0}")]
    FileNotFound(String),

    /// Invalid YAML syntax in configuration file
    #[error("invalid YAML: {0}")]
    InvalidYaml(String),

    /// Required configuration field is missing
    #[error("missing required field: {0}")]
    MissingField(String),

    /// Configuration field has an invalid value
    #[error("invalid value for {field}: {value}")]
    InvalidValue { field: String, value: String },

    /// I/O error while reading configuration file
    #[error("I/O error reading config: {0}")]
    IoError(String),

    /// Environment variable error
    #[error("environment variable error: {0}")]
    EnvVarError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_display() {
        let err = ProviderError::RateLimitExceeded;
        assert_eq!(err.to_string(), "rate limit exceeded");

        let err = ProviderError::Timeout(30);
        assert_eq!(err.to_string(), "timeout after 30 seconds");

        let err = ProviderError::ApiError {
            status: 500,
            message: "internal server error".to_string(),
        };
        assert_eq!(err.to_string(), "provider error 500: internal server error");
    }

    #[test]
    fn provider_error_is_transient() {
        assert!(ProviderError::RateLimitExceeded.is_transient());
        assert!(ProviderError::Timeout(30).is_transient());
        assert!(ProviderError::ApiError {
            status: 500,
            message: "error".to_string()
        }
        .is_transient());
        assert!(!ProviderError::AuthenticationFailed("invalid key".to_string()).is_transient());
    }

    #[test]
    fn provider_error_is_permanent() {
        assert!(ProviderError::AuthenticationFailed("invalid key".to_string()).is_permanent());
        assert!(ProviderError::QuotaExceeded.is_permanent());
        assert!(!ProviderError::RateLimitExceeded.is_permanent());
    }

    #[test]
    fn quota_exceeded_bypasses_streak_threshold() {
        assert!(ProviderError::QuotaExceeded.bypasses_streak_threshold());
        assert!(!ProviderError::RequestFailed("boom".to_string()).bypasses_streak_threshold());
    }

    #[test]
    fn database_error_display() {
        let err = DatabaseError::ConnectionFailed("timeout".to_string());
        assert_eq!(err.to_string(), "database connection failed: timeout");

        let err = DatabaseError::QueryFailed("syntax error".to_string());
        assert_eq!(err.to_string(), "query failed: syntax error");
    }

    #[test]
    fn database_error_is_transient() {
        assert!(DatabaseError::ConnectionFailed("timeout".to_string()).is_transient());
        assert!(DatabaseError::TransactionFailed("conflict".to_string()).is_transient());
        assert!(!DatabaseError::ConstraintViolation("unique".to_string()).is_transient());
        assert!(!DatabaseError::BlockedRuntimeDdl {
            statement_prefix: "CREATE".to_string()
        }
        .is_transient());
    }

    #[test]
    fn config_error_display() {
        let err = ConfigError::FileNotFound("/path/to/config.yaml".to_string());
        assert_eq!(
            err.to_string(),
            "config file not found: /path/to/config.yaml"
        );

        let err = ConfigError::InvalidValue {
            field: "priority".to_string(),
            value: "invalid".to_string(),
        };
        assert_eq!(err.to_string(), "invalid value for priority: invalid");
    }
}
