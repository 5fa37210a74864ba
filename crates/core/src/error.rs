// Central Error Type for the Application

use thiserror::Error;

/// Application-level error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Domain error: {0}")]
    Domain(#[from] crate::domain::DomainError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("queue not defined: {0}")]
    QueueNotDefined(String),

    #[error("Broker error: {0}")]
    Broker(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

// Note: lapin::Error and sqlx::Error conversions live in the infra crates
// (orphan rules), mapped to AppError::Broker / AppError::Database

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_not_defined_message_names_queue() {
        let err = AppError::QueueNotDefined("unknown-queue".to_string());
        let msg = err.to_string();
        assert!(msg.contains("queue not defined"));
        assert!(msg.contains("unknown-queue"));
    }

    #[test]
    fn test_domain_error_converts() {
        let err: AppError = crate::domain::DomainError::ValidationError("bad".into()).into();
        assert!(matches!(err, AppError::Domain(_)));
    }
}
