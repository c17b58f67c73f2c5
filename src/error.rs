use thiserror::Error;
use uuid::Uuid;

/// Main error type for the projection engine and the learning loop
#[derive(Error, Debug)]
pub enum PropsightError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    // Storage errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Storage error: {0}")]
    Storage(String),

    // Serialization errors
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    // Analysis errors
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    // Ledger errors
    #[error("Prediction not found: {prediction_id}")]
    PredictionNotFound { prediction_id: Uuid },

    #[error("Prediction already verified: {prediction_id}")]
    AlreadyVerified { prediction_id: Uuid },

    // Validation errors
    #[error("Validation failed: {0}")]
    Validation(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Generic errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PropsightError {
    /// Transient persistence failures; the caller may retry with backoff.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Storage(_) => true,
            Self::Database(err) => !matches!(
                err,
                sqlx::Error::RowNotFound
                    | sqlx::Error::ColumnNotFound(_)
                    | sqlx::Error::ColumnDecode { .. }
                    | sqlx::Error::Decode(_)
                    | sqlx::Error::TypeNotFound { .. }
            ),
            _ => false,
        }
    }

    /// Expected outcome of racing verifications; callers treat it as a no-op.
    pub fn is_benign_conflict(&self) -> bool {
        matches!(self, Self::AlreadyVerified { .. })
    }

    /// Stable machine-readable code used in structured error payloads.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Config(_) => "config_error",
            Self::Database(_) | Self::Migration(_) | Self::Storage(_) => "storage_error",
            Self::Json(_) => "serialization_error",
            Self::InsufficientData(_) => "insufficient_data",
            Self::PredictionNotFound { .. } => "not_found",
            Self::AlreadyVerified { .. } => "already_verified",
            Self::Validation(_) => "validation_error",
            Self::Io(_) => "io_error",
            Self::Internal(_) => "internal_error",
        }
    }
}

/// Result type alias for PropsightError
pub type Result<T> = std::result::Result<T, PropsightError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_errors_are_retryable() {
        assert!(PropsightError::Storage("connection reset".into()).is_retryable());
        assert!(PropsightError::Database(sqlx::Error::PoolTimedOut).is_retryable());
        assert!(!PropsightError::Database(sqlx::Error::RowNotFound).is_retryable());
        assert!(!PropsightError::Validation("bad".into()).is_retryable());
    }

    #[test]
    fn already_verified_is_benign() {
        let err = PropsightError::AlreadyVerified {
            prediction_id: Uuid::nil(),
        };
        assert!(err.is_benign_conflict());
        assert_eq!(err.code(), "already_verified");
        assert!(!PropsightError::InsufficientData("empty".into()).is_benign_conflict());
    }
}
