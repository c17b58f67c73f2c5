use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tracing::error;

use crate::api::types::{ErrorBody, ErrorResponse};
use crate::error::PropsightError;

impl PropsightError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::InsufficientData(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::PredictionNotFound { .. } => StatusCode::NOT_FOUND,
            Self::AlreadyVerified { .. } => StatusCode::CONFLICT,
            Self::Database(_) | Self::Migration(_) | Self::Storage(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            Self::Config(_) | Self::Json(_) | Self::Io(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<&PropsightError> for ErrorBody {
    fn from(err: &PropsightError) -> Self {
        Self {
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }
}

impl IntoResponse for PropsightError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        }
        let body = ErrorResponse {
            error: ErrorBody::from(&self),
        };
        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for PropsightError {
    fn from(rejection: JsonRejection) -> Self {
        PropsightError::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for PropsightError {
    fn from(rejection: PathRejection) -> Self {
        PropsightError::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for PropsightError {
    fn from(rejection: QueryRejection) -> Self {
        PropsightError::Validation(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            PropsightError::Validation("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            PropsightError::InsufficientData("x".into()).status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            PropsightError::AlreadyVerified {
                prediction_id: Uuid::nil()
            }
            .status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            PropsightError::Storage("down".into()).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
