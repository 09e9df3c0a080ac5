use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not Found: {0}")]
    NotFound(String),

    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Slot unavailable: {0}")]
    SlotUnavailable(String),

    /// A policy refusal: the mutation is not legal for the record's current state.
    #[error("Cannot {action}: {reason}")]
    InvalidState { action: String, reason: String },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal Server Error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Auth(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) | AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::SlotUnavailable(_) | AppError::InvalidState { .. } | AppError::Conflict(_) => {
                StatusCode::CONFLICT
            }
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::Auth(_) => "unauthorized",
            AppError::Forbidden(_) => "forbidden",
            AppError::NotFound(_) => "not_found",
            AppError::BadRequest(_) => "bad_request",
            AppError::ValidationError(_) => "validation_error",
            AppError::SlotUnavailable(_) => "slot_unavailable",
            AppError::InvalidState { .. } => "invalid_state",
            AppError::Conflict(_) => "conflict",
            AppError::Database(_) => "database_error",
            AppError::Internal(_) => "internal_error",
        }
    }

    fn is_policy_refusal(&self) -> bool {
        !matches!(self, AppError::Database(_) | AppError::Internal(_))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if self.is_policy_refusal() {
            tracing::warn!("Request refused: {}: {}", status, self);
        } else {
            tracing::error!("Error: {}: {}", status, self);
        }

        let body = match &self {
            AppError::InvalidState { action, reason } => json!({
                "success": false,
                "error": self.code(),
                "action": action,
                "reason": reason,
                "message": self.to_string(),
            }),
            _ => json!({
                "success": false,
                "error": self.code(),
                "message": self.to_string(),
            }),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_invalid_state_is_structured_conflict() {
        let error = AppError::InvalidState {
            action: "delete".to_string(),
            reason: "appointment has been paid".to_string(),
        };
        assert_eq!(error.code(), "invalid_state");

        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["action"], "delete");
        assert_eq!(json["reason"], "appointment has been paid");
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(AppError::SlotUnavailable("taken".into()).status_code(), StatusCode::CONFLICT);
        assert_eq!(AppError::ValidationError("bad".into()).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::NotFound("gone".into()).status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::Database("down".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
