use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("outbox error: {0}")]
    Outbox(#[from] outbox::OutboxError),

    #[error("inbox error: {0}")]
    Inbox(#[from] inbox::InboxError),

    #[error("payment not found: {0}")]
    NotFound(uuid::Uuid),

    #[error("invalid state transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("idempotency conflict: same key, different payload")]
    IdempotencyConflict,

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl IntoResponse for OrchestratorError {
    fn into_response(self) -> Response {
        let status = match &self {
            OrchestratorError::NotFound(_) => StatusCode::NOT_FOUND,
            OrchestratorError::InvalidTransition { .. } | OrchestratorError::InvalidRequest(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            OrchestratorError::IdempotencyConflict => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "internal error");
        }

        (status, axum::Json(json!({ "error": self.to_string() }))).into_response()
    }
}
