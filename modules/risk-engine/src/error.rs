use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum RiskError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("outbox error: {0}")]
    Outbox(#[from] outbox::OutboxError),

    #[error("inbox error: {0}")]
    Inbox(#[from] inbox::InboxError),

    #[error("review not found: {0}")]
    NotFound(uuid::Uuid),

    #[error("review already resolved: {0}")]
    AlreadyResolved(uuid::Uuid),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl IntoResponse for RiskError {
    fn into_response(self) -> Response {
        let status = match &self {
            RiskError::NotFound(_) => StatusCode::NOT_FOUND,
            RiskError::AlreadyResolved(_) => StatusCode::CONFLICT,
            RiskError::InvalidRequest(_) => StatusCode::UNPROCESSABLE_ENTITY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "internal error");
        }

        (status, axum::Json(json!({ "error": self.to_string() }))).into_response()
    }
}
