use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("outbox error: {0}")]
    Outbox(#[from] outbox::OutboxError),

    #[error("inbox error: {0}")]
    Inbox(#[from] inbox::InboxError),
}

impl IntoResponse for ProviderError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self, "internal error");
        (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(json!({ "error": self.to_string() }))).into_response()
    }
}
