use crate::error::NotificationError;
use crate::repo::notification_repo;
use crate::AppState;
use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use uuid::Uuid;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/notifications/{payment_id}", get(get_notifications))
        .with_state(state)
}

async fn get_notifications(
    State(state): State<AppState>,
    Path(payment_id): Path<Uuid>,
) -> Result<Json<Vec<crate::models::Notification>>, NotificationError> {
    let notifications = notification_repo::list_for_payment(&state.pool, payment_id).await?;
    if notifications.is_empty() {
        return Err(NotificationError::NotFound(payment_id));
    }
    Ok(Json(notifications))
}
