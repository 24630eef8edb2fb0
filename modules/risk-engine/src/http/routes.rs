use crate::error::RiskError;
use crate::events;
use crate::models::{ReviewStatus, RiskReview};
use crate::repo::review_repo;
use crate::AppState;
use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use uuid::Uuid;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/ops/reviews", get(list_reviews))
        .route("/ops/reviews/{payment_id}/approve", post(approve_review))
        .route("/ops/reviews/{payment_id}/deny", post(deny_review))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct ResolveReviewRequest {
    pub reviewed_by: String,
}

async fn list_reviews(State(state): State<AppState>) -> Result<Json<Vec<RiskReview>>, RiskError> {
    let reviews = review_repo::list_pending(&state.pool).await?;
    Ok(Json(reviews))
}

async fn approve_review(
    State(state): State<AppState>,
    Path(payment_id): Path<Uuid>,
    Json(req): Json<ResolveReviewRequest>,
) -> Result<Json<RiskReview>, RiskError> {
    resolve(state, payment_id, req, ReviewStatus::Approved).await
}

async fn deny_review(
    State(state): State<AppState>,
    Path(payment_id): Path<Uuid>,
    Json(req): Json<ResolveReviewRequest>,
) -> Result<Json<RiskReview>, RiskError> {
    resolve(state, payment_id, req, ReviewStatus::Denied).await
}

async fn resolve(
    state: AppState,
    payment_id: Uuid,
    req: ResolveReviewRequest,
    to: ReviewStatus,
) -> Result<Json<RiskReview>, RiskError> {
    if req.reviewed_by.trim().is_empty() {
        return Err(RiskError::InvalidRequest("reviewed_by must not be empty".into()));
    }

    let mut tx = state.pool.begin().await?;

    let review = review_repo::get_by_id(&mut tx, payment_id)
        .await?
        .ok_or(RiskError::NotFound(payment_id))?;

    if review.status != ReviewStatus::Pending {
        tx.rollback().await?;
        return Err(RiskError::AlreadyResolved(payment_id));
    }

    let resolved = review_repo::resolve(&mut tx, payment_id, to, &req.reviewed_by).await?;

    if resolved {
        let correlation_id = payment_id.to_string();
        match to {
            ReviewStatus::Approved => {
                let approved = events::RiskApproved { payment_id };
                let out_envelope = events::envelope(
                    payment_id,
                    events::TOPIC_RISK_APPROVED,
                    &correlation_id,
                    approved,
                );
                outbox::enqueue(
                    &mut tx,
                    out_envelope.event_id,
                    &payment_id.to_string(),
                    events::TOPIC_RISK_APPROVED,
                    &out_envelope,
                )
                .await?;
            }
            ReviewStatus::Denied => {
                let denied = events::RiskDenied {
                    payment_id,
                    classification: "DENY".to_string(),
                    reason: format!("operator {} denied after manual review", req.reviewed_by),
                };
                let out_envelope = events::envelope(
                    payment_id,
                    events::TOPIC_RISK_DENIED,
                    &correlation_id,
                    denied,
                );
                outbox::enqueue(
                    &mut tx,
                    out_envelope.event_id,
                    &payment_id.to_string(),
                    events::TOPIC_RISK_DENIED,
                    &out_envelope,
                )
                .await?;
            }
            ReviewStatus::Pending => unreachable!("resolve is only called with a terminal target"),
        }
    }

    tx.commit().await?;

    let mut tx = state.pool.begin().await?;
    let updated = review_repo::get_by_id(&mut tx, payment_id)
        .await?
        .ok_or(RiskError::NotFound(payment_id))?;
    tx.rollback().await?;

    Ok(Json(updated))
}
