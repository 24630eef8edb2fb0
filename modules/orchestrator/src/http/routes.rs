use crate::error::OrchestratorError;
use crate::events;
use crate::repo::payment_repo::{self, InsertOutcome};
use crate::repo::timeline_repo;
use crate::AppState;
use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/payments", post(create_payment))
        .route("/payments/{payment_id}", get(get_payment))
        .route("/payments/{payment_id}/timeline", get(get_timeline))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct CreatePaymentRequest {
    pub customer_id: String,
    pub amount_cents: i64,
    pub currency: String,
    pub idempotency_key: String,
}

#[derive(Debug, Serialize)]
pub struct PaymentResponse {
    pub payment_id: Uuid,
    pub customer_id: String,
    pub amount_cents: i64,
    pub currency: String,
    pub status: String,
    pub state_version: i64,
}

impl From<crate::models::Payment> for PaymentResponse {
    fn from(p: crate::models::Payment) -> Self {
        Self {
            payment_id: p.payment_id,
            customer_id: p.customer_id,
            amount_cents: p.amount_cents,
            currency: p.currency,
            status: p.status.to_string(),
            state_version: p.state_version,
        }
    }
}

async fn create_payment(
    State(state): State<AppState>,
    Json(req): Json<CreatePaymentRequest>,
) -> Result<Json<PaymentResponse>, OrchestratorError> {
    if req.amount_cents < 0 {
        return Err(OrchestratorError::InvalidRequest(
            "amount_cents must not be negative".into(),
        ));
    }
    if req.currency.len() != 3 {
        return Err(OrchestratorError::InvalidRequest(
            "currency must be a 3-letter ISO 4217 code".into(),
        ));
    }
    if req.idempotency_key.trim().is_empty() {
        return Err(OrchestratorError::InvalidRequest(
            "idempotency_key must not be empty".into(),
        ));
    }

    if let Some(payment_id) = state
        .idempotency_cache
        .get(&req.customer_id, &req.idempotency_key)
        .await
    {
        let mut tx = state.pool.begin().await?;
        if let Some(payment) = payment_repo::get_by_id(&mut tx, payment_id).await? {
            tx.rollback().await?;
            return Ok(Json(payment.into()));
        }
    }

    let payment_id = Uuid::new_v4();
    let correlation_id = payment_id.to_string();
    let mut tx = state.pool.begin().await?;

    let outcome = payment_repo::insert_new(
        &mut tx,
        payment_id,
        &req.customer_id,
        req.amount_cents,
        &req.currency,
        &req.idempotency_key,
        &correlation_id,
    )
    .await?;

    let payment = match outcome {
        InsertOutcome::Created(payment) => {
            let requested = events::PaymentRequested {
                payment_id: payment.payment_id,
                customer_id: payment.customer_id.clone(),
                amount_cents: payment.amount_cents,
                currency: payment.currency.clone(),
                idempotency_key: payment.idempotency_key.clone(),
            };
            let envelope = events::envelope(
                payment.payment_id,
                events::TOPIC_PAYMENTS_REQUESTED,
                &payment.correlation_id,
                requested,
            );
            outbox::enqueue(
                &mut tx,
                envelope.event_id,
                &payment.payment_id.to_string(),
                events::TOPIC_PAYMENTS_REQUESTED,
                &envelope,
            )
            .await?;
            payment
        }
        InsertOutcome::AlreadyExists(payment) => payment,
    };

    tx.commit().await?;

    state
        .idempotency_cache
        .insert(&req.customer_id, &req.idempotency_key, payment.payment_id)
        .await;

    Ok(Json(payment.into()))
}

async fn get_payment(
    State(state): State<AppState>,
    Path(payment_id): Path<Uuid>,
) -> Result<Json<PaymentResponse>, OrchestratorError> {
    let mut tx = state.pool.begin().await?;
    let payment = payment_repo::get_by_id(&mut tx, payment_id)
        .await?
        .ok_or(OrchestratorError::NotFound(payment_id))?;
    tx.rollback().await?;
    Ok(Json(payment.into()))
}

async fn get_timeline(
    State(state): State<AppState>,
    Path(payment_id): Path<Uuid>,
) -> Result<Json<Vec<crate::models::TimelineEntry>>, OrchestratorError> {
    let mut tx = state.pool.begin().await?;
    if payment_repo::get_by_id(&mut tx, payment_id).await?.is_none() {
        return Err(OrchestratorError::NotFound(payment_id));
    }
    let entries = timeline_repo::list_for_payment(&mut tx, payment_id).await?;
    tx.rollback().await?;
    Ok(Json(entries))
}
