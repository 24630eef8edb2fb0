use crate::error::LedgerError;
use crate::models::ReconciliationResult;
use crate::repo::ledger_repo;
use crate::AppState;
use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use uuid::Uuid;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/reconciliation", get(reconcile_all))
        .route("/reconciliation/{transaction_id}", get(reconcile_one))
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct ReconciliationSweep {
    checked: usize,
    imbalanced: Vec<ReconciliationResult>,
}

async fn reconcile_one(
    State(state): State<AppState>,
    Path(transaction_id): Path<Uuid>,
) -> Result<Json<ReconciliationResult>, LedgerError> {
    let mut tx = state.pool.begin().await?;
    let result = ledger_repo::reconcile_transaction(&mut tx, transaction_id)
        .await?
        .ok_or(LedgerError::NotFound(transaction_id))?;
    tx.rollback().await?;
    Ok(Json(result))
}

async fn reconcile_all(State(state): State<AppState>) -> Result<Json<ReconciliationSweep>, LedgerError> {
    let mut tx = state.pool.begin().await?;
    let results = ledger_repo::reconcile_all(&mut tx).await?;
    tx.rollback().await?;

    let checked = results.len();
    let imbalanced: Vec<ReconciliationResult> = results.into_iter().filter(|r| !r.balanced).collect();

    if !imbalanced.is_empty() {
        tracing::error!(count = imbalanced.len(), "reconciliation sweep found imbalanced transactions");
    }

    Ok(Json(ReconciliationSweep { checked, imbalanced }))
}
