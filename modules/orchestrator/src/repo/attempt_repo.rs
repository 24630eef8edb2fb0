//! Append-only log of provider-interaction outcomes, as observed by the
//! orchestrator from `payments.authorized` / `payments.failed` events. This
//! is a read-side record for the timeline API, not the provider adapter's
//! own retry bookkeeping.

use crate::error::OrchestratorError;
use crate::models::PaymentAttempt;
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

pub async fn record(
    tx: &mut Transaction<'_, Postgres>,
    payment_id: Uuid,
    outcome: &str,
) -> Result<(), OrchestratorError> {
    sqlx::query(
        r#"
        INSERT INTO payment_attempts (payment_id, attempt_no, outcome, recorded_at)
        VALUES (
            $1,
            COALESCE((SELECT MAX(attempt_no) FROM payment_attempts WHERE payment_id = $1), 0) + 1,
            $2,
            now()
        )
        "#,
    )
    .bind(payment_id)
    .bind(outcome)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

pub async fn list_for_payment(
    tx: &mut Transaction<'_, Postgres>,
    payment_id: Uuid,
) -> Result<Vec<PaymentAttempt>, OrchestratorError> {
    let rows = sqlx::query_as::<_, PaymentAttempt>(
        "SELECT * FROM payment_attempts WHERE payment_id = $1 ORDER BY attempt_no ASC",
    )
    .bind(payment_id)
    .fetch_all(&mut **tx)
    .await?;

    Ok(rows)
}
