//! Append-only log of this adapter's own authorization attempts, one row
//! per attempt_no for a payment (including retried TIMEOUT attempts).

use crate::error::ProviderError;
use crate::models::ProviderAttempt;
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

pub async fn record(
    tx: &mut Transaction<'_, Postgres>,
    payment_id: Uuid,
    attempt_no: i32,
    outcome: &str,
    backoff_ms_waited: i32,
) -> Result<(), ProviderError> {
    sqlx::query(
        r#"
        INSERT INTO provider_attempts (payment_id, attempt_no, outcome, backoff_ms_waited, recorded_at)
        VALUES ($1, $2, $3, $4, now())
        "#,
    )
    .bind(payment_id)
    .bind(attempt_no)
    .bind(outcome)
    .bind(backoff_ms_waited)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

pub async fn list_for_payment(
    tx: &mut Transaction<'_, Postgres>,
    payment_id: Uuid,
) -> Result<Vec<ProviderAttempt>, ProviderError> {
    let rows = sqlx::query_as::<_, ProviderAttempt>(
        "SELECT * FROM provider_attempts WHERE payment_id = $1 ORDER BY attempt_no ASC",
    )
    .bind(payment_id)
    .fetch_all(&mut **tx)
    .await?;

    Ok(rows)
}
