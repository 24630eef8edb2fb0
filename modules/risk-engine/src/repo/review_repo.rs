//! Persistence for the risk_reviews table. Created only on the REVIEW
//! branch of the decision table; terminal on operator action via
//! [`resolve`], which CASes off `PENDING` so a double-click on the
//! operator UI never resolves the same review twice.

use crate::error::RiskError;
use crate::models::{ReviewStatus, RiskReview, RiskReviewRow};
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

pub async fn insert(
    tx: &mut Transaction<'_, Postgres>,
    payment_id: Uuid,
    customer_id: &str,
    amount_cents: i64,
) -> Result<(), RiskError> {
    sqlx::query(
        r#"
        INSERT INTO risk_reviews (payment_id, customer_id, amount_cents, status, created_at)
        VALUES ($1, $2, $3, 'PENDING', now())
        ON CONFLICT (payment_id) DO NOTHING
        "#,
    )
    .bind(payment_id)
    .bind(customer_id)
    .bind(amount_cents)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

pub async fn get_by_id(
    tx: &mut Transaction<'_, Postgres>,
    payment_id: Uuid,
) -> Result<Option<RiskReview>, RiskError> {
    let row = sqlx::query_as::<_, RiskReviewRow>(
        "SELECT * FROM risk_reviews WHERE payment_id = $1",
    )
    .bind(payment_id)
    .fetch_optional(&mut **tx)
    .await?;

    row.map(|r| r.into_review().map_err(RiskError::InvalidRequest))
        .transpose()
}

pub async fn list_pending(pool: &sqlx::PgPool) -> Result<Vec<RiskReview>, RiskError> {
    let rows = sqlx::query_as::<_, RiskReviewRow>(
        "SELECT * FROM risk_reviews WHERE status = 'PENDING' ORDER BY created_at ASC",
    )
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|r| r.into_review().map_err(RiskError::InvalidRequest))
        .collect()
}

/// CAS the review from PENDING to a terminal status. Returns `true` if this
/// call resolved it, `false` if it was already resolved by someone else.
pub async fn resolve(
    tx: &mut Transaction<'_, Postgres>,
    payment_id: Uuid,
    to: ReviewStatus,
    reviewed_by: &str,
) -> Result<bool, RiskError> {
    let result = sqlx::query(
        r#"
        UPDATE risk_reviews
        SET status = $1, reviewed_by = $2, reviewed_at = now()
        WHERE payment_id = $3 AND status = 'PENDING'
        "#,
    )
    .bind(to.as_str())
    .bind(reviewed_by)
    .bind(payment_id)
    .execute(&mut **tx)
    .await?;

    Ok(result.rows_affected() == 1)
}
