//! Single-writer table: only this service's consumers ever insert here.

use crate::models::Notification;
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

pub async fn insert(
    tx: &mut Transaction<'_, Postgres>,
    payment_id: Uuid,
    outcome: &str,
    reason: Option<&str>,
    event_id: Uuid,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO notifications (payment_id, outcome, reason, event_id, recorded_at)
        VALUES ($1, $2, $3, $4, now())
        "#,
    )
    .bind(payment_id)
    .bind(outcome)
    .bind(reason)
    .bind(event_id)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

pub async fn list_for_payment(
    pool: &sqlx::PgPool,
    payment_id: Uuid,
) -> Result<Vec<Notification>, sqlx::Error> {
    sqlx::query_as::<_, Notification>(
        "SELECT * FROM notifications WHERE payment_id = $1 ORDER BY id ASC",
    )
    .bind(payment_id)
    .fetch_all(pool)
    .await
}
