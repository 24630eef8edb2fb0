use crate::error::OrchestratorError;
use crate::models::TimelineEntry;
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

pub async fn list_for_payment(
    tx: &mut Transaction<'_, Postgres>,
    payment_id: Uuid,
) -> Result<Vec<TimelineEntry>, OrchestratorError> {
    let rows = sqlx::query_as::<_, TimelineEntry>(
        "SELECT * FROM payment_timeline WHERE payment_id = $1 ORDER BY id ASC",
    )
    .bind(payment_id)
    .fetch_all(&mut **tx)
    .await?;

    Ok(rows)
}
