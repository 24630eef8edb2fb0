//! Outbox-health gauges, named after the metric the spec calls out explicitly:
//! `outbox_oldest_pending_age_seconds`. A growing value means publishers are
//! falling behind or stuck; a `FAILED` row increments the companion counter
//! so an alert can fire without polling the table.

use lazy_static::lazy_static;
use prometheus::{register_counter, register_gauge, Counter, Gauge};
use sqlx::PgPool;

lazy_static! {
    static ref OLDEST_PENDING_AGE_SECONDS: Gauge = register_gauge!(
        "outbox_oldest_pending_age_seconds",
        "Age in seconds of the oldest unpublished outbox row"
    )
    .expect("failed to register outbox_oldest_pending_age_seconds gauge");
    static ref FAILED_TOTAL: Counter = register_counter!(
        "outbox_failed_total",
        "Outbox rows that exhausted their publish attempt budget"
    )
    .expect("failed to register outbox_failed_total counter");
}

pub(crate) fn set_oldest_pending_age(seconds: f64) {
    OLDEST_PENDING_AGE_SECONDS.set(seconds);
}

pub(crate) fn record_failed() {
    FAILED_TOTAL.inc();
}

/// Age, in seconds, of the oldest row still waiting to be published
/// (`PENDING` or claimed `PROCESSING`). `None` when the outbox is drained.
pub async fn oldest_pending_age_seconds(pool: &PgPool) -> Result<Option<f64>, sqlx::Error> {
    let row: (Option<f64>,) = sqlx::query_as(
        r#"
        SELECT EXTRACT(EPOCH FROM (now() - MIN(created_at)))
        FROM outbox_events
        WHERE status IN ('PENDING', 'PROCESSING')
        "#,
    )
    .fetch_one(pool)
    .await?;

    Ok(row.0)
}
