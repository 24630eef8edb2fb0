//! Dead-letter handling for consumers that exhaust their retry budget.
//!
//! Mirrors the original event both ways: a row in the local `failed_events`
//! table for operator inspection, and a republish onto `<subject>.dlq` so a
//! separate replay tool can pick it up without querying every service's
//! database by hand.

use event_bus::{BusMessage, EventBus};
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

pub async fn handle_processing_error(
    pool: &PgPool,
    bus: &Arc<dyn EventBus>,
    msg: &BusMessage,
    error: &str,
    retry_count: i32,
) {
    let envelope = match serde_json::from_slice::<serde_json::Value>(&msg.payload) {
        Ok(v) => v,
        Err(parse_err) => {
            tracing::error!(
                subject = %msg.subject,
                error = %error,
                parse_error = %parse_err,
                "failed to process event and could not parse envelope for DLQ"
            );
            return;
        }
    };

    let event_id = envelope
        .get("event_id")
        .and_then(|v| v.as_str())
        .and_then(|s| Uuid::parse_str(s).ok());

    let Some(event_id) = event_id else {
        tracing::error!(subject = %msg.subject, error = %error, "missing event_id, cannot route to DLQ");
        return;
    };

    let write = async {
        let mut tx = pool.begin().await?;
        crate::repo::failed_repo::insert(&mut tx, event_id, &msg.subject, envelope.clone(), error, retry_count)
            .await?;
        tx.commit().await
    }
    .await;

    if let Err(e) = write {
        tracing::error!(event_id = %event_id, subject = %msg.subject, error = %e, "failed to write DLQ row, event may be lost");
        return;
    }

    let dlq_subject = format!("{}.dlq", msg.subject);
    if let Err(e) = bus.publish(&dlq_subject, msg.payload.clone()).await {
        tracing::error!(event_id = %event_id, subject = %dlq_subject, error = %e, "failed to republish to DLQ subject");
    }

    tracing::error!(event_id = %event_id, subject = %msg.subject, retry_count, error, "event moved to DLQ after retries exhausted");
}
