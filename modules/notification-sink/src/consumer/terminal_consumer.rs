//! Subscribes to the three terminal-outcome topics and records one
//! notification row per payment per terminal event. Inbox-guarded per
//! event_id so a redelivered `payments.settled` never produces a second row.

use crate::events;
use event_bus::consumer_retry::{retry_with_backoff, RetryConfig};
use event_bus::{BusMessage, EventBus, EventEnvelope};
use futures::StreamExt;
use inbox::Claim;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::Instrument;

const CONSUMER_NAME: &str = "notification-sink.terminal_consumer";

pub async fn start(bus: Arc<dyn EventBus>, pool: PgPool) {
    tokio::spawn(async move {
        let settled = subscribe(&bus, events::TOPIC_PAYMENTS_SETTLED).await;
        let failed = subscribe(&bus, events::TOPIC_PAYMENTS_FAILED).await;
        let reversed = subscribe(&bus, events::TOPIC_PAYMENTS_REVERSED).await;
        let (Some(mut settled), Some(mut failed), Some(mut reversed)) = (settled, failed, reversed)
        else {
            return;
        };

        let retry_config = RetryConfig::default();

        loop {
            tokio::select! {
                Some(msg) = settled.next() => {
                    handle(&pool, &bus, &msg, &retry_config, handle_settled).await;
                }
                Some(msg) = failed.next() => {
                    handle(&pool, &bus, &msg, &retry_config, handle_failed).await;
                }
                Some(msg) = reversed.next() => {
                    handle(&pool, &bus, &msg, &retry_config, handle_reversed).await;
                }
                else => break,
            }
        }

        tracing::warn!(consumer = CONSUMER_NAME, "terminal consumer stopped");
    });
}

async fn subscribe(
    bus: &Arc<dyn EventBus>,
    subject: &str,
) -> Option<futures::stream::BoxStream<'static, BusMessage>> {
    match bus.subscribe(subject).await {
        Ok(s) => {
            tracing::info!(subject, "subscribed");
            Some(s)
        }
        Err(e) => {
            tracing::error!(subject, error = %e, "failed to subscribe");
            None
        }
    }
}

async fn handle<F, Fut>(
    pool: &PgPool,
    bus: &Arc<dyn EventBus>,
    msg: &BusMessage,
    retry_config: &RetryConfig,
    handler: F,
) where
    F: Fn(PgPool, BusMessage) -> Fut,
    Fut: std::future::Future<Output = Result<(), String>>,
{
    let span = tracing::info_span!("terminal_consumer_handle", subject = %msg.subject);
    async {
        let pool = pool.clone();
        let msg_clone = msg.clone();
        let result = retry_with_backoff(
            || handler(pool.clone(), msg_clone.clone()),
            retry_config,
            CONSUMER_NAME,
        )
        .await;

        if let Err(error) = result {
            crate::dlq::handle_processing_error(&pool, bus, msg, &error, retry_config.max_attempts as i32).await;
        }
    }
    .instrument(span)
    .await;
}

async fn handle_settled(pool: PgPool, msg: BusMessage) -> Result<(), String> {
    let envelope: EventEnvelope<events::PaymentSettled> =
        serde_json::from_slice(&msg.payload).map_err(|e| format!("bad envelope: {e}"))?;

    let mut tx = pool.begin().await.map_err(|e| e.to_string())?;

    if inbox::claim(&mut tx, envelope.event_id, "notification-sink")
        .await
        .map_err(|e| e.to_string())?
        == Claim::Duplicate
    {
        tx.rollback().await.map_err(|e| e.to_string())?;
        return Ok(());
    }

    crate::repo::notification_repo::insert(
        &mut tx,
        envelope.payload.payment_id,
        "SETTLED",
        None,
        envelope.event_id,
    )
    .await
    .map_err(|e| e.to_string())?;

    tx.commit().await.map_err(|e| e.to_string())?;
    Ok(())
}

async fn handle_failed(pool: PgPool, msg: BusMessage) -> Result<(), String> {
    let envelope: EventEnvelope<events::PaymentFailed> =
        serde_json::from_slice(&msg.payload).map_err(|e| format!("bad envelope: {e}"))?;

    let mut tx = pool.begin().await.map_err(|e| e.to_string())?;

    if inbox::claim(&mut tx, envelope.event_id, "notification-sink")
        .await
        .map_err(|e| e.to_string())?
        == Claim::Duplicate
    {
        tx.rollback().await.map_err(|e| e.to_string())?;
        return Ok(());
    }

    crate::repo::notification_repo::insert(
        &mut tx,
        envelope.payload.payment_id,
        "FAILED",
        Some(&envelope.payload.reason),
        envelope.event_id,
    )
    .await
    .map_err(|e| e.to_string())?;

    tx.commit().await.map_err(|e| e.to_string())?;
    Ok(())
}

async fn handle_reversed(pool: PgPool, msg: BusMessage) -> Result<(), String> {
    let envelope: EventEnvelope<events::PaymentReversed> =
        serde_json::from_slice(&msg.payload).map_err(|e| format!("bad envelope: {e}"))?;

    let mut tx = pool.begin().await.map_err(|e| e.to_string())?;

    if inbox::claim(&mut tx, envelope.event_id, "notification-sink")
        .await
        .map_err(|e| e.to_string())?
        == Claim::Duplicate
    {
        tx.rollback().await.map_err(|e| e.to_string())?;
        return Ok(());
    }

    crate::repo::notification_repo::insert(
        &mut tx,
        envelope.payload.payment_id,
        "REVERSED",
        Some(&envelope.payload.reason),
        envelope.event_id,
    )
    .await
    .map_err(|e| e.to_string())?;

    tx.commit().await.map_err(|e| e.to_string())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consumer_name_is_stable() {
        assert_eq!(CONSUMER_NAME, "notification-sink.terminal_consumer");
    }
}
