//! Subscribes to `payments.settled`, published by the ledger once it has
//! posted the double-entry rows for a captured payment.

use crate::events;
use crate::repo::payment_repo;
use crate::state_machine::PaymentStatus;
use event_bus::consumer_retry::{retry_with_backoff, RetryConfig};
use event_bus::{BusMessage, EventBus, EventEnvelope};
use futures::StreamExt;
use inbox::Claim;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::Instrument;

const CONSUMER_NAME: &str = "orchestrator.ledger_consumer";

pub async fn start(bus: Arc<dyn EventBus>, pool: PgPool) {
    tokio::spawn(async move {
        let mut stream = match bus.subscribe(events::TOPIC_PAYMENTS_SETTLED).await {
            Ok(s) => s,
            Err(e) => {
                tracing::error!(subject = events::TOPIC_PAYMENTS_SETTLED, error = %e, "failed to subscribe");
                return;
            }
        };

        let retry_config = RetryConfig::default();

        while let Some(msg) = stream.next().await {
            let span = tracing::info_span!("ledger_consumer_handle", subject = %msg.subject);
            async {
                let pool = pool.clone();
                let msg_clone = msg.clone();
                let result = retry_with_backoff(
                    || handle_settled(pool.clone(), msg_clone.clone()),
                    &retry_config,
                    CONSUMER_NAME,
                )
                .await;

                if let Err(error) = result {
                    crate::dlq::handle_processing_error(&pool, &bus, &msg, &error, retry_config.max_attempts as i32)
                        .await;
                }
            }
            .instrument(span)
            .await;
        }

        tracing::warn!(consumer = CONSUMER_NAME, "ledger consumer stopped");
    });
}

async fn handle_settled(pool: PgPool, msg: BusMessage) -> Result<(), String> {
    let envelope: EventEnvelope<events::PaymentSettled> =
        serde_json::from_slice(&msg.payload).map_err(|e| format!("bad envelope: {e}"))?;

    let mut tx = pool.begin().await.map_err(|e| e.to_string())?;

    if inbox::claim(&mut tx, envelope.event_id, "orchestrator")
        .await
        .map_err(|e| e.to_string())?
        == Claim::Duplicate
    {
        tx.rollback().await.map_err(|e| e.to_string())?;
        return Ok(());
    }

    let payment = payment_repo::get_by_id(&mut tx, envelope.payload.payment_id)
        .await
        .map_err(|e| e.to_string())?
        .ok_or_else(|| format!("unknown payment {}", envelope.payload.payment_id))?;

    if payment.status.is_terminal() {
        tx.commit().await.map_err(|e| e.to_string())?;
        return Ok(());
    }

    payment_repo::try_transition(
        &mut tx,
        payment.payment_id,
        payment.state_version,
        payment.status,
        PaymentStatus::Settled,
        "ledger settled",
        Some(envelope.event_id),
    )
    .await
    .map_err(|e| e.to_string())?;

    tx.commit().await.map_err(|e| e.to_string())?;
    Ok(())
}
