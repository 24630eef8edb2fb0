//! Subscribes to `payments.captured` and posts the double-entry: a DEBIT on
//! the customer-side account, a CREDIT on the merchant-side account, both
//! for `amount_cents`, both in the same transaction as the inbox claim.

use crate::config::Config;
use crate::events;
use crate::repo::ledger_repo;
use event_bus::consumer_retry::{retry_with_backoff, RetryConfig};
use event_bus::{BusMessage, EventBus, EventEnvelope};
use futures::StreamExt;
use inbox::Claim;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::Instrument;

const CONSUMER_NAME: &str = "ledger";

pub async fn start(bus: Arc<dyn EventBus>, pool: PgPool, config: Arc<Config>) {
    tokio::spawn(async move {
        let mut stream = match bus.subscribe(events::TOPIC_PAYMENTS_CAPTURED).await {
            Ok(s) => s,
            Err(e) => {
                tracing::error!(error = %e, "failed to subscribe to payments.captured");
                return;
            }
        };

        let retry_config = RetryConfig::default();

        while let Some(msg) = stream.next().await {
            handle(&pool, &bus, &msg, &retry_config, &config).await;
        }

        tracing::warn!(consumer = CONSUMER_NAME, "capture consumer stopped");
    });
}

async fn handle(pool: &PgPool, bus: &Arc<dyn EventBus>, msg: &BusMessage, retry_config: &RetryConfig, config: &Arc<Config>) {
    let span = tracing::info_span!("capture_consumer_handle", subject = %msg.subject);
    async {
        let pool = pool.clone();
        let msg_clone = msg.clone();
        let config = config.clone();
        let result = retry_with_backoff(
            || process(pool.clone(), msg_clone.clone(), config.clone()),
            retry_config,
            CONSUMER_NAME,
        )
        .await;

        if let Err(error) = result {
            crate::dlq::handle_processing_error(pool.as_ref(), bus, msg, &error, retry_config.max_attempts as i32).await;
        }
    }
    .instrument(span)
    .await;
}

async fn process(pool: PgPool, msg: BusMessage, config: Arc<Config>) -> Result<(), String> {
    let envelope: EventEnvelope<events::PaymentCaptured> =
        serde_json::from_slice(&msg.payload).map_err(|e| format!("bad envelope: {e}"))?;

    let mut tx = pool.begin().await.map_err(|e| e.to_string())?;

    if inbox::claim(&mut tx, envelope.event_id, CONSUMER_NAME)
        .await
        .map_err(|e| e.to_string())?
        == Claim::Duplicate
    {
        tx.rollback().await.map_err(|e| e.to_string())?;
        return Ok(());
    }

    let payload = &envelope.payload;

    ledger_repo::post_entry(
        &mut tx,
        payload.payment_id,
        &config.customer_account_ref,
        &config.merchant_account_ref,
        payload.amount_cents,
        &payload.currency,
        envelope.event_id,
    )
    .await
    .map_err(|e| e.to_string())?;

    let correlation_id = envelope
        .correlation_id
        .clone()
        .unwrap_or_else(|| payload.payment_id.to_string());

    let settled = events::PaymentSettled {
        payment_id: payload.payment_id,
    };
    let out_envelope = events::envelope(payload.payment_id, events::TOPIC_PAYMENTS_SETTLED, &correlation_id, settled);
    outbox::enqueue(
        &mut tx,
        out_envelope.event_id,
        &payload.payment_id.to_string(),
        events::TOPIC_PAYMENTS_SETTLED,
        &out_envelope,
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
        assert_eq!(CONSUMER_NAME, "ledger");
    }
}
