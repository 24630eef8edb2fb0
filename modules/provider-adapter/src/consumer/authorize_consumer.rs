//! Subscribes to `provider.authorize.requested` and simulates calling out to
//! a card network. The envelope is inbox-guarded once, at the point the
//! outcome is emitted — everything before that (the bounded `1s, 2s, 4s`
//! TIMEOUT retry loop) is this adapter's own bookkeeping, not redelivery.
//! The claim is committed in the same transaction as the outbox enqueue for
//! the outcome: a transient failure while emitting must not leave the event
//! claimed with no outcome ever published, which would strand the payment in
//! `APPROVED` forever.

use crate::config::Config;
use crate::events;
use crate::outcome::{self, Outcome};
use crate::repo::attempt_repo;
use event_bus::{BusMessage, EventBus, EventEnvelope};
use futures::StreamExt;
use inbox::Claim;
use sqlx::{PgPool, Postgres, Transaction};
use std::sync::Arc;
use tracing::Instrument;

const CONSUMER_NAME: &str = "provider-adapter";

pub async fn start(bus: Arc<dyn EventBus>, pool: PgPool, config: Arc<Config>) {
    tokio::spawn(async move {
        let mut stream = match bus.subscribe(events::TOPIC_PROVIDER_AUTHORIZE_REQUESTED).await {
            Ok(s) => s,
            Err(e) => {
                tracing::error!(error = %e, "failed to subscribe to provider.authorize.requested");
                return;
            }
        };

        while let Some(msg) = stream.next().await {
            handle(&pool, &bus, &msg, &config).await;
        }

        tracing::warn!(consumer = CONSUMER_NAME, "authorize consumer stopped");
    });
}

async fn handle(pool: &PgPool, bus: &Arc<dyn EventBus>, msg: &BusMessage, config: &Arc<Config>) {
    let span = tracing::info_span!("authorize_consumer_handle", subject = %msg.subject);
    async {
        if let Err(error) = process(pool, bus, msg, config).await {
            crate::dlq::handle_processing_error(pool, bus, msg, &error, 0).await;
        }
    }
    .instrument(span)
    .await;
}

async fn process(pool: &PgPool, bus: &Arc<dyn EventBus>, msg: &BusMessage, config: &Arc<Config>) -> Result<(), String> {
    let envelope: EventEnvelope<events::ProviderAuthorizeRequested> =
        serde_json::from_slice(&msg.payload).map_err(|e| format!("bad envelope: {e}"))?;

    let payload = &envelope.payload;
    let correlation_id = envelope
        .correlation_id
        .clone()
        .unwrap_or_else(|| payload.payment_id.to_string());

    let mut last_outcome = Outcome::Success;
    let mut backoff_ms_waited = 0i32;

    for (idx, backoff_ms) in config.backoff_schedule_ms.iter().enumerate() {
        let attempt_no = (idx as i32) + 1;
        last_outcome = outcome::classify(payload.amount_cents, config);

        record_attempt(pool, payload.payment_id, attempt_no, last_outcome, backoff_ms_waited).await?;

        if last_outcome != Outcome::Timeout {
            break;
        }

        if idx + 1 < config.backoff_schedule_ms.len() {
            tokio::time::sleep(std::time::Duration::from_millis(*backoff_ms)).await;
            backoff_ms_waited = *backoff_ms as i32;
        }
    }

    // Claim the inbox row and enqueue the outcome in one transaction. If this
    // commits, the event is permanently marked processed *and* an outcome is
    // on its way out; if anything here fails, the row stays unclaimed and
    // redelivery redoes the retry loop above rather than being dropped as a
    // stale duplicate with no outcome ever emitted.
    let mut tx = pool.begin().await.map_err(|e| e.to_string())?;
    if inbox::claim(&mut tx, envelope.event_id, CONSUMER_NAME)
        .await
        .map_err(|e| e.to_string())?
        == Claim::Duplicate
    {
        tx.rollback().await.map_err(|e| e.to_string())?;
        return Ok(());
    }

    match last_outcome {
        Outcome::Success => {
            enqueue_authorized(&mut tx, payload.payment_id, &correlation_id).await?;
        }
        Outcome::Decline => {
            enqueue_failed(
                &mut tx,
                payload,
                &correlation_id,
                "DECLINE",
                "provider declined the authorization",
            )
            .await?;
        }
        Outcome::Malformed => {
            enqueue_failed(
                &mut tx,
                payload,
                &correlation_id,
                "NON_RETRYABLE",
                "authorization request was malformed",
            )
            .await?;
        }
        Outcome::Timeout => {
            enqueue_failed(
                &mut tx,
                payload,
                &correlation_id,
                "RETRY_EXHAUSTED",
                "provider timed out after exhausting retries",
            )
            .await?;
        }
    }

    tx.commit().await.map_err(|e| e.to_string())?;

    match last_outcome {
        Outcome::Malformed => dlq_original(pool, bus, msg, "malformed authorization request").await,
        Outcome::Timeout => dlq_original(pool, bus, msg, "provider timeout retries exhausted").await,
        _ => {}
    }

    Ok(())
}

async fn record_attempt(
    pool: &PgPool,
    payment_id: uuid::Uuid,
    attempt_no: i32,
    outcome: Outcome,
    backoff_ms_waited: i32,
) -> Result<(), String> {
    let label = match outcome {
        Outcome::Success => "SUCCESS",
        Outcome::Decline => "DECLINE",
        Outcome::Timeout => "TIMEOUT",
        Outcome::Malformed => "MALFORMED",
    };

    let mut tx = pool.begin().await.map_err(|e| e.to_string())?;
    attempt_repo::record(&mut tx, payment_id, attempt_no, label, backoff_ms_waited)
        .await
        .map_err(|e| e.to_string())?;
    tx.commit().await.map_err(|e| e.to_string())?;
    Ok(())
}

async fn enqueue_authorized(
    tx: &mut Transaction<'_, Postgres>,
    payment_id: uuid::Uuid,
    correlation_id: &str,
) -> Result<(), String> {
    let authorized = events::PaymentAuthorized { payment_id };
    let out_envelope = events::envelope(payment_id, events::TOPIC_PAYMENTS_AUTHORIZED, correlation_id, authorized);
    outbox::enqueue(
        tx,
        out_envelope.event_id,
        &payment_id.to_string(),
        events::TOPIC_PAYMENTS_AUTHORIZED,
        &out_envelope,
    )
    .await
    .map_err(|e| e.to_string())
}

async fn enqueue_failed(
    tx: &mut Transaction<'_, Postgres>,
    payload: &events::ProviderAuthorizeRequested,
    correlation_id: &str,
    classification: &str,
    reason: &str,
) -> Result<(), String> {
    let failed = events::PaymentFailed {
        payment_id: payload.payment_id,
        customer_id: payload.customer_id.clone(),
        classification: classification.to_string(),
        reason: reason.to_string(),
    };
    let out_envelope = events::envelope(payload.payment_id, events::TOPIC_PAYMENTS_FAILED, correlation_id, failed);
    outbox::enqueue(
        tx,
        out_envelope.event_id,
        &payload.payment_id.to_string(),
        events::TOPIC_PAYMENTS_FAILED,
        &out_envelope,
    )
    .await
    .map_err(|e| e.to_string())
}

async fn dlq_original(pool: &PgPool, bus: &Arc<dyn EventBus>, msg: &BusMessage, reason: &str) {
    crate::dlq::handle_processing_error(pool, bus, msg, reason, 0).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consumer_name_is_stable() {
        assert_eq!(CONSUMER_NAME, "provider-adapter");
    }
}
