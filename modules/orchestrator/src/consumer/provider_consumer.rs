//! Subscribes to the provider adapter's outcome events. A `payments.authorized`
//! advances `APPROVED -> AUTHORIZED -> CAPTURED` in one handler invocation —
//! this orchestrator captures immediately on authorization rather than
//! waiting for a separate signal — and emits `payments.captured` for the
//! ledger. A `payments.failed` moves the payment straight to `FAILED`.

use crate::events;
use crate::repo::{attempt_repo, payment_repo};
use crate::repo::payment_repo::TransitionOutcome;
use crate::state_machine::PaymentStatus;
use event_bus::consumer_retry::{retry_with_backoff, RetryConfig};
use event_bus::{BusMessage, EventBus, EventEnvelope};
use futures::StreamExt;
use inbox::Claim;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::Instrument;

const CONSUMER_NAME: &str = "orchestrator.provider_consumer";

pub async fn start(bus: Arc<dyn EventBus>, pool: PgPool) {
    tokio::spawn(async move {
        let authorized = subscribe(&bus, events::TOPIC_PAYMENTS_AUTHORIZED).await;
        let failed = subscribe(&bus, events::TOPIC_PAYMENTS_FAILED).await;
        let (Some(mut authorized), Some(mut failed)) = (authorized, failed) else {
            return;
        };

        let retry_config = RetryConfig::default();

        loop {
            tokio::select! {
                Some(msg) = authorized.next() => {
                    handle(&pool, &bus, &msg, &retry_config, handle_authorized).await;
                }
                Some(msg) = failed.next() => {
                    handle(&pool, &bus, &msg, &retry_config, handle_failed).await;
                }
                else => break,
            }
        }

        tracing::warn!(consumer = CONSUMER_NAME, "provider consumer stopped");
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
    let span = tracing::info_span!("provider_consumer_handle", subject = %msg.subject);
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

async fn handle_authorized(pool: PgPool, msg: BusMessage) -> Result<(), String> {
    let envelope: EventEnvelope<events::PaymentAuthorized> =
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

    attempt_repo::record(&mut tx, payment.payment_id, "AUTHORIZED")
        .await
        .map_err(|e| e.to_string())?;

    let authorized_outcome = payment_repo::try_transition(
        &mut tx,
        payment.payment_id,
        payment.state_version,
        payment.status,
        PaymentStatus::Authorized,
        "provider authorized",
        Some(envelope.event_id),
    )
    .await
    .map_err(|e| e.to_string())?;

    if let TransitionOutcome::Applied(payment) = authorized_outcome {
        let captured_outcome = payment_repo::try_transition(
            &mut tx,
            payment.payment_id,
            payment.state_version,
            PaymentStatus::Authorized,
            PaymentStatus::Captured,
            "auto-captured on authorization",
            None,
        )
        .await
        .map_err(|e| e.to_string())?;

        if let TransitionOutcome::Applied(payment) = captured_outcome {
            let captured = events::PaymentCaptured {
                payment_id: payment.payment_id,
                amount_cents: payment.amount_cents,
                currency: payment.currency.clone(),
            };
            let out_envelope = events::envelope(
                payment.payment_id,
                events::TOPIC_PAYMENTS_CAPTURED,
                &payment.correlation_id,
                captured,
            );
            outbox::enqueue(
                &mut tx,
                out_envelope.event_id,
                &payment.payment_id.to_string(),
                events::TOPIC_PAYMENTS_CAPTURED,
                &out_envelope,
            )
            .await
            .map_err(|e| e.to_string())?;
        }
    }

    tx.commit().await.map_err(|e| e.to_string())?;
    Ok(())
}

async fn handle_failed(pool: PgPool, msg: BusMessage) -> Result<(), String> {
    let envelope: EventEnvelope<events::PaymentFailed> =
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

    let payload = envelope.payload;
    let payment = payment_repo::get_by_id(&mut tx, payload.payment_id)
        .await
        .map_err(|e| e.to_string())?
        .ok_or_else(|| format!("unknown payment {}", payload.payment_id))?;

    if payment.status.is_terminal() {
        tx.commit().await.map_err(|e| e.to_string())?;
        return Ok(());
    }

    attempt_repo::record(&mut tx, payment.payment_id, &payload.classification)
        .await
        .map_err(|e| e.to_string())?;

    payment_repo::try_transition(
        &mut tx,
        payment.payment_id,
        payment.state_version,
        payment.status,
        PaymentStatus::Failed,
        &payload.reason,
        Some(envelope.event_id),
    )
    .await
    .map_err(|e| e.to_string())?;

    tx.commit().await.map_err(|e| e.to_string())?;
    Ok(())
}
