//! Subscribes to `risk.approved` / `risk.denied` and advances the payment
//! accordingly. Inbox-guarded and CAS-guarded: a redelivered risk verdict
//! for a payment that has already moved on is dropped as a stale duplicate,
//! never re-applied.

use crate::events;
use crate::repo::payment_repo::{self, TransitionOutcome};
use crate::state_machine::PaymentStatus;
use event_bus::consumer_retry::{retry_with_backoff, RetryConfig};
use event_bus::{BusMessage, EventBus, EventEnvelope};
use futures::StreamExt;
use inbox::Claim;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::Instrument;

const CONSUMER_NAME: &str = "orchestrator.risk_consumer";

pub async fn start(bus: Arc<dyn EventBus>, pool: PgPool) {
    tokio::spawn(async move {
        let approved = subscribe(&bus, events::TOPIC_RISK_APPROVED).await;
        let denied = subscribe(&bus, events::TOPIC_RISK_DENIED).await;
        let (Some(mut approved), Some(mut denied)) = (approved, denied) else {
            return;
        };

        let retry_config = RetryConfig::default();

        loop {
            tokio::select! {
                Some(msg) = approved.next() => {
                    handle(&pool, &bus, &msg, &retry_config, handle_approved).await;
                }
                Some(msg) = denied.next() => {
                    handle(&pool, &bus, &msg, &retry_config, handle_denied).await;
                }
                else => break,
            }
        }

        tracing::warn!(consumer = CONSUMER_NAME, "risk consumer stopped");
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
    let span = tracing::info_span!("risk_consumer_handle", subject = %msg.subject);
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

async fn handle_approved(pool: PgPool, msg: BusMessage) -> Result<(), String> {
    let envelope: EventEnvelope<events::RiskApproved> =
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

    let outcome = payment_repo::try_transition(
        &mut tx,
        payment.payment_id,
        payment.state_version,
        payment.status,
        PaymentStatus::Approved,
        "risk approved",
        Some(envelope.event_id),
    )
    .await
    .map_err(|e| e.to_string())?;

    if let TransitionOutcome::Applied(payment) = outcome {
        let request = events::ProviderAuthorizeRequested {
            payment_id: payment.payment_id,
            customer_id: payment.customer_id.clone(),
            amount_cents: payment.amount_cents,
            currency: payment.currency.clone(),
        };
        let out_envelope = events::envelope(
            payment.payment_id,
            events::TOPIC_PROVIDER_AUTHORIZE_REQUESTED,
            &payment.correlation_id,
            request,
        );
        outbox::enqueue(
            &mut tx,
            out_envelope.event_id,
            &payment.payment_id.to_string(),
            events::TOPIC_PROVIDER_AUTHORIZE_REQUESTED,
            &out_envelope,
        )
        .await
        .map_err(|e| e.to_string())?;
    }

    tx.commit().await.map_err(|e| e.to_string())?;
    Ok(())
}

async fn handle_denied(pool: PgPool, msg: BusMessage) -> Result<(), String> {
    let envelope: EventEnvelope<events::RiskDenied> =
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

    let target = if payload.classification == "REVIEW" {
        PaymentStatus::RiskReview
    } else {
        PaymentStatus::Failed
    };

    let outcome = payment_repo::try_transition(
        &mut tx,
        payment.payment_id,
        payment.state_version,
        payment.status,
        target,
        &payload.reason,
        Some(envelope.event_id),
    )
    .await
    .map_err(|e| e.to_string())?;

    if target == PaymentStatus::Failed {
        if let TransitionOutcome::Applied(payment) = outcome {
            let failed = events::PaymentFailed {
                payment_id: payment.payment_id,
                customer_id: payment.customer_id.clone(),
                classification: "RISK_DENIED".to_string(),
                reason: payload.reason.clone(),
            };
            let out_envelope = events::envelope(
                payment.payment_id,
                events::TOPIC_PAYMENTS_FAILED,
                &payment.correlation_id,
                failed,
            );
            outbox::enqueue(
                &mut tx,
                out_envelope.event_id,
                &payment.payment_id.to_string(),
                events::TOPIC_PAYMENTS_FAILED,
                &out_envelope,
            )
            .await
            .map_err(|e| e.to_string())?;
        }
    }

    tx.commit().await.map_err(|e| e.to_string())?;
    Ok(())
}
