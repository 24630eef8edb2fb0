//! Subscribes to `payments.requested` and produces exactly one of
//! `risk.approved` / `risk.denied{DENY}` / `risk.denied{REVIEW}` per §4.5.
//! Inbox-guarded so a redelivered request never produces two review rows
//! or two outbox events.

use crate::config::Config;
use crate::decision::{self, Decision, DecisionInput};
use crate::events;
use crate::repo::review_repo;
use crate::velocity::VelocityCounters;
use event_bus::consumer_retry::{retry_with_backoff, RetryConfig};
use event_bus::{BusMessage, EventBus, EventEnvelope};
use futures::StreamExt;
use inbox::Claim;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::Instrument;

const CONSUMER_NAME: &str = "risk-engine.request_consumer";

pub async fn start(bus: Arc<dyn EventBus>, pool: PgPool, counters: VelocityCounters, config: Arc<Config>) {
    tokio::spawn(async move {
        let mut stream = match bus.subscribe(events::TOPIC_PAYMENTS_REQUESTED).await {
            Ok(s) => s,
            Err(e) => {
                tracing::error!(subject = events::TOPIC_PAYMENTS_REQUESTED, error = %e, "failed to subscribe");
                return;
            }
        };

        let retry_config = RetryConfig::default();

        while let Some(msg) = stream.next().await {
            let span = tracing::info_span!("request_consumer_handle", subject = %msg.subject);
            let pool = pool.clone();
            let bus = bus.clone();
            let counters = counters.clone();
            let config = config.clone();
            async move {
                let msg_clone = msg.clone();
                let result = retry_with_backoff(
                    || handle_requested(pool.clone(), msg_clone.clone(), counters.clone(), config.clone()),
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

        tracing::warn!(consumer = CONSUMER_NAME, "request consumer stopped");
    });
}

async fn handle_requested(
    pool: PgPool,
    msg: BusMessage,
    counters: VelocityCounters,
    config: Arc<Config>,
) -> Result<(), String> {
    let envelope: EventEnvelope<events::PaymentRequested> =
        serde_json::from_slice(&msg.payload).map_err(|e| format!("bad envelope: {e}"))?;

    let mut tx = pool.begin().await.map_err(|e| e.to_string())?;

    if inbox::claim(&mut tx, envelope.event_id, "risk-engine")
        .await
        .map_err(|e| e.to_string())?
        == Claim::Duplicate
    {
        tx.rollback().await.map_err(|e| e.to_string())?;
        return Ok(());
    }

    let payload = envelope.payload;
    let (velocity_1m, velocity_1h) = counters.record_request(&payload.customer_id).await;
    let failure_count = counters.failure_count(&payload.customer_id).await;

    let input = DecisionInput {
        amount_cents: payload.amount_cents,
        velocity_1m,
        velocity_1h,
        failure_count,
    };
    let decision = decision::evaluate(&input, &config);

    let correlation_id = envelope
        .correlation_id
        .clone()
        .unwrap_or_else(|| payload.payment_id.to_string());

    match decision {
        Decision::Approve => {
            let approved = events::RiskApproved {
                payment_id: payload.payment_id,
            };
            let out_envelope = events::envelope(
                payload.payment_id,
                events::TOPIC_RISK_APPROVED,
                &correlation_id,
                approved,
            );
            outbox::enqueue(
                &mut tx,
                out_envelope.event_id,
                &payload.payment_id.to_string(),
                events::TOPIC_RISK_APPROVED,
                &out_envelope,
            )
            .await
            .map_err(|e| e.to_string())?;
        }
        Decision::Deny => {
            let reason = if failure_count >= config.failure_rate_limit {
                "customer failure-rate heuristic exceeded threshold".to_string()
            } else {
                "customer velocity exceeded threshold".to_string()
            };
            let denied = events::RiskDenied {
                payment_id: payload.payment_id,
                classification: "DENY".to_string(),
                reason,
            };
            let out_envelope = events::envelope(
                payload.payment_id,
                events::TOPIC_RISK_DENIED,
                &correlation_id,
                denied,
            );
            outbox::enqueue(
                &mut tx,
                out_envelope.event_id,
                &payload.payment_id.to_string(),
                events::TOPIC_RISK_DENIED,
                &out_envelope,
            )
            .await
            .map_err(|e| e.to_string())?;
        }
        Decision::Review => {
            review_repo::insert(&mut tx, payload.payment_id, &payload.customer_id, payload.amount_cents)
                .await
                .map_err(|e| e.to_string())?;

            let denied = events::RiskDenied {
                payment_id: payload.payment_id,
                classification: "REVIEW".to_string(),
                reason: "amount above manual review threshold".to_string(),
            };
            let out_envelope = events::envelope(
                payload.payment_id,
                events::TOPIC_RISK_DENIED,
                &correlation_id,
                denied,
            );
            outbox::enqueue(
                &mut tx,
                out_envelope.event_id,
                &payload.payment_id.to_string(),
                events::TOPIC_RISK_DENIED,
                &out_envelope,
            )
            .await
            .map_err(|e| e.to_string())?;
        }
    }

    tx.commit().await.map_err(|e| e.to_string())?;
    Ok(())
}
