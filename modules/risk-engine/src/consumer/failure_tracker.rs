//! Subscribes to `payments.failed` purely to feed the failure-rate
//! heuristic's velocity counter. No database write and no inbox guard: the
//! counter is already approximate under concurrent increments per the
//! spec's resource-policy section, so an occasional double count from a
//! redelivered event is within the counter's documented tolerance.

use crate::events;
use crate::velocity::VelocityCounters;
use event_bus::{EventBus, EventEnvelope};
use futures::StreamExt;
use std::sync::Arc;

pub async fn start(bus: Arc<dyn EventBus>, counters: VelocityCounters) {
    tokio::spawn(async move {
        let mut stream = match bus.subscribe(events::TOPIC_PAYMENTS_FAILED).await {
            Ok(s) => s,
            Err(e) => {
                tracing::error!(subject = events::TOPIC_PAYMENTS_FAILED, error = %e, "failed to subscribe");
                return;
            }
        };

        while let Some(msg) = stream.next().await {
            let envelope: Result<EventEnvelope<events::PaymentFailed>, _> =
                serde_json::from_slice(&msg.payload);

            let Ok(envelope) = envelope else {
                tracing::warn!(subject = %msg.subject, "could not parse payments.failed envelope, skipping");
                continue;
            };

            counters.record_failure(&envelope.payload.customer_id).await;
        }

        tracing::warn!("risk-engine failure tracker stopped");
    });
}
