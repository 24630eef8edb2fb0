//! Background sweep that reverses payments stuck in `AUTHORIZED`.
//!
//! Ordinarily `AUTHORIZED` is transient — `provider_consumer` advances it to
//! `CAPTURED` in the same handler invocation that applies the authorization.
//! A row can only remain `AUTHORIZED` if the process crashed between the two
//! CAS writes, in which case this sweep's job is to compensate rather than
//! leave the payment stranded.

use crate::events;
use crate::repo::payment_repo;
use crate::state_machine::PaymentStatus;
use sqlx::PgPool;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct CompensationConfig {
    pub stuck_after: Duration,
    pub sweep_interval: Duration,
}

impl Default for CompensationConfig {
    fn default() -> Self {
        Self {
            stuck_after: Duration::from_secs(15 * 60),
            sweep_interval: Duration::from_secs(60),
        }
    }
}

pub async fn run_sweep(pool: PgPool, config: CompensationConfig) {
    let mut ticker = tokio::time::interval(config.sweep_interval);
    loop {
        ticker.tick().await;
        if let Err(e) = sweep_once(&pool, &config).await {
            tracing::error!(error = %e, "compensation sweep failed");
        }
    }
}

async fn sweep_once(pool: &PgPool, config: &CompensationConfig) -> Result<(), sqlx::Error> {
    let stuck_secs = config.stuck_after.as_secs_f64();
    let payment_ids: Vec<(uuid::Uuid,)> = sqlx::query_as(
        r#"
        SELECT payment_id FROM payments
        WHERE status = 'AUTHORIZED' AND updated_at < now() - make_interval(secs => $1)
        "#,
    )
    .bind(stuck_secs)
    .fetch_all(pool)
    .await?;

    for (payment_id,) in payment_ids {
        if let Err(e) = reverse_one(pool, payment_id).await {
            tracing::error!(payment_id = %payment_id, error = %e, "failed to reverse stuck authorization");
        }
    }

    Ok(())
}

async fn reverse_one(
    pool: &PgPool,
    payment_id: uuid::Uuid,
) -> Result<(), crate::error::OrchestratorError> {
    let mut tx = pool.begin().await?;

    let payment = payment_repo::get_by_id(&mut tx, payment_id)
        .await?
        .ok_or(crate::error::OrchestratorError::NotFound(payment_id))?;

    if payment.status != PaymentStatus::Authorized {
        tx.rollback().await?;
        return Ok(());
    }

    let outcome = payment_repo::try_transition(
        &mut tx,
        payment.payment_id,
        payment.state_version,
        PaymentStatus::Authorized,
        PaymentStatus::Reversed,
        "authorization stuck past compensation window",
        None,
    )
    .await?;

    if let payment_repo::TransitionOutcome::Applied(payment) = outcome {
        let reversed = events::PaymentReversed {
            payment_id: payment.payment_id,
            reason: "authorization stuck past compensation window".to_string(),
        };
        let envelope = events::envelope(
            payment.payment_id,
            events::TOPIC_PAYMENTS_REVERSED,
            &payment.correlation_id,
            reversed,
        );
        outbox::enqueue(
            &mut tx,
            envelope.event_id,
            &payment.payment_id.to_string(),
            events::TOPIC_PAYMENTS_REVERSED,
            &envelope,
        )
        .await?;
    }

    tx.commit().await?;
    Ok(())
}
