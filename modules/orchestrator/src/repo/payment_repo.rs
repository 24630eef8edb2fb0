//! CAS-guarded persistence for the payment aggregate.
//!
//! Every transition goes through [`try_transition`], which encodes the rule
//! from the lifecycle graph directly: a failed compare-and-swap is either a
//! stale redelivery (the row has already moved past the requested state — an
//! idempotent no-op) or a genuine invalid transition (surfaced as an error).
//! The two are told apart with [`state_machine::is_forward_descendant`], not
//! by inspecting the triggering event.

use crate::error::OrchestratorError;
use crate::models::{Payment, PaymentRow};
use crate::state_machine::{self, PaymentStatus};
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

/// Outcome of a CAS attempt.
#[derive(Debug)]
pub enum TransitionOutcome {
    /// The row moved from `from` to `to`; the new row is returned.
    Applied(Payment),
    /// The row was already at `to` or further along the graph — the event
    /// describes work that has already happened. No row was mutated.
    StaleDuplicate(Payment),
}

/// Outcome of inserting a newly-requested payment.
#[derive(Debug)]
pub enum InsertOutcome {
    Created(Payment),
    /// `(customer_id, idempotency_key)` already existed — returns the
    /// existing row so the caller can reply without re-running the saga.
    AlreadyExists(Payment),
}

pub async fn insert_new(
    tx: &mut Transaction<'_, Postgres>,
    payment_id: Uuid,
    customer_id: &str,
    amount_cents: i64,
    currency: &str,
    idempotency_key: &str,
    correlation_id: &str,
) -> Result<InsertOutcome, OrchestratorError> {
    let row = sqlx::query_as::<_, PaymentRow>(
        r#"
        INSERT INTO payments
            (payment_id, customer_id, amount_cents, currency, status, state_version,
             idempotency_key, correlation_id, created_at, updated_at)
        VALUES ($1, $2, $3, $4, 'CREATED', 0, $5, $6, now(), now())
        ON CONFLICT (customer_id, idempotency_key) DO NOTHING
        RETURNING *
        "#,
    )
    .bind(payment_id)
    .bind(customer_id)
    .bind(amount_cents)
    .bind(currency)
    .bind(idempotency_key)
    .bind(correlation_id)
    .fetch_optional(&mut **tx)
    .await?;

    if let Some(row) = row {
        insert_timeline_entry(tx, payment_id, None, PaymentStatus::Created, "payment requested", None).await?;
        return Ok(InsertOutcome::Created(
            row.into_payment().map_err(OrchestratorError::InvalidRequest)?,
        ));
    }

    let existing = get_by_customer_idempotency_key(tx, customer_id, idempotency_key)
        .await?
        .ok_or_else(|| {
            OrchestratorError::InvalidRequest(
                "idempotency key conflict could not be resolved to an existing row".into(),
            )
        })?;

    if existing.amount_cents != amount_cents || existing.currency != currency {
        return Err(OrchestratorError::IdempotencyConflict);
    }

    Ok(InsertOutcome::AlreadyExists(existing))
}

pub async fn get_by_id(
    tx: &mut Transaction<'_, Postgres>,
    payment_id: Uuid,
) -> Result<Option<Payment>, OrchestratorError> {
    let row = sqlx::query_as::<_, PaymentRow>("SELECT * FROM payments WHERE payment_id = $1")
        .bind(payment_id)
        .fetch_optional(&mut **tx)
        .await?;

    row.map(|r| r.into_payment().map_err(OrchestratorError::InvalidRequest))
        .transpose()
}

pub async fn get_by_customer_idempotency_key(
    tx: &mut Transaction<'_, Postgres>,
    customer_id: &str,
    idempotency_key: &str,
) -> Result<Option<Payment>, OrchestratorError> {
    let row = sqlx::query_as::<_, PaymentRow>(
        "SELECT * FROM payments WHERE customer_id = $1 AND idempotency_key = $2",
    )
    .bind(customer_id)
    .bind(idempotency_key)
    .fetch_optional(&mut **tx)
    .await?;

    row.map(|r| r.into_payment().map_err(OrchestratorError::InvalidRequest))
        .transpose()
}

/// Attempt `from -> to` on `payment_id`, guarded by `expected_version`.
///
/// Rejects edges the lifecycle graph doesn't allow before touching the
/// database. On a CAS miss, re-reads the row and classifies the miss as a
/// stale duplicate or bubbles up the mismatch as an invalid transition.
pub async fn try_transition(
    tx: &mut Transaction<'_, Postgres>,
    payment_id: Uuid,
    expected_version: i64,
    from: PaymentStatus,
    to: PaymentStatus,
    reason: &str,
    event_id: Option<Uuid>,
) -> Result<TransitionOutcome, OrchestratorError> {
    if !state_machine::is_valid_transition(from, to) {
        return Err(OrchestratorError::InvalidTransition {
            from: from.to_string(),
            to: to.to_string(),
        });
    }

    let updated = sqlx::query_as::<_, PaymentRow>(
        r#"
        UPDATE payments
        SET status = $1, state_version = state_version + 1, updated_at = now()
        WHERE payment_id = $2 AND status = $3 AND state_version = $4
        RETURNING *
        "#,
    )
    .bind(to.as_str())
    .bind(payment_id)
    .bind(from.as_str())
    .bind(expected_version)
    .fetch_optional(&mut **tx)
    .await?;

    if let Some(row) = updated {
        let payment = row.into_payment().map_err(OrchestratorError::InvalidRequest)?;
        insert_timeline_entry(tx, payment_id, Some(from), to, reason, event_id).await?;
        return Ok(TransitionOutcome::Applied(payment));
    }

    let current = get_by_id(tx, payment_id)
        .await?
        .ok_or(OrchestratorError::NotFound(payment_id))?;

    if current.status == to || state_machine::is_forward_descendant(current.status, to) {
        tracing::info!(
            payment_id = %payment_id,
            current_status = %current.status,
            requested = %to,
            "stale transition request dropped as forward descendant"
        );
        return Ok(TransitionOutcome::StaleDuplicate(current));
    }

    Err(OrchestratorError::InvalidTransition {
        from: current.status.to_string(),
        to: to.to_string(),
    })
}

async fn insert_timeline_entry(
    tx: &mut Transaction<'_, Postgres>,
    payment_id: Uuid,
    from_state: Option<PaymentStatus>,
    to_state: PaymentStatus,
    reason: &str,
    event_id: Option<Uuid>,
) -> Result<(), OrchestratorError> {
    sqlx::query(
        r#"
        INSERT INTO payment_timeline (payment_id, from_state, to_state, reason, event_id, recorded_at)
        VALUES ($1, $2, $3, $4, $5, now())
        "#,
    )
    .bind(payment_id)
    .bind(from_state.map(|s| s.as_str()))
    .bind(to_state.as_str())
    .bind(reason)
    .bind(event_id)
    .execute(&mut **tx)
    .await?;

    Ok(())
}
