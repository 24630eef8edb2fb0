//! # Transactional Outbox Runtime
//!
//! Generic claim/publish/reclaim engine shared by every service in the saga.
//! Each service owns a private `outbox_events` table in its own database;
//! this crate only knows the row shape, never the business payload.
//!
//! ## Write path
//!
//! [`enqueue`] is called inside the *same* database transaction as the
//! business mutation it describes. The row is born `PENDING`.
//!
//! ## Publish path
//!
//! [`run_publisher`] is spawned once per service process. It repeatedly:
//! 1. Claims a batch of `PENDING` (or stale `PROCESSING`) rows using
//!    `FOR UPDATE SKIP LOCKED`, so multiple worker processes never claim the
//!    same row.
//! 2. Publishes each claimed row to the event bus.
//! 3. Marks the row `PUBLISHED` on success, or releases it back to `PENDING`
//!    (bumping `attempts`) on failure — crossing `max_attempts` marks it
//!    `FAILED` instead, which is surfaced via the
//!    `outbox_oldest_pending_age_seconds` gauge, never by dropping the row.
//!
//! A worker that crashes mid-publish leaves its rows `PROCESSING`. Once
//! `reclaim_timeout` elapses another worker reclaims them; double
//! publication is possible here and is expected — the downstream inbox
//! suppresses the duplicate.

mod metrics;

use chrono::{DateTime, Utc};
use event_bus::EventBus;
use serde::Serialize;
use sqlx::{PgPool, Postgres, Transaction};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

pub use metrics::oldest_pending_age_seconds;

/// Runtime configuration for the publisher loop.
#[derive(Debug, Clone)]
pub struct OutboxConfig {
    /// Rows claimed per tick.
    pub batch_size: i64,
    /// How long a `PROCESSING` row waits before another worker may reclaim it.
    pub reclaim_timeout: Duration,
    /// Publish attempts (across reclaims) before a row is marked `FAILED`.
    pub max_attempts: i32,
    /// Delay between claim ticks when there is nothing to do.
    pub poll_interval: Duration,
}

impl Default for OutboxConfig {
    fn default() -> Self {
        Self {
            batch_size: 100,
            reclaim_timeout: Duration::from_secs(60),
            max_attempts: 10,
            poll_interval: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum OutboxError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("failed to serialize outbox payload: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct OutboxRow {
    id: i64,
    event_id: Uuid,
    aggregate_id: String,
    topic: String,
    payload: serde_json::Value,
    claim_token: Option<Uuid>,
    created_at: DateTime<Utc>,
    attempts: i32,
}

/// Write an outbox row in the caller's open transaction.
///
/// Must be called in the same transaction as the business mutation the
/// event describes — that's what makes the write atomic.
pub async fn enqueue<T: Serialize>(
    tx: &mut Transaction<'_, Postgres>,
    event_id: Uuid,
    aggregate_id: &str,
    topic: &str,
    payload: &T,
) -> Result<(), OutboxError> {
    let payload = serde_json::to_value(payload)?;

    sqlx::query(
        r#"
        INSERT INTO outbox_events (event_id, aggregate_id, topic, payload, status, attempts, created_at)
        VALUES ($1, $2, $3, $4, 'PENDING', 0, now())
        "#,
    )
    .bind(event_id)
    .bind(aggregate_id)
    .bind(topic)
    .bind(payload)
    .execute(&mut **tx)
    .await?;

    tracing::debug!(event_id = %event_id, aggregate_id, topic, "outbox event enqueued");
    Ok(())
}

/// Claim up to `config.batch_size` publishable rows: `PENDING`, or
/// `PROCESSING` rows whose claim has gone stale past `reclaim_timeout`.
async fn claim_batch(
    pool: &PgPool,
    config: &OutboxConfig,
) -> Result<Vec<OutboxRow>, sqlx::Error> {
    let claim_token = Uuid::new_v4();
    let reclaim_secs = config.reclaim_timeout.as_secs_f64();

    sqlx::query_as::<_, OutboxRow>(
        r#"
        WITH claimable AS (
            SELECT id
            FROM outbox_events
            WHERE status = 'PENDING'
               OR (status = 'PROCESSING' AND claimed_at < now() - make_interval(secs => $1))
            ORDER BY created_at ASC
            LIMIT $2
            FOR UPDATE SKIP LOCKED
        )
        UPDATE outbox_events o
        SET status = 'PROCESSING', claim_token = $3, claimed_at = now()
        FROM claimable
        WHERE o.id = claimable.id
        RETURNING o.id, o.event_id, o.aggregate_id, o.topic, o.payload, o.claim_token, o.created_at, o.attempts
        "#,
    )
    .bind(reclaim_secs)
    .bind(config.batch_size)
    .bind(claim_token)
    .fetch_all(pool)
    .await
}

async fn mark_published(pool: &PgPool, row: &OutboxRow) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE outbox_events SET status = 'PUBLISHED' WHERE id = $1 AND claim_token = $2",
    )
    .bind(row.id)
    .bind(row.claim_token)
    .execute(pool)
    .await?;
    Ok(())
}

async fn release_after_failure(
    pool: &PgPool,
    row: &OutboxRow,
    max_attempts: i32,
) -> Result<(), sqlx::Error> {
    let attempts = row.attempts + 1;
    if attempts >= max_attempts {
        sqlx::query(
            "UPDATE outbox_events SET status = 'FAILED', attempts = $3 WHERE id = $1 AND claim_token = $2",
        )
        .bind(row.id)
        .bind(row.claim_token)
        .bind(attempts)
        .execute(pool)
        .await?;
        metrics::record_failed();
    } else {
        sqlx::query(
            "UPDATE outbox_events SET status = 'PENDING', claim_token = NULL, attempts = $3 WHERE id = $1 AND claim_token = $2",
        )
        .bind(row.id)
        .bind(row.claim_token)
        .bind(attempts)
        .execute(pool)
        .await?;
    }
    Ok(())
}

/// Run one claim-publish cycle. Returns the number of rows claimed.
///
/// `row.payload` is already the complete, producer-built wire envelope
/// (`event_bus::EventEnvelope<T>`, stored as `serde_json::Value` by
/// [`enqueue`]) — this loop republishes those bytes verbatim rather than
/// wrapping them in a second envelope, since every consumer deserializes the
/// bus message directly as `EventEnvelope<T>`.
async fn run_once(
    pool: &PgPool,
    bus: &Arc<dyn EventBus>,
    config: &OutboxConfig,
) -> Result<usize, sqlx::Error> {
    let rows = claim_batch(pool, config).await?;
    let claimed = rows.len();

    for row in rows {
        let bytes = match serde_json::to_vec(&row.payload) {
            Ok(b) => b,
            Err(e) => {
                tracing::error!(event_id = %row.event_id, error = %e, "failed to serialize outbox envelope, will retry");
                release_after_failure(pool, &row, config.max_attempts).await?;
                continue;
            }
        };

        match bus.publish(&row.topic, bytes).await {
            Ok(()) => {
                mark_published(pool, &row).await?;
                tracing::info!(event_id = %row.event_id, topic = %row.topic, "outbox event published");
            }
            Err(e) => {
                tracing::warn!(event_id = %row.event_id, topic = %row.topic, error = %e, "outbox publish failed, releasing for retry");
                release_after_failure(pool, &row, config.max_attempts).await?;
            }
        }
    }

    Ok(claimed)
}

/// Background publisher loop. Intended to be `tokio::spawn`ed once per
/// process; never returns on its own. Database errors are logged and the
/// loop keeps ticking rather than tearing down the process — an unpublished
/// row is never silently dropped.
pub async fn run_publisher(pool: PgPool, bus: Arc<dyn EventBus>, config: OutboxConfig) {
    let mut ticker = tokio::time::interval(config.poll_interval);
    loop {
        ticker.tick().await;

        if let Ok(Some(age)) = metrics::oldest_pending_age_seconds(&pool).await {
            metrics::set_oldest_pending_age(age);
        }

        match run_once(&pool, &bus, &config).await {
            Ok(0) => {}
            Ok(n) => tracing::debug!(claimed = n, "outbox publisher cycle completed"),
            Err(e) => tracing::error!(error = %e, "outbox publisher cycle failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_spec_reclaim_window() {
        let config = OutboxConfig::default();
        assert_eq!(config.reclaim_timeout, Duration::from_secs(60));
        assert!(config.batch_size > 0);
    }
}
