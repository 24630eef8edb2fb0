//! # Inbox Guard
//!
//! Gives exactly-once *effects* on top of an at-least-once bus. Every
//! consumer, before doing business work for an incoming event, tries to
//! insert `(event_id, consumer_service)` into its local `inbox_events`
//! table. If the insert collides with the unique constraint, the event has
//! already been handled — the caller short-circuits and commits its
//! transport offset without re-running the handler. If the insert succeeds,
//! the handler runs and its side effects are committed in the same
//! transaction as the inbox row, so a crash between them can never leave
//! the two out of sync.

use sqlx::{Postgres, Transaction};
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum InboxError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Result of attempting to claim an event for a consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Claim {
    /// First time this consumer has seen this event_id — proceed with business work.
    Fresh,
    /// This consumer already processed this event_id — drop it, no side effects.
    Duplicate,
}

/// Attempt to claim `(event_id, consumer_service)` in the caller's open
/// transaction. Must be called before any business side effects so that a
/// `Duplicate` claim can short-circuit before anything mutates.
pub async fn claim(
    tx: &mut Transaction<'_, Postgres>,
    event_id: Uuid,
    consumer_service: &str,
) -> Result<Claim, InboxError> {
    let result = sqlx::query(
        r#"
        INSERT INTO inbox_events (event_id, consumer_service, processed_at)
        VALUES ($1, $2, now())
        ON CONFLICT (event_id, consumer_service) DO NOTHING
        "#,
    )
    .bind(event_id)
    .bind(consumer_service)
    .execute(&mut **tx)
    .await?;

    if result.rows_affected() == 1 {
        Ok(Claim::Fresh)
    } else {
        tracing::info!(event_id = %event_id, consumer_service, "duplicate event suppressed by inbox");
        Ok(Claim::Duplicate)
    }
}

/// Run `handler` exactly once per `(event_id, consumer_service)` inside a
/// single transaction: claims the inbox row, runs the handler only on a
/// fresh claim, and commits both together. Returns `true` if the handler ran.
pub async fn process_once<F, Fut, E>(
    tx: &mut Transaction<'_, Postgres>,
    event_id: Uuid,
    consumer_service: &str,
    handler: F,
) -> Result<bool, E>
where
    F: FnOnce(&mut Transaction<'_, Postgres>) -> Fut,
    Fut: std::future::Future<Output = Result<(), E>>,
    E: From<InboxError>,
{
    match claim(tx, event_id, consumer_service).await.map_err(E::from)? {
        Claim::Duplicate => Ok(false),
        Claim::Fresh => {
            handler(tx).await?;
            Ok(true)
        }
    }
}

#[cfg(test)]
mod tests {
    // Exercised against a live database by each consuming service's own
    // integration tests (see modules/*/tests); this crate has no pool of
    // its own to spin up here.
}
