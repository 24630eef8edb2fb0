//! Double-entry posting and reconciliation queries. `ledger_entries` is
//! append-only (enforced by a trigger in the migration); this module never
//! issues an UPDATE or DELETE against it.

use crate::error::LedgerError;
use crate::models::{Direction, LedgerEntry, ReconciliationResult};
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

/// Insert one DEBIT and one CREDIT row for `transaction_id`, in that order,
/// within the caller's transaction.
pub async fn post_entry(
    tx: &mut Transaction<'_, Postgres>,
    transaction_id: Uuid,
    debit_account_ref: &str,
    credit_account_ref: &str,
    amount_cents: i64,
    currency: &str,
    event_id: Uuid,
) -> Result<(), LedgerError> {
    insert_row(
        tx,
        transaction_id,
        debit_account_ref,
        Direction::Debit,
        amount_cents,
        currency,
        event_id,
    )
    .await?;

    insert_row(
        tx,
        transaction_id,
        credit_account_ref,
        Direction::Credit,
        amount_cents,
        currency,
        event_id,
    )
    .await?;

    Ok(())
}

async fn insert_row(
    tx: &mut Transaction<'_, Postgres>,
    transaction_id: Uuid,
    account_ref: &str,
    direction: Direction,
    amount_cents: i64,
    currency: &str,
    event_id: Uuid,
) -> Result<(), LedgerError> {
    sqlx::query(
        r#"
        INSERT INTO ledger_entries (transaction_id, account_ref, direction, amount_cents, currency, event_id, recorded_at)
        VALUES ($1, $2, $3, $4, $5, $6, now())
        "#,
    )
    .bind(transaction_id)
    .bind(account_ref)
    .bind(direction.as_str())
    .bind(amount_cents)
    .bind(currency)
    .bind(event_id)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

pub async fn list_for_transaction(
    tx: &mut Transaction<'_, Postgres>,
    transaction_id: Uuid,
) -> Result<Vec<LedgerEntry>, LedgerError> {
    let rows = sqlx::query_as::<_, LedgerEntry>(
        "SELECT * FROM ledger_entries WHERE transaction_id = $1 ORDER BY id ASC",
    )
    .bind(transaction_id)
    .fetch_all(&mut **tx)
    .await?;

    Ok(rows)
}

pub async fn reconcile_transaction(
    tx: &mut Transaction<'_, Postgres>,
    transaction_id: Uuid,
) -> Result<Option<ReconciliationResult>, LedgerError> {
    let entries = list_for_transaction(tx, transaction_id).await?;
    if entries.is_empty() {
        return Ok(None);
    }
    Ok(Some(summarize(transaction_id, &entries)))
}

/// Sweep every distinct transaction and return one summary per group.
/// Never drops an imbalanced group silently — every transaction with any
/// entries is represented in the result.
pub async fn reconcile_all(tx: &mut Transaction<'_, Postgres>) -> Result<Vec<ReconciliationResult>, LedgerError> {
    let transaction_ids: Vec<Uuid> = sqlx::query_scalar(
        "SELECT DISTINCT transaction_id FROM ledger_entries ORDER BY transaction_id",
    )
    .fetch_all(&mut **tx)
    .await?;

    let mut results = Vec::with_capacity(transaction_ids.len());
    for transaction_id in transaction_ids {
        let entries = list_for_transaction(tx, transaction_id).await?;
        results.push(summarize(transaction_id, &entries));
    }

    Ok(results)
}

fn summarize(transaction_id: Uuid, entries: &[LedgerEntry]) -> ReconciliationResult {
    let total_debits_cents: i64 = entries
        .iter()
        .filter(|e| e.direction == Direction::Debit.as_str())
        .map(|e| e.amount_cents)
        .sum();
    let total_credits_cents: i64 = entries
        .iter()
        .filter(|e| e.direction == Direction::Credit.as_str())
        .map(|e| e.amount_cents)
        .sum();

    ReconciliationResult {
        transaction_id,
        total_debits_cents,
        total_credits_cents,
        balanced: total_debits_cents == total_credits_cents,
    }
}
