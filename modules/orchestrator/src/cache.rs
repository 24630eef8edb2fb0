//! Short-lived idempotency fast-path cache.
//!
//! `POST /payments` hits this before touching the database: a cache hit on
//! `(customer_id, idempotency_key)` lets a retried request short-circuit
//! without a round trip. The database's unique constraint remains the
//! source of truth — a cache miss always falls through to a real insert
//! attempt, so a cold cache (after a restart, or eviction) never produces a
//! duplicate payment.

use moka::future::Cache;
use std::time::Duration;
use uuid::Uuid;

#[derive(Clone)]
pub struct IdempotencyCache {
    inner: Cache<String, Uuid>,
}

impl IdempotencyCache {
    pub fn new(max_capacity: u64, ttl: Duration) -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(max_capacity)
                .time_to_live(ttl)
                .build(),
        }
    }

    fn key(customer_id: &str, idempotency_key: &str) -> String {
        format!("{customer_id}:{idempotency_key}")
    }

    pub async fn get(&self, customer_id: &str, idempotency_key: &str) -> Option<Uuid> {
        self.inner.get(&Self::key(customer_id, idempotency_key)).await
    }

    pub async fn insert(&self, customer_id: &str, idempotency_key: &str, payment_id: Uuid) {
        self.inner
            .insert(Self::key(customer_id, idempotency_key), payment_id)
            .await;
    }
}

impl Default for IdempotencyCache {
    fn default() -> Self {
        Self::new(10_000, Duration::from_secs(300))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn miss_then_hit_after_insert() {
        let cache = IdempotencyCache::default();
        assert!(cache.get("cust-1", "key-1").await.is_none());

        let id = Uuid::new_v4();
        cache.insert("cust-1", "key-1", id).await;
        assert_eq!(cache.get("cust-1", "key-1").await, Some(id));
    }

    #[tokio::test]
    async fn distinct_keys_do_not_collide() {
        let cache = IdempotencyCache::default();
        cache.insert("cust-1", "key-1", Uuid::new_v4()).await;
        assert!(cache.get("cust-1", "key-2").await.is_none());
        assert!(cache.get("cust-2", "key-1").await.is_none());
    }
}
