//! Per-customer velocity and failure counters.
//!
//! The spec describes these as "a shared short-lived counter store" — no
//! external cache service is in scope here, so this is an in-process
//! `moka` TTL cache, the same idiom `orchestrator_rs::cache::IdempotencyCache`
//! uses for its fast-path lookup. Counters are approximate under concurrent
//! increments, which the spec explicitly tolerates (§5: "concurrent
//! increments are expected and tolerated").

use moka::future::Cache;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct VelocityCounters {
    one_minute: Cache<String, Arc<AtomicU32>>,
    one_hour: Cache<String, Arc<AtomicU32>>,
    failures: Cache<String, Arc<AtomicU32>>,
}

impl VelocityCounters {
    pub fn new() -> Self {
        Self {
            one_minute: Cache::builder()
                .time_to_live(Duration::from_secs(60))
                .max_capacity(100_000)
                .build(),
            one_hour: Cache::builder()
                .time_to_live(Duration::from_secs(3600))
                .max_capacity(100_000)
                .build(),
            failures: Cache::builder()
                .time_to_live(Duration::from_secs(3600))
                .max_capacity(100_000)
                .build(),
        }
    }

    /// Record one payment request for `customer_id` and return the
    /// trailing 1-minute and 1-hour counts, including this one.
    pub async fn record_request(&self, customer_id: &str) -> (u32, u32) {
        let one_min = self.bump(&self.one_minute, customer_id).await;
        let one_hour = self.bump(&self.one_hour, customer_id).await;
        (one_min, one_hour)
    }

    /// Record an observed failure for `customer_id` and return the
    /// trailing count including this one.
    pub async fn record_failure(&self, customer_id: &str) -> u32 {
        self.bump(&self.failures, customer_id).await
    }

    /// Current failure count for `customer_id` without recording a new one.
    pub async fn failure_count(&self, customer_id: &str) -> u32 {
        match self.failures.get(customer_id).await {
            Some(counter) => counter.load(Ordering::Relaxed),
            None => 0,
        }
    }

    async fn bump(&self, cache: &Cache<String, Arc<AtomicU32>>, key: &str) -> u32 {
        let counter = cache
            .get_with(key.to_string(), async { Arc::new(AtomicU32::new(0)) })
            .await;
        counter.fetch_add(1, Ordering::Relaxed) + 1
    }
}

impl Default for VelocityCounters {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn counts_accumulate_per_customer() {
        let counters = VelocityCounters::new();
        let (m1, h1) = counters.record_request("cust-1").await;
        assert_eq!((m1, h1), (1, 1));
        let (m2, h2) = counters.record_request("cust-1").await;
        assert_eq!((m2, h2), (2, 2));
    }

    #[tokio::test]
    async fn distinct_customers_do_not_share_counters() {
        let counters = VelocityCounters::new();
        counters.record_request("cust-1").await;
        let (m, h) = counters.record_request("cust-2").await;
        assert_eq!((m, h), (1, 1));
    }

    #[tokio::test]
    async fn failure_count_is_independent_of_request_count() {
        let counters = VelocityCounters::new();
        counters.record_request("cust-1").await;
        counters.record_request("cust-1").await;
        assert_eq!(counters.failure_count("cust-1").await, 0);
        let f = counters.record_failure("cust-1").await;
        assert_eq!(f, 1);
        assert_eq!(counters.failure_count("cust-1").await, 1);
    }
}
