pub mod cache;
pub mod compensation;
pub mod config;
pub mod consumer;
pub mod db;
pub mod dlq;
pub mod error;
pub mod events;
pub mod health;
pub mod http;
pub mod models;
pub mod repo;
pub mod state_machine;

use cache::IdempotencyCache;
use sqlx::PgPool;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub idempotency_cache: IdempotencyCache,
}
