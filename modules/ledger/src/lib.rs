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

use sqlx::PgPool;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
}
