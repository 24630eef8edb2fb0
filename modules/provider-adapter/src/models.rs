use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct ProviderAttempt {
    pub id: i64,
    pub payment_id: Uuid,
    pub attempt_no: i32,
    pub outcome: String,
    pub backoff_ms_waited: i32,
    pub recorded_at: DateTime<Utc>,
}
