use async_trait::async_trait;
use health::ReadinessCheck;
use sqlx::PgPool;

pub struct DatabaseCheck {
    pub pool: PgPool,
}

#[async_trait]
impl ReadinessCheck for DatabaseCheck {
    fn name(&self) -> &'static str {
        "database"
    }

    async fn check(&self) -> Result<(), String> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(|e| e.to_string())
    }
}

pub async fn health_simple() -> axum::Json<serde_json::Value> {
    health::health_simple("notification-sink-rs", env!("CARGO_PKG_VERSION"))
}
