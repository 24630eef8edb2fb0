use std::env;

/// Application configuration parsed from environment variables.
///
/// Velocity windows are fixed at 1 minute / 1 hour per the spec's literal
/// text; only the thresholds on top of those windows are configurable.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bus_type: String,
    pub nats_url: String,
    pub host: String,
    pub port: u16,

    /// amount_cents at or above this enters RISK_REVIEW rather than auto-approve.
    pub review_threshold_cents: i64,
    /// requests for one customer within the trailing minute at or above this are denied.
    pub velocity_1m_limit: u32,
    /// requests for one customer within the trailing hour at or above this are denied.
    pub velocity_1h_limit: u32,
    /// recent failures for one customer at or above this trigger an outright deny.
    pub failure_rate_limit: u32,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let database_url =
            env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set".to_string())?;

        let bus_type = env::var("BUS_TYPE").unwrap_or_else(|_| "inmemory".to_string());

        let nats_url =
            env::var("NATS_URL").unwrap_or_else(|_| "nats://localhost:4222".to_string());

        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());

        let port: u16 = env::var("PORT")
            .unwrap_or_else(|_| "8102".to_string())
            .parse()
            .map_err(|_| "PORT must be a valid u16".to_string())?;

        let review_threshold_cents = env::var("RISK_REVIEW_THRESHOLD_CENTS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(100_000);

        let velocity_1m_limit = env::var("RISK_VELOCITY_1M_LIMIT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(5);

        let velocity_1h_limit = env::var("RISK_VELOCITY_1H_LIMIT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(30);

        let failure_rate_limit = env::var("RISK_FAILURE_RATE_LIMIT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(3);

        Ok(Config {
            database_url,
            bus_type,
            nats_url,
            host,
            port,
            review_threshold_cents,
            velocity_1m_limit,
            velocity_1h_limit,
            failure_rate_limit,
        })
    }
}
