use std::env;

/// Application configuration parsed from environment variables.
///
/// `decline_modulus` / `timeout_modulus` drive the deterministic outcome
/// simulator in `outcome.rs`: an amount divisible by `decline_modulus` is
/// classified DECLINE, one divisible by `timeout_modulus` is classified
/// TIMEOUT (retried per `backoff_schedule_ms`), everything else is SUCCESS.
/// There is no real card network behind this adapter, so the thresholds
/// just need to be stable and documented, not realistic.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bus_type: String,
    pub nats_url: String,
    pub host: String,
    pub port: u16,
    pub decline_modulus: i64,
    pub timeout_modulus: i64,
    pub backoff_schedule_ms: Vec<u64>,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let database_url = env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set".to_string())?;
        let bus_type = env::var("BUS_TYPE").unwrap_or_else(|_| "inmemory".to_string());
        let nats_url = env::var("NATS_URL").unwrap_or_else(|_| "nats://localhost:4222".to_string());
        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());

        let port: u16 = env::var("PORT")
            .unwrap_or_else(|_| "8103".to_string())
            .parse()
            .map_err(|_| "PORT must be a valid u16".to_string())?;

        let decline_modulus: i64 = env::var("PROVIDER_DECLINE_MODULUS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(97);

        let timeout_modulus: i64 = env::var("PROVIDER_TIMEOUT_MODULUS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(53);

        let backoff_schedule_ms = vec![1_000, 2_000, 4_000];

        Ok(Config {
            database_url,
            bus_type,
            nats_url,
            host,
            port,
            decline_modulus,
            timeout_modulus,
            backoff_schedule_ms,
        })
    }
}
