use std::env;

/// The chart of accounts this ledger posts against. A real deployment would
/// load these from an accounting system; here they're two fixed account
/// references, configurable so tests and other environments can use
/// different account IDs without a code change.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bus_type: String,
    pub nats_url: String,
    pub host: String,
    pub port: u16,
    pub customer_account_ref: String,
    pub merchant_account_ref: String,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let database_url = env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set".to_string())?;
        let bus_type = env::var("BUS_TYPE").unwrap_or_else(|_| "inmemory".to_string());
        let nats_url = env::var("NATS_URL").unwrap_or_else(|_| "nats://localhost:4222".to_string());
        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());

        let port: u16 = env::var("PORT")
            .unwrap_or_else(|_| "8105".to_string())
            .parse()
            .map_err(|_| "PORT must be a valid u16".to_string())?;

        let customer_account_ref =
            env::var("LEDGER_CUSTOMER_ACCOUNT_REF").unwrap_or_else(|_| "customer-receivable".to_string());
        let merchant_account_ref =
            env::var("LEDGER_MERCHANT_ACCOUNT_REF").unwrap_or_else(|_| "merchant-settlement".to_string());

        Ok(Config {
            database_url,
            bus_type,
            nats_url,
            host,
            port,
            customer_account_ref,
            merchant_account_ref,
        })
    }
}
