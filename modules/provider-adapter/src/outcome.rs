//! Deterministic stand-in for a real card network. There is no external
//! processor to call in this workspace, so each attempt is classified from
//! the requested amount alone, keeping the adapter's behavior reproducible
//! across retries and in tests.

use crate::config::Config;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Decline,
    Timeout,
    Malformed,
}

/// A negative amount is treated as a malformed request — the orchestrator
/// already rejects those at the API boundary, so seeing one here means the
/// envelope itself is broken. `amount_cents == 0` is a legitimate, accepted
/// payment (§3: `amount_cents` is non-negative) and always succeeds here
/// rather than falling into the modulus checks below, where zero is
/// trivially divisible by every modulus.
pub fn classify(amount_cents: i64, config: &Config) -> Outcome {
    if amount_cents < 0 {
        return Outcome::Malformed;
    }
    if amount_cents == 0 {
        return Outcome::Success;
    }
    if amount_cents % config.decline_modulus == 0 {
        return Outcome::Decline;
    }
    if amount_cents % config.timeout_modulus == 0 {
        return Outcome::Timeout;
    }
    Outcome::Success
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config {
            database_url: String::new(),
            bus_type: "inmemory".into(),
            nats_url: String::new(),
            host: "0.0.0.0".into(),
            port: 8103,
            decline_modulus: 97,
            timeout_modulus: 53,
            backoff_schedule_ms: vec![1_000, 2_000, 4_000],
        }
    }

    #[test]
    fn negative_amount_is_malformed() {
        assert_eq!(classify(-500, &config()), Outcome::Malformed);
    }

    #[test]
    fn zero_amount_always_succeeds() {
        assert_eq!(classify(0, &config()), Outcome::Success);
    }

    #[test]
    fn multiple_of_decline_modulus_declines() {
        assert_eq!(classify(97 * 3, &config()), Outcome::Decline);
    }

    #[test]
    fn multiple_of_timeout_modulus_times_out() {
        assert_eq!(classify(53 * 5, &config()), Outcome::Timeout);
    }

    #[test]
    fn decline_takes_priority_over_timeout_when_both_would_match() {
        let cfg = Config {
            decline_modulus: 10,
            timeout_modulus: 5,
            ..config()
        };
        assert_eq!(classify(10, &cfg), Outcome::Decline);
    }

    #[test]
    fn ordinary_amount_succeeds() {
        assert_eq!(classify(1001, &config()), Outcome::Success);
    }
}
