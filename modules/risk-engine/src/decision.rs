//! The risk decision table: the testable heart of this service.
//!
//! Evaluated in order per §4.5 of the spec: failure-rate heuristic first
//! (an outright deny regardless of amount), then velocity, then the amount
//! threshold. Pure function over already-collected counters so it can be
//! unit tested without touching the database or the velocity cache.

use crate::config::Config;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Decision {
    Approve,
    Deny,
    Review,
}

pub struct DecisionInput {
    pub amount_cents: i64,
    pub velocity_1m: u32,
    pub velocity_1h: u32,
    pub failure_count: u32,
}

/// Produce exactly one of APPROVE / DENY / REVIEW, per §4.5.
pub fn evaluate(input: &DecisionInput, config: &Config) -> Decision {
    if input.failure_count >= config.failure_rate_limit {
        return Decision::Deny;
    }

    if input.velocity_1m >= config.velocity_1m_limit || input.velocity_1h >= config.velocity_1h_limit {
        return Decision::Deny;
    }

    if input.amount_cents >= config.review_threshold_cents {
        return Decision::Review;
    }

    Decision::Approve
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
            port: 0,
            review_threshold_cents: 100_000,
            velocity_1m_limit: 5,
            velocity_1h_limit: 30,
            failure_rate_limit: 3,
        }
    }

    #[test]
    fn low_amount_low_velocity_approves() {
        let input = DecisionInput {
            amount_cents: 2500,
            velocity_1m: 1,
            velocity_1h: 1,
            failure_count: 0,
        };
        assert_eq!(evaluate(&input, &config()), Decision::Approve);
    }

    #[test]
    fn amount_at_threshold_enters_review() {
        let input = DecisionInput {
            amount_cents: 150_000,
            velocity_1m: 1,
            velocity_1h: 1,
            failure_count: 0,
        };
        assert_eq!(evaluate(&input, &config()), Decision::Review);
    }

    #[test]
    fn amount_just_under_threshold_approves() {
        let input = DecisionInput {
            amount_cents: 99_999,
            velocity_1m: 1,
            velocity_1h: 1,
            failure_count: 0,
        };
        assert_eq!(evaluate(&input, &config()), Decision::Approve);
    }

    #[test]
    fn velocity_burst_denies_even_small_amount() {
        let input = DecisionInput {
            amount_cents: 100,
            velocity_1m: 5,
            velocity_1h: 5,
            failure_count: 0,
        };
        assert_eq!(evaluate(&input, &config()), Decision::Deny);
    }

    #[test]
    fn failure_rate_denies_regardless_of_amount() {
        let input = DecisionInput {
            amount_cents: 100,
            velocity_1m: 1,
            velocity_1h: 1,
            failure_count: 3,
        };
        assert_eq!(evaluate(&input, &config()), Decision::Deny);
    }

    #[test]
    fn failure_rate_takes_priority_over_review_amount() {
        let input = DecisionInput {
            amount_cents: 500_000,
            velocity_1m: 1,
            velocity_1h: 1,
            failure_count: 10,
        };
        assert_eq!(evaluate(&input, &config()), Decision::Deny);
    }
}
