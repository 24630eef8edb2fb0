use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Terminal lifecycle: `PENDING` on creation, `APPROVED`/`DENIED` once an
/// operator resolves it. Created only for the REVIEW branch of `evaluate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReviewStatus {
    Pending,
    Approved,
    Denied,
}

impl ReviewStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Approved => "APPROVED",
            Self::Denied => "DENIED",
        }
    }
}

impl std::str::FromStr for ReviewStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "APPROVED" => Ok(Self::Approved),
            "DENIED" => Ok(Self::Denied),
            other => Err(format!("unknown review status: {other}")),
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RiskReviewRow {
    pub payment_id: Uuid,
    pub customer_id: String,
    pub amount_cents: i64,
    pub status: String,
    pub reviewed_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskReview {
    pub payment_id: Uuid,
    pub customer_id: String,
    pub amount_cents: i64,
    pub status: ReviewStatus,
    pub reviewed_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
}

impl RiskReviewRow {
    pub fn into_review(self) -> Result<RiskReview, String> {
        Ok(RiskReview {
            payment_id: self.payment_id,
            customer_id: self.customer_id,
            amount_cents: self.amount_cents,
            status: self.status.parse()?,
            reviewed_by: self.reviewed_by,
            created_at: self.created_at,
            reviewed_at: self.reviewed_at,
        })
    }
}
