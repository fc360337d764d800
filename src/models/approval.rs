//! Approval decisions recorded against workflow entities.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApprovalEntity {
    Inspection,
    Certificate,
    JobOrder,
}

impl ApprovalEntity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Inspection => "INSPECTION",
            Self::Certificate => "CERTIFICATE",
            Self::JobOrder => "JOB_ORDER",
        }
    }
}

impl std::fmt::Display for ApprovalEntity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<String> for ApprovalEntity {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.as_str() {
            "INSPECTION" => Ok(Self::Inspection),
            "CERTIFICATE" => Ok(Self::Certificate),
            "JOB_ORDER" => Ok(Self::JobOrder),
            _ => Err(format!("Unknown approval entity: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApprovalDecision {
    Pending,
    Approved,
    Rejected,
}

impl ApprovalDecision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
        }
    }
}

impl std::fmt::Display for ApprovalDecision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<String> for ApprovalDecision {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.as_str() {
            "PENDING" => Ok(Self::Pending),
            "APPROVED" => Ok(Self::Approved),
            "REJECTED" => Ok(Self::Rejected),
            _ => Err(format!("Unknown approval decision: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Approval {
    pub id: i64,
    #[sqlx(try_from = "String")]
    pub entity_type: ApprovalEntity,
    pub entity_id: i64,
    pub approver_id: i64,
    #[sqlx(try_from = "String")]
    pub decision: ApprovalDecision,
    pub comment: String,
    pub decided_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
