//! Inspections, checklist answers, and photo references.
//!
//! `Inspection.version` is the optimistic-concurrency token: every lifecycle
//! write is a compare-and-swap on (id, version), so a stale caller loses to
//! a concurrent transition instead of silently overwriting it.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InspectionStatus {
    Draft,
    InProgress,
    Submitted,
    Approved,
    Rejected,
}

impl InspectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::InProgress => "IN_PROGRESS",
            Self::Submitted => "SUBMITTED",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
        }
    }

    /// Approved and rejected inspections accept no further transitions.
    pub fn is_decided(&self) -> bool {
        matches!(self, Self::Approved | Self::Rejected)
    }

    /// Answers may only be recorded while the inspection is being executed.
    pub fn accepts_answers(&self) -> bool {
        matches!(self, Self::Draft | Self::InProgress)
    }
}

impl std::fmt::Display for InspectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<String> for InspectionStatus {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.as_str() {
            "DRAFT" => Ok(Self::Draft),
            "IN_PROGRESS" => Ok(Self::InProgress),
            "SUBMITTED" => Ok(Self::Submitted),
            "APPROVED" => Ok(Self::Approved),
            "REJECTED" => Ok(Self::Rejected),
            _ => Err(format!("Unknown inspection status: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnswerResult {
    Safe,
    NotSafe,
    Na,
}

impl AnswerResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Safe => "SAFE",
            Self::NotSafe => "NOT_SAFE",
            Self::Na => "NA",
        }
    }
}

impl std::fmt::Display for AnswerResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<String> for AnswerResult {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.as_str() {
            "SAFE" => Ok(Self::Safe),
            "NOT_SAFE" => Ok(Self::NotSafe),
            "NA" => Ok(Self::Na),
            _ => Err(format!("Unknown answer result: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Inspection {
    pub id: i64,
    pub job_line_item_id: i64,
    pub inspector_id: Option<i64>,
    pub checklist_template: String,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    #[sqlx(try_from = "String")]
    pub status: InspectionStatus,
    pub version: i32,
    pub geo_location_lat: Option<Decimal>,
    pub geo_location_lng: Option<Decimal>,
    pub inspector_signature_uri: Option<String>,
    pub client_signature_uri: Option<String>,
    pub created_by: Option<i64>,
    pub updated_by: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct InspectionAnswer {
    pub id: i64,
    pub inspection_id: i64,
    pub question_key: String,
    #[sqlx(try_from = "String")]
    pub result: AnswerResult,
    pub comment: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PhotoRef {
    pub id: i64,
    pub inspection_id: i64,
    pub answer_id: Option<i64>,
    pub file_uri: String,
    /// Photo slot identifier (e.g. FRONT, SIDE1).
    pub slot_name: String,
    pub geotag_lat: Option<Decimal>,
    pub geotag_lng: Option<Decimal>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decided_statuses() {
        assert!(InspectionStatus::Approved.is_decided());
        assert!(InspectionStatus::Rejected.is_decided());
        assert!(!InspectionStatus::Submitted.is_decided());
    }

    #[test]
    fn test_answers_only_during_execution() {
        assert!(InspectionStatus::Draft.accepts_answers());
        assert!(InspectionStatus::InProgress.accepts_answers());
        assert!(!InspectionStatus::Submitted.accepts_answers());
        assert!(!InspectionStatus::Approved.accepts_answers());
    }

    #[test]
    fn test_answer_result_round_trip() {
        assert_eq!(
            AnswerResult::try_from("NOT_SAFE".to_string()).unwrap(),
            AnswerResult::NotSafe
        );
        assert!(AnswerResult::try_from("UNSAFE".to_string()).is_err());
    }
}
