//! Service master registry with versioned governance records.
//!
//! A service is identified by code; its rules (checklist level, evidence
//! requirements, approver roles, validity) live on versions. Publishing a
//! version pins it as the service's current version.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServiceCategory {
    Inspection,
    Testing,
    Training,
    OperatorCertification,
    Calibration,
}

impl ServiceCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Inspection => "INSPECTION",
            Self::Testing => "TESTING",
            Self::Training => "TRAINING",
            Self::OperatorCertification => "OPERATOR_CERTIFICATION",
            Self::Calibration => "CALIBRATION",
        }
    }
}

impl std::fmt::Display for ServiceCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<String> for ServiceCategory {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.as_str() {
            "INSPECTION" => Ok(Self::Inspection),
            "TESTING" => Ok(Self::Testing),
            "TRAINING" => Ok(Self::Training),
            "OPERATOR_CERTIFICATION" => Ok(Self::OperatorCertification),
            "CALIBRATION" => Ok(Self::Calibration),
            _ => Err(format!("Unknown service category: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServiceStatus {
    Active,
    Inactive,
}

impl ServiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Inactive => "INACTIVE",
        }
    }
}

impl std::fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<String> for ServiceStatus {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.as_str() {
            "ACTIVE" => Ok(Self::Active),
            "INACTIVE" => Ok(Self::Inactive),
            _ => Err(format!("Unknown service status: {}", s)),
        }
    }
}

/// Whether equipment or a person must be attached to an execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequirementLevel {
    Mandatory,
    Optional,
    NotRequired,
}

impl RequirementLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mandatory => "MANDATORY",
            Self::Optional => "OPTIONAL",
            Self::NotRequired => "NOT_REQUIRED",
        }
    }
}

impl std::fmt::Display for RequirementLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<String> for RequirementLevel {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.as_str() {
            "MANDATORY" => Ok(Self::Mandatory),
            "OPTIONAL" => Ok(Self::Optional),
            "NOT_REQUIRED" => Ok(Self::NotRequired),
            _ => Err(format!("Unknown requirement level: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StickerPolicy {
    Required,
    Optional,
    NotApplicable,
}

impl StickerPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Required => "REQUIRED",
            Self::Optional => "OPTIONAL",
            Self::NotApplicable => "NOT_APPLICABLE",
        }
    }
}

impl std::fmt::Display for StickerPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<String> for StickerPolicy {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.as_str() {
            "REQUIRED" => Ok(Self::Required),
            "OPTIONAL" => Ok(Self::Optional),
            "NOT_APPLICABLE" => Ok(Self::NotApplicable),
            _ => Err(format!("Unknown sticker policy: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChecklistLevel {
    Simplified,
    Expanded,
    Critical,
}

impl ChecklistLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Simplified => "SIMPLIFIED",
            Self::Expanded => "EXPANDED",
            Self::Critical => "CRITICAL",
        }
    }
}

impl std::fmt::Display for ChecklistLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<String> for ChecklistLevel {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.as_str() {
            "SIMPLIFIED" => Ok(Self::Simplified),
            "EXPANDED" => Ok(Self::Expanded),
            "CRITICAL" => Ok(Self::Critical),
            _ => Err(format!("Unknown checklist level: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Service {
    pub id: i64,
    pub code: String,
    pub name_en: String,
    pub name_ar: String,
    #[sqlx(try_from = "String")]
    pub category: ServiceCategory,
    pub discipline: String,
    #[sqlx(try_from = "String")]
    pub status: ServiceStatus,
    pub description: String,
    pub current_version_id: Option<i64>,
    pub created_by: Option<i64>,
    pub updated_by: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ServiceVersion {
    pub id: i64,
    pub service_id: i64,
    pub version_number: i32,
    pub effective_date: NaiveDate,
    pub is_published: bool,
    #[sqlx(try_from = "String")]
    pub requires_equipment: RequirementLevel,
    #[sqlx(try_from = "String")]
    pub requires_person: RequirementLevel,
    pub checklist_template: String,
    #[sqlx(try_from = "String")]
    pub default_checklist_level: ChecklistLevel,
    #[sqlx(try_from = "String")]
    pub minimum_checklist_level: ChecklistLevel,
    pub allow_bulk_all_ok: bool,
    pub require_photo_evidence: bool,
    pub require_document_evidence: bool,
    #[sqlx(try_from = "String")]
    pub sticker_policy: StickerPolicy,
    pub approval_required: bool,
    pub approver_roles: serde_json::Value,
    pub validity_max_months: Option<i32>,
    pub validity_options: serde_json::Value,
    pub output_definitions: serde_json::Value,
    pub standards: serde_json::Value,
    pub notes: String,
    pub created_by: Option<i64>,
    pub updated_by: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checklist_levels_are_ordered() {
        assert!(ChecklistLevel::Simplified < ChecklistLevel::Expanded);
        assert!(ChecklistLevel::Expanded < ChecklistLevel::Critical);
    }

    #[test]
    fn test_category_round_trip() {
        let parsed = ServiceCategory::try_from("OPERATOR_CERTIFICATION".to_string()).unwrap();
        assert_eq!(parsed, ServiceCategory::OperatorCertification);
        assert_eq!(parsed.as_str(), "OPERATOR_CERTIFICATION");
    }
}
