//! Tool and instrument registry: categories, assignment lifecycle, usage
//! logs, incidents, and calibration history.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ToolStatus {
    Available,
    Assigned,
    Maintenance,
    Calibration,
    Lost,
    Retired,
}

impl ToolStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "AVAILABLE",
            Self::Assigned => "ASSIGNED",
            Self::Maintenance => "MAINTENANCE",
            Self::Calibration => "CALIBRATION",
            Self::Lost => "LOST",
            Self::Retired => "RETIRED",
        }
    }
}

impl std::fmt::Display for ToolStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<String> for ToolStatus {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.as_str() {
            "AVAILABLE" => Ok(Self::Available),
            "ASSIGNED" => Ok(Self::Assigned),
            "MAINTENANCE" => Ok(Self::Maintenance),
            "CALIBRATION" => Ok(Self::Calibration),
            "LOST" => Ok(Self::Lost),
            "RETIRED" => Ok(Self::Retired),
            _ => Err(format!("Unknown tool status: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssignmentMode {
    Individual,
    Team,
    JobOrder,
    Pool,
}

impl AssignmentMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Individual => "INDIVIDUAL",
            Self::Team => "TEAM",
            Self::JobOrder => "JOB_ORDER",
            Self::Pool => "POOL",
        }
    }
}

impl std::fmt::Display for AssignmentMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<String> for AssignmentMode {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.as_str() {
            "INDIVIDUAL" => Ok(Self::Individual),
            "TEAM" => Ok(Self::Team),
            "JOB_ORDER" => Ok(Self::JobOrder),
            "POOL" => Ok(Self::Pool),
            _ => Err(format!("Unknown assignment mode: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ToolAssignmentType {
    User,
    JobOrder,
    Equipment,
    Client,
}

impl ToolAssignmentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "USER",
            Self::JobOrder => "JOB_ORDER",
            Self::Equipment => "EQUIPMENT",
            Self::Client => "CLIENT",
        }
    }
}

impl std::fmt::Display for ToolAssignmentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<String> for ToolAssignmentType {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.as_str() {
            "USER" => Ok(Self::User),
            "JOB_ORDER" => Ok(Self::JobOrder),
            "EQUIPMENT" => Ok(Self::Equipment),
            "CLIENT" => Ok(Self::Client),
            _ => Err(format!("Unknown tool assignment type: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ToolAssignmentStatus {
    Active,
    Returned,
    Lost,
    Damaged,
}

impl ToolAssignmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Returned => "RETURNED",
            Self::Lost => "LOST",
            Self::Damaged => "DAMAGED",
        }
    }
}

impl std::fmt::Display for ToolAssignmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<String> for ToolAssignmentStatus {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.as_str() {
            "ACTIVE" => Ok(Self::Active),
            "RETURNED" => Ok(Self::Returned),
            "LOST" => Ok(Self::Lost),
            "DAMAGED" => Ok(Self::Damaged),
            _ => Err(format!("Unknown tool assignment status: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ToolEventType {
    Checkout,
    Checkin,
    Calibration,
    Maintenance,
    Repair,
    Alert,
}

impl ToolEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Checkout => "CHECKOUT",
            Self::Checkin => "CHECKIN",
            Self::Calibration => "CALIBRATION",
            Self::Maintenance => "MAINTENANCE",
            Self::Repair => "REPAIR",
            Self::Alert => "ALERT",
        }
    }
}

impl std::fmt::Display for ToolEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<String> for ToolEventType {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.as_str() {
            "CHECKOUT" => Ok(Self::Checkout),
            "CHECKIN" => Ok(Self::Checkin),
            "CALIBRATION" => Ok(Self::Calibration),
            "MAINTENANCE" => Ok(Self::Maintenance),
            "REPAIR" => Ok(Self::Repair),
            "ALERT" => Ok(Self::Alert),
            _ => Err(format!("Unknown tool event type: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IncidentType {
    Loss,
    Damage,
    CalibrationFailure,
    Other,
}

impl IncidentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Loss => "LOSS",
            Self::Damage => "DAMAGE",
            Self::CalibrationFailure => "CALIBRATION_FAILURE",
            Self::Other => "OTHER",
        }
    }
}

impl std::fmt::Display for IncidentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<String> for IncidentType {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.as_str() {
            "LOSS" => Ok(Self::Loss),
            "DAMAGE" => Ok(Self::Damage),
            "CALIBRATION_FAILURE" => Ok(Self::CalibrationFailure),
            "OTHER" => Ok(Self::Other),
            _ => Err(format!("Unknown incident type: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IncidentSeverity {
    Low,
    Medium,
    High,
}

impl IncidentSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
        }
    }
}

impl std::fmt::Display for IncidentSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<String> for IncidentSeverity {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.as_str() {
            "LOW" => Ok(Self::Low),
            "MEDIUM" => Ok(Self::Medium),
            "HIGH" => Ok(Self::High),
            _ => Err(format!("Unknown incident severity: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ToolCategory {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub description: String,
    pub requires_calibration: bool,
    pub calibration_interval_days: Option<i32>,
    #[sqlx(try_from = "String")]
    pub default_assignment_type: AssignmentMode,
    pub notes: String,
    pub created_by: Option<i64>,
    pub updated_by: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Tool {
    pub id: i64,
    pub name: String,
    pub serial_number: String,
    pub category_id: Option<i64>,
    #[sqlx(try_from = "String")]
    pub status: ToolStatus,
    #[sqlx(try_from = "String")]
    pub assignment_mode: AssignmentMode,
    pub location: String,
    pub calibration_due: Option<NaiveDate>,
    pub assigned_to: Option<i64>,
    pub created_by: Option<i64>,
    pub updated_by: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Tool {
    pub fn is_overdue_for_calibration(&self, today: NaiveDate) -> bool {
        match self.calibration_due {
            Some(due) => due < today,
            None => false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ToolAssignment {
    pub id: i64,
    pub tool_id: i64,
    #[sqlx(try_from = "String")]
    pub assignment_type: ToolAssignmentType,
    pub assigned_user_id: Option<i64>,
    pub job_order_id: Option<i64>,
    pub equipment_id: Option<i64>,
    pub client_id: Option<i64>,
    pub assigned_on: DateTime<Utc>,
    pub expected_return: Option<NaiveDate>,
    pub returned_on: Option<DateTime<Utc>>,
    #[sqlx(try_from = "String")]
    pub status: ToolAssignmentStatus,
    pub notes: String,
    pub created_by: Option<i64>,
    pub updated_by: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ToolUsageLog {
    pub id: i64,
    pub tool_id: i64,
    pub assignment_id: Option<i64>,
    #[sqlx(try_from = "String")]
    pub event_type: ToolEventType,
    pub occurred_at: DateTime<Utc>,
    pub performed_by: Option<i64>,
    pub notes: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ToolIncident {
    pub id: i64,
    pub tool_id: i64,
    #[sqlx(try_from = "String")]
    pub incident_type: IncidentType,
    #[sqlx(try_from = "String")]
    pub severity: IncidentSeverity,
    pub occurred_on: NaiveDate,
    pub description: String,
    pub resolved_on: Option<NaiveDate>,
    pub resolution_notes: String,
    pub created_by: Option<i64>,
    pub updated_by: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Calibration {
    pub id: i64,
    pub tool_id: i64,
    pub calibration_date: NaiveDate,
    pub next_due: NaiveDate,
    pub certificate_uri: Option<String>,
    pub notes: String,
    pub created_by: Option<i64>,
    pub updated_by: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tool_with_due(calibration_due: Option<NaiveDate>) -> Tool {
        Tool {
            id: 1,
            name: "Load cell".to_string(),
            serial_number: "LC-100".to_string(),
            category_id: None,
            status: ToolStatus::Available,
            assignment_mode: AssignmentMode::Individual,
            location: String::new(),
            calibration_due,
            assigned_to: None,
            created_by: None,
            updated_by: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_overdue_calibration() {
        let today = NaiveDate::from_ymd_opt(2026, 5, 10).unwrap();
        let past = NaiveDate::from_ymd_opt(2026, 5, 9).unwrap();
        let future = NaiveDate::from_ymd_opt(2026, 5, 11).unwrap();

        assert!(tool_with_due(Some(past)).is_overdue_for_calibration(today));
        assert!(!tool_with_due(Some(future)).is_overdue_for_calibration(today));
        assert!(!tool_with_due(Some(today)).is_overdue_for_calibration(today));
        assert!(!tool_with_due(None).is_overdue_for_calibration(today));
    }
}
