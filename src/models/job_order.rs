//! Job orders and their line items.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobOrderStatus {
    Draft,
    Scheduled,
    InProgress,
    Completed,
    Published,
    Cancelled,
}

impl JobOrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::Scheduled => "SCHEDULED",
            Self::InProgress => "IN_PROGRESS",
            Self::Completed => "COMPLETED",
            Self::Published => "PUBLISHED",
            Self::Cancelled => "CANCELLED",
        }
    }

    /// Published and cancelled orders accept no further work.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Published | Self::Cancelled)
    }
}

impl std::fmt::Display for JobOrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<String> for JobOrderStatus {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.as_str() {
            "DRAFT" => Ok(Self::Draft),
            "SCHEDULED" => Ok(Self::Scheduled),
            "IN_PROGRESS" => Ok(Self::InProgress),
            "COMPLETED" => Ok(Self::Completed),
            "PUBLISHED" => Ok(Self::Published),
            "CANCELLED" => Ok(Self::Cancelled),
            _ => Err(format!("Unknown job order status: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FinanceStatus {
    Pending,
    Ready,
    Invoiced,
}

impl FinanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Ready => "READY",
            Self::Invoiced => "INVOICED",
        }
    }
}

impl std::fmt::Display for FinanceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<String> for FinanceStatus {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.as_str() {
            "PENDING" => Ok(Self::Pending),
            "READY" => Ok(Self::Ready),
            "INVOICED" => Ok(Self::Invoiced),
            _ => Err(format!("Unknown finance status: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LineItemStatus {
    Pending,
    Assigned,
    InProgress,
    Completed,
}

impl LineItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Assigned => "ASSIGNED",
            Self::InProgress => "IN_PROGRESS",
            Self::Completed => "COMPLETED",
        }
    }
}

impl std::fmt::Display for LineItemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<String> for LineItemStatus {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.as_str() {
            "PENDING" => Ok(Self::Pending),
            "ASSIGNED" => Ok(Self::Assigned),
            "IN_PROGRESS" => Ok(Self::InProgress),
            "COMPLETED" => Ok(Self::Completed),
            _ => Err(format!("Unknown line item status: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct JobOrder {
    pub id: i64,
    pub client_id: i64,
    pub po_reference: String,
    #[sqlx(try_from = "String")]
    pub status: JobOrderStatus,
    pub site_location: String,
    pub scheduled_start: Option<DateTime<Utc>>,
    pub scheduled_end: Option<DateTime<Utc>>,
    pub tentative_date: Option<NaiveDate>,
    pub notes: String,
    pub invoice_number: Option<String>,
    #[sqlx(try_from = "String")]
    pub finance_status: FinanceStatus,
    pub created_by: Option<i64>,
    pub updated_by: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct JobLineItem {
    pub id: i64,
    pub job_order_id: i64,
    pub equipment_id: Option<i64>,
    pub item_type: String,
    pub description: String,
    pub quantity: i32,
    #[sqlx(try_from = "String")]
    pub status: LineItemStatus,
    pub created_by: Option<i64>,
    pub updated_by: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Aggregated progress view over a job order's line items and inspections.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobOrderSummary {
    pub job_order_id: i64,
    pub line_item_count: i64,
    pub inspection_total: i64,
    pub inspections_draft: i64,
    pub inspections_in_progress: i64,
    pub inspections_submitted: i64,
    pub inspections_approved: i64,
    pub inspections_rejected: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_statuses() {
        assert!(JobOrderStatus::Published.is_terminal());
        assert!(JobOrderStatus::Cancelled.is_terminal());
        assert!(!JobOrderStatus::InProgress.is_terminal());
    }

    #[test]
    fn test_status_round_trip() {
        let parsed = JobOrderStatus::try_from("IN_PROGRESS".to_string()).unwrap();
        assert_eq!(parsed, JobOrderStatus::InProgress);
    }
}
