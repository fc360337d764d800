//! Equipment under inspection: client assets identified by tag code.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Equipment {
    pub id: i64,
    pub client_id: i64,
    pub tag_code: String,
    pub equipment_type: String,
    pub manufacturer: String,
    pub model: String,
    pub serial_number: String,
    /// Safe Working Load.
    pub swl: Option<Decimal>,
    pub location: String,
    pub next_due: Option<NaiveDate>,
    pub created_by: Option<i64>,
    pub updated_by: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
