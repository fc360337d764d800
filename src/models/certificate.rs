//! Certificates issued for approved inspections.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CertificateStatus {
    Draft,
    Generated,
    Published,
}

impl CertificateStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::Generated => "GENERATED",
            Self::Published => "PUBLISHED",
        }
    }
}

impl std::fmt::Display for CertificateStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<String> for CertificateStatus {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.as_str() {
            "DRAFT" => Ok(Self::Draft),
            "GENERATED" => Ok(Self::Generated),
            "PUBLISHED" => Ok(Self::Published),
            _ => Err(format!("Unknown certificate status: {}", s)),
        }
    }
}

/// Certificate number: issue year followed by the zero-padded inspection id.
/// The same value is embedded in the QR payload on the printed document.
pub fn format_certificate_number(year: i32, inspection_id: i64) -> String {
    format!("CERT-{}{:08}", year, inspection_id)
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Certificate {
    pub id: i64,
    pub inspection_id: i64,
    pub generated_by: Option<i64>,
    pub pdf_uri: String,
    pub pdf_sha256: String,
    pub qr_code: String,
    pub issued_date: DateTime<Utc>,
    /// Snapshot of the approval decisions at generation time.
    pub approval_chain: serde_json::Value,
    #[sqlx(try_from = "String")]
    pub status: CertificateStatus,
    pub share_link_token: Uuid,
    pub created_by: Option<i64>,
    pub updated_by: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_certificate_number_is_zero_padded() {
        assert_eq!(format_certificate_number(2026, 42), "CERT-202600000042");
        assert_eq!(
            format_certificate_number(2026, 12345678),
            "CERT-202612345678"
        );
    }
}
