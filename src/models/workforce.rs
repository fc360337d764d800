//! Competence authorizations, supporting evidence, and the people registry.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthorizationLevel {
    Supervised,
    Authorized,
    Lead,
}

impl AuthorizationLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Supervised => "SUPERVISED",
            Self::Authorized => "AUTHORIZED",
            Self::Lead => "LEAD",
        }
    }
}

impl std::fmt::Display for AuthorizationLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<String> for AuthorizationLevel {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.as_str() {
            "SUPERVISED" => Ok(Self::Supervised),
            "AUTHORIZED" => Ok(Self::Authorized),
            "LEAD" => Ok(Self::Lead),
            _ => Err(format!("Unknown authorization level: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthorizationStatus {
    Active,
    Expired,
    Revoked,
}

impl AuthorizationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Expired => "EXPIRED",
            Self::Revoked => "REVOKED",
        }
    }
}

impl std::fmt::Display for AuthorizationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<String> for AuthorizationStatus {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.as_str() {
            "ACTIVE" => Ok(Self::Active),
            "EXPIRED" => Ok(Self::Expired),
            "REVOKED" => Ok(Self::Revoked),
            _ => Err(format!("Unknown authorization status: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EvidenceType {
    Training,
    Certificate,
    Assessment,
    Other,
}

impl EvidenceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Training => "TRAINING",
            Self::Certificate => "CERTIFICATE",
            Self::Assessment => "ASSESSMENT",
            Self::Other => "OTHER",
        }
    }
}

impl std::fmt::Display for EvidenceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<String> for EvidenceType {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.as_str() {
            "TRAINING" => Ok(Self::Training),
            "CERTIFICATE" => Ok(Self::Certificate),
            "ASSESSMENT" => Ok(Self::Assessment),
            "OTHER" => Ok(Self::Other),
            _ => Err(format!("Unknown evidence type: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PersonType {
    Operator,
    Trainee,
    ClientStaff,
    Internal,
}

impl PersonType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Operator => "OPERATOR",
            Self::Trainee => "TRAINEE",
            Self::ClientStaff => "CLIENT_STAFF",
            Self::Internal => "INTERNAL",
        }
    }
}

impl std::fmt::Display for PersonType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<String> for PersonType {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.as_str() {
            "OPERATOR" => Ok(Self::Operator),
            "TRAINEE" => Ok(Self::Trainee),
            "CLIENT_STAFF" => Ok(Self::ClientStaff),
            "INTERNAL" => Ok(Self::Internal),
            _ => Err(format!("Unknown person type: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CredentialStatus {
    Active,
    Expired,
    Suspended,
    Revoked,
}

impl CredentialStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Expired => "EXPIRED",
            Self::Suspended => "SUSPENDED",
            Self::Revoked => "REVOKED",
        }
    }
}

impl std::fmt::Display for CredentialStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<String> for CredentialStatus {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.as_str() {
            "ACTIVE" => Ok(Self::Active),
            "EXPIRED" => Ok(Self::Expired),
            "SUSPENDED" => Ok(Self::Suspended),
            "REVOKED" => Ok(Self::Revoked),
            _ => Err(format!("Unknown credential status: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CompetenceAuthorization {
    pub id: i64,
    pub user_id: i64,
    pub service_id: Option<i64>,
    pub discipline: String,
    #[sqlx(try_from = "String")]
    pub level: AuthorizationLevel,
    pub scope_notes: String,
    pub valid_from: NaiveDate,
    pub valid_until: Option<NaiveDate>,
    pub last_assessed: Option<NaiveDate>,
    #[sqlx(try_from = "String")]
    pub status: AuthorizationStatus,
    pub created_by: Option<i64>,
    pub updated_by: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CompetenceAuthorization {
    /// Active and inside the validity window as of `today`.
    pub fn is_valid_on(&self, today: NaiveDate) -> bool {
        if self.status != AuthorizationStatus::Active {
            return false;
        }
        if self.valid_from > today {
            return false;
        }
        match self.valid_until {
            Some(until) => until >= today,
            None => true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CompetenceEvidence {
    pub id: i64,
    pub authorization_id: i64,
    #[sqlx(try_from = "String")]
    pub evidence_type: EvidenceType,
    pub issued_by: String,
    pub issued_on: Option<NaiveDate>,
    pub reference_code: String,
    pub document_uri: Option<String>,
    pub notes: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Person {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    #[sqlx(try_from = "String")]
    pub person_type: PersonType,
    pub employer: String,
    pub client_id: Option<i64>,
    pub notes: String,
    pub created_by: Option<i64>,
    pub updated_by: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PersonCredential {
    pub id: i64,
    pub person_id: i64,
    pub credential_name: String,
    pub issuing_body: String,
    pub reference_code: String,
    pub issued_on: NaiveDate,
    pub valid_until: Option<NaiveDate>,
    #[sqlx(try_from = "String")]
    pub status: CredentialStatus,
    pub document_uri: Option<String>,
    pub notes: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn authorization(
        status: AuthorizationStatus,
        valid_from: NaiveDate,
        valid_until: Option<NaiveDate>,
    ) -> CompetenceAuthorization {
        CompetenceAuthorization {
            id: 1,
            user_id: 1,
            service_id: None,
            discipline: "Lifting".to_string(),
            level: AuthorizationLevel::Authorized,
            scope_notes: String::new(),
            valid_from,
            valid_until,
            last_assessed: None,
            status,
            created_by: None,
            updated_by: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_authorization_levels_are_ordered() {
        assert!(AuthorizationLevel::Supervised < AuthorizationLevel::Authorized);
        assert!(AuthorizationLevel::Authorized < AuthorizationLevel::Lead);
    }

    #[test]
    fn test_validity_window() {
        let today = NaiveDate::from_ymd_opt(2026, 6, 1).unwrap();
        let start = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2026, 12, 31).unwrap();

        assert!(authorization(AuthorizationStatus::Active, start, Some(end)).is_valid_on(today));
        assert!(authorization(AuthorizationStatus::Active, start, None).is_valid_on(today));
        assert!(!authorization(AuthorizationStatus::Revoked, start, Some(end)).is_valid_on(today));
        assert!(!authorization(AuthorizationStatus::Active, start, Some(start)).is_valid_on(today));

        let future_start = NaiveDate::from_ymd_opt(2026, 7, 1).unwrap();
        assert!(!authorization(AuthorizationStatus::Active, future_start, None).is_valid_on(today));
    }
}
