//! User accounts and operational roles.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Role attached to every account. Transition guards check these, not
/// individual permissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    TeamLead,
    TechnicalManager,
    Inspector,
    Client,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "ADMIN",
            Self::TeamLead => "TEAM_LEAD",
            Self::TechnicalManager => "TECHNICAL_MANAGER",
            Self::Inspector => "INSPECTOR",
            Self::Client => "CLIENT",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<String> for Role {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.as_str() {
            "ADMIN" => Ok(Self::Admin),
            "TEAM_LEAD" => Ok(Self::TeamLead),
            "TECHNICAL_MANAGER" => Ok(Self::TechnicalManager),
            "INSPECTOR" => Ok(Self::Inspector),
            "CLIENT" => Ok(Self::Client),
            _ => Err(format!("Unknown role: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[sqlx(try_from = "String")]
    pub role: Role,
    pub competence: String,
    pub phone: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Display name, falling back to the username when no name is recorded.
    pub fn full_name(&self) -> String {
        let name = format!("{} {}", self.first_name, self.last_name);
        let name = name.trim();
        if name.is_empty() {
            self.username.clone()
        } else {
            name.to_string()
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trip() {
        for role in [
            Role::Admin,
            Role::TeamLead,
            Role::TechnicalManager,
            Role::Inspector,
            Role::Client,
        ] {
            let parsed = Role::try_from(role.as_str().to_string()).unwrap();
            assert_eq!(parsed, role);
        }
    }

    #[test]
    fn test_unknown_role_is_rejected() {
        assert!(Role::try_from("SUPERVISOR".to_string()).is_err());
    }

    #[test]
    fn test_full_name_falls_back_to_username() {
        let user = User {
            id: 1,
            username: "jdoe".to_string(),
            email: String::new(),
            first_name: String::new(),
            last_name: String::new(),
            role: Role::Inspector,
            competence: String::new(),
            phone: String::new(),
            is_active: true,
            created_at: Utc::now(),
        };
        assert_eq!(user.full_name(), "jdoe");
    }
}
