//! Request identity.
//!
//! Token verification happens at the gateway in front of this service;
//! requests arrive with the caller already resolved to an `X-User-Id`
//! header. The extractor loads the account row and refuses unknown or
//! deactivated accounts, so handlers always see a live `User`.

use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;
use axum::http::StatusCode;
use sqlx::PgPool;

use crate::database::UserService;
use crate::models::{Role, User};

pub const USER_ID_HEADER: &str = "x-user-id";
pub const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";

/// Authenticated caller plus the source address recorded in audit entries.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user: User,
    pub ip: Option<String>,
}

impl CurrentUser {
    pub fn id(&self) -> i64 {
        self.user.id
    }

    pub fn is_client(&self) -> bool {
        self.user.role == Role::Client
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    PgPool: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = (StatusCode, String);

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<i64>().ok())
            .ok_or_else(|| {
                (
                    StatusCode::UNAUTHORIZED,
                    "Missing or invalid X-User-Id header".to_string(),
                )
            })?;

        let pool = PgPool::from_ref(state);
        let user = UserService::new(pool)
            .find_by_id(user_id)
            .await
            .map_err(|e| {
                tracing::error!("User lookup error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Database error".to_string(),
                )
            })?
            .ok_or_else(|| (StatusCode::UNAUTHORIZED, "Unknown user".to_string()))?;

        if !user.is_active {
            return Err((
                StatusCode::UNAUTHORIZED,
                "Account is deactivated".to_string(),
            ));
        }

        let ip = parts
            .headers
            .get(FORWARDED_FOR_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(|v| v.trim().to_string());

        Ok(CurrentUser { user, ip })
    }
}

/// Refuse CLIENT accounts on internal surfaces. Lifecycle operations carry
/// their own finer-grained role guards; this covers plain CRUD.
pub fn require_staff(current: &CurrentUser) -> Result<(), (StatusCode, String)> {
    if current.is_client() {
        Err((
            StatusCode::FORBIDDEN,
            "Client accounts cannot access this resource".to_string(),
        ))
    } else {
        Ok(())
    }
}

pub fn require_admin(current: &CurrentUser) -> Result<(), (StatusCode, String)> {
    if current.user.is_admin() {
        Ok(())
    } else {
        Err((
            StatusCode::FORBIDDEN,
            "Administrator role required".to_string(),
        ))
    }
}

/// The tool, competence and people registries are technical-office
/// surfaces.
pub fn require_technical(current: &CurrentUser) -> Result<(), (StatusCode, String)> {
    if matches!(current.user.role, Role::Admin | Role::TechnicalManager) {
        Ok(())
    } else {
        Err((
            StatusCode::FORBIDDEN,
            "Administrator or technical manager role required".to_string(),
        ))
    }
}
