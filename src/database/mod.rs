//! Database connection management and per-entity services.
//!
//! Every service is a thin struct over the shared `PgPool` issuing
//! runtime-checked queries. The schema comes from `migrations/` and is
//! applied at startup through the sqlx migrator.

use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;
use tracing::{info, warn};

pub mod audit_log;
pub mod certificate_service;
pub mod client_service;
pub mod competence_service;
pub mod equipment_service;
pub mod inspection_service;
pub mod job_order_service;
pub mod person_service;
pub mod report_service;
pub mod service_registry;
pub mod sticker_service;
pub mod tool_service;
pub mod user_service;

pub use audit_log::{AuditAction, AuditLogEntry, AuditLogger, NewAuditEntry};
pub use certificate_service::{CertificateService, NewCertificate};
pub use client_service::{ClientService, CreateClientRequest, UpdateClientRequest};
pub use competence_service::{AddEvidenceRequest, CompetenceService, CreateAuthorizationRequest};
pub use equipment_service::{CreateEquipmentRequest, EquipmentService, UpdateEquipmentRequest};
pub use inspection_service::{
    AttachPhotoRequest, CreateInspectionRequest, InspectionService, UpdateInspectionRequest,
};
pub use job_order_service::{
    CreateJobOrderRequest, CreateLineItemRequest, JobOrderService, UpdateJobOrderRequest,
};
pub use person_service::{
    AddCredentialRequest, CreatePersonRequest, PersonService, UpdatePersonRequest,
};
pub use report_service::{NewFieldReport, ReportService};
pub use service_registry::{
    CreateServiceRequest, CreateServiceVersionRequest, ServiceRegistry, UpdateServiceRequest,
};
pub use sticker_service::StickerService;
pub use tool_service::{
    CheckoutToolRequest, CreateToolCategoryRequest, CreateToolRequest, RecordCalibrationRequest,
    ReportIncidentRequest, ToolService,
};
pub use user_service::{CreateUserRequest, UpdateUserRequest, UserService};

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub connection_timeout: Duration,
    pub idle_timeout: Option<Duration>,
    pub max_lifetime: Option<Duration>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgresql://localhost:5432/inspecta".to_string()),
            max_connections: std::env::var("DATABASE_POOL_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10),
            connection_timeout: Duration::from_secs(30),
            idle_timeout: Some(Duration::from_secs(600)),
            max_lifetime: Some(Duration::from_secs(1800)),
        }
    }
}

/// Database connection manager
pub struct DatabaseManager {
    pool: PgPool,
}

impl DatabaseManager {
    /// Create a new database manager with the given configuration
    pub async fn new(config: DatabaseConfig) -> Result<Self, sqlx::Error> {
        info!(
            "Connecting to database: {}",
            mask_database_url(&config.database_url)
        );

        let mut pool_options = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.connection_timeout);

        if let Some(idle_timeout) = config.idle_timeout {
            pool_options = pool_options.idle_timeout(idle_timeout);
        }

        if let Some(max_lifetime) = config.max_lifetime {
            pool_options = pool_options.max_lifetime(max_lifetime);
        }

        let pool = pool_options
            .connect(&config.database_url)
            .await
            .map_err(|e| {
                warn!("Failed to connect to database: {}", e);
                e
            })?;

        info!("Database connection pool created successfully");

        Ok(Self { pool })
    }

    /// Create a new database manager with default configuration
    pub async fn with_default_config() -> Result<Self, sqlx::Error> {
        Self::new(DatabaseConfig::default()).await
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Test database connectivity
    pub async fn test_connection(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|_| ())
    }

    /// Apply pending migrations from the embedded `migrations/` directory.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("Database migrations complete");
        Ok(())
    }

    /// Close the database connection pool
    pub async fn close(self) {
        info!("Closing database connection pool");
        self.pool.close().await;
    }
}

/// Mask sensitive information in database URL for logging
fn mask_database_url(url: &str) -> String {
    if let Ok(parsed) = url::Url::parse(url) {
        let mut masked = parsed.clone();
        if parsed.password().is_some() {
            let _ = masked.set_password(Some("***"));
        }
        masked.to_string()
    } else {
        // If URL parsing fails, just mask the middle part
        if url.len() > 20 {
            format!("{}***{}", &url[..10], &url[url.len() - 10..])
        } else {
            "***".to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_database_url_hides_password() {
        let masked = mask_database_url("postgresql://inspecta:s3cret@db:5432/inspecta");
        assert!(!masked.contains("s3cret"));
        assert!(masked.contains("***"));
        assert!(masked.contains("db:5432"));
    }

    #[test]
    fn test_mask_database_url_without_password() {
        let masked = mask_database_url("postgresql://localhost:5432/inspecta");
        assert_eq!(masked, "postgresql://localhost:5432/inspecta");
    }
}
