//! Error types for lifecycle transitions.
//!
//! CRUD services report failures through `anyhow` with context; the
//! lifecycle layer uses this typed enum so the API can map each refusal to
//! the right HTTP status (403 for role gates, 409 for version conflicts,
//! 400 for everything the caller can fix by re-requesting in a valid state).

use chrono::NaiveDate;
use thiserror::Error;

/// Refusals and failures raised by transition guards and lifecycle services.
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("invalid transition for {entity} {id}: {from} -> {to}")]
    InvalidTransition {
        entity: &'static str,
        id: i64,
        from: String,
        to: String,
    },

    #[error("{action} requires one of [{required}], caller role is {actual}")]
    RoleDenied {
        action: &'static str,
        required: String,
        actual: String,
    },

    #[error("inspection {id} does not belong to the calling inspector")]
    NotOwner { id: i64 },

    #[error("a comment is required when rejecting an inspection")]
    MissingComment,

    #[error("{entity} {id} is {status} and no longer accepts execution changes")]
    ExecutionClosed {
        entity: &'static str,
        id: i64,
        status: String,
    },

    #[error("{entity} {id} was modified concurrently, reload and retry")]
    VersionConflict { entity: &'static str, id: i64 },

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("job order {id} has no approved inspections to publish")]
    NothingToPublish { id: i64 },

    #[error("inspection {id} already has a certificate")]
    CertificateExists { id: i64 },

    #[error("inspection {id} is not approved")]
    NotApproved { id: i64 },

    #[error("tool {id} is overdue for calibration (was due {due})")]
    CalibrationOverdue { id: i64, due: NaiveDate },

    #[error("sticker batch size {0} is out of range (1..=1000)")]
    StickerBatchSize(i64),

    #[error("line item {line_item_id} does not belong to job order {job_order_id}")]
    LineItemMismatch {
        line_item_id: i64,
        job_order_id: i64,
    },

    #[error("unknown checklist template '{0}'")]
    UnknownChecklist(String),

    #[error("question key '{question_key}' is not part of checklist '{template}'")]
    UnknownQuestion {
        template: String,
        question_key: String,
    },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type LifecycleResult<T> = Result<T, LifecycleError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_name_the_entity() {
        let err = LifecycleError::InvalidTransition {
            entity: "inspection",
            id: 7,
            from: "DRAFT".to_string(),
            to: "APPROVED".to_string(),
        };
        assert!(err.to_string().contains("inspection 7"));
        assert!(err.to_string().contains("DRAFT -> APPROVED"));
    }

    #[test]
    fn test_version_conflict_mentions_retry() {
        let err = LifecycleError::VersionConflict {
            entity: "inspection",
            id: 3,
        };
        assert!(err.to_string().contains("concurrently"));
    }
}
