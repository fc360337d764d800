//! Domain models.
//!
//! One struct per table, decoded with runtime `query_as` (no compile-time
//! macros; the schema comes from migrations that may not exist when the
//! crate is built). Status enums store canonical UPPERCASE tokens as TEXT
//! and convert through `TryFrom<String>` / `as_str`.

pub mod approval;
pub mod certificate;
pub mod client;
pub mod equipment;
pub mod inspection;
pub mod job_order;
pub mod publication;
pub mod report;
pub mod service;
pub mod sticker;
pub mod tooling;
pub mod user;
pub mod workforce;

pub use approval::{Approval, ApprovalDecision, ApprovalEntity};
pub use certificate::{format_certificate_number, Certificate, CertificateStatus};
pub use client::Client;
pub use equipment::Equipment;
pub use inspection::{AnswerResult, Inspection, InspectionAnswer, InspectionStatus, PhotoRef};
pub use job_order::{
    FinanceStatus, JobLineItem, JobOrder, JobOrderStatus, JobOrderSummary, LineItemStatus,
};
pub use publication::{Publication, PublicationStatus};
pub use report::FieldInspectionReport;
pub use service::{
    ChecklistLevel, RequirementLevel, Service, ServiceCategory, ServiceStatus, ServiceVersion,
    StickerPolicy,
};
pub use sticker::{format_sticker_code, parse_sticker_sequence, Sticker, StickerStatus};
pub use tooling::{
    AssignmentMode, Calibration, IncidentSeverity, IncidentType, Tool, ToolAssignment,
    ToolAssignmentStatus, ToolAssignmentType, ToolCategory, ToolEventType, ToolIncident,
    ToolStatus, ToolUsageLog,
};
pub use user::{Role, User};
pub use workforce::{
    AuthorizationLevel, AuthorizationStatus, CompetenceAuthorization, CompetenceEvidence,
    CredentialStatus, EvidenceType, Person, PersonCredential, PersonType,
};
