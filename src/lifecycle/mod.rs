//! State-machine operations over inspections and job orders.
//!
//! Everything here runs inside a transaction: the target row is locked,
//! the caller's expected version is checked, the guarded update bumps the
//! version column, and the audit trail is written before commit. Plain
//! reads and metadata edits live in `crate::database`; this module owns
//! every write that changes status.

pub mod guard;
pub mod inspection;
pub mod maintenance;
pub mod publication;

pub use inspection::{InspectionLifecycle, RecordAnswerRequest};
pub use maintenance::{MaintenanceReport, MaintenanceService};
pub use publication::PublicationLifecycle;
