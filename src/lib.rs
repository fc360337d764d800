//! Inspecta - inspection operations backend
//!
//! Everything an equipment inspection body runs on: clients and their
//! equipment register, job orders with line items, checklist-driven
//! inspections with a role-gated approval workflow, certificates and
//! field reports rendered by a background worker, QR stickers, the tool
//! room and inspector competence records.
//!
//! ## Architecture
//!
//! State lives in Postgres; every table is owned by one service in
//! [`database`]. Stateful transitions (assign, start, submit, approve,
//! reject, publish) go through [`lifecycle`], which locks the row, checks
//! the caller's last-seen version and writes the audit row in the same
//! transaction. Document generation is queued in [`tasks`] and executed
//! by the polling worker, which renders through [`render`], stores bytes
//! through [`storage`] and delivers through [`notify`]. The HTTP surface
//! in [`api`] stays thin over all of it.

// Core error handling
pub mod error;

// Persistent state: one service per table family
pub mod database;
pub mod models;

// Checklist templates loaded from YAML
pub mod checklist;

// Stateful transitions with role guards, version checks and audit
pub mod lifecycle;

// Background document generation
pub mod notify;
pub mod render;
pub mod storage;
pub mod tasks;

// HTTP surface
pub mod api;

pub use error::{LifecycleError, LifecycleResult};
