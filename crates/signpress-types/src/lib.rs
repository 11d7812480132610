//! Shared data types for the signpress document-signing stack
//!
//! These are the plain-data shapes exchanged between the storage layer,
//! the finalization engine, and the audit writer: signature mark records,
//! document lifecycle states, and the audit event model.

pub mod audit;
pub mod document;
pub mod mark;

pub use audit::{AuditAction, AuditEvent, AuditTrail, EventSink};
pub use document::{DocumentRecord, DocumentStatus};
pub use mark::{SignatureKind, SignatureMark};
