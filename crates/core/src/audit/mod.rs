//! Append-only audit trail domain types.
//!
//! Audit records are written after the main database transaction
//! commits for success events, and on a separate connection for
//! failure events, so audit durability never gates financial
//! durability.

pub mod types;

pub use types::{AuditAction, AuditEvent, AuditMetadata, AuditRecord, AuditSeverity};
