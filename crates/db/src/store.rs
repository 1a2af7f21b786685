//! Transaction control and storage error classification.
//!
//! All orchestrator work runs under REPEATABLE READ. Errors coming back
//! from PostgreSQL are classified once, here, so retry decisions are
//! uniform across repositories.

use std::time::Duration;

use sea_orm::{
    AccessMode, ConnectionTrait, DatabaseTransaction, DbErr, IsolationLevel, SqlErr,
    TransactionTrait,
};

use fintra_core::ledger::error::LedgerError;

/// Classification of a storage error for retry purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Serialization failure, deadlock victim, connection reset, or
    /// statement timeout; safe to retry from the top.
    Retryable,
    /// Unique constraint violation; the caller decides what it means.
    UniqueViolation,
    /// Everything else; never retried.
    Fatal,
}

/// Opens a database transaction at REPEATABLE READ.
///
/// # Errors
///
/// Returns an error if the transaction cannot be started.
pub async fn begin_repeatable_read(
    db: &impl TransactionTrait,
) -> Result<DatabaseTransaction, DbErr> {
    db.begin_with_config(Some(IsolationLevel::RepeatableRead), Some(AccessMode::ReadWrite))
        .await
}

/// Applies the per-statement budget to the current transaction.
///
/// # Errors
///
/// Returns an error if the setting cannot be applied.
pub async fn set_statement_timeout(
    txn: &DatabaseTransaction,
    timeout: Duration,
) -> Result<(), DbErr> {
    let timeout_ms = timeout_millis(timeout);
    txn.execute_unprepared(&format!("SET LOCAL statement_timeout = {timeout_ms}"))
        .await?;
    Ok(())
}

/// Converts a timeout into whole milliseconds, saturating instead of
/// truncating on absurdly long durations.
fn timeout_millis(timeout: Duration) -> u64 {
    u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX)
}

/// Classifies a database error for retry purposes.
#[must_use]
pub fn classify(err: &DbErr) -> ErrorClass {
    if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
        return ErrorClass::UniqueViolation;
    }
    let message = err.to_string().to_lowercase();
    // 40001 = serialization_failure, 40P01 = deadlock_detected,
    // 57014 = query_canceled (statement_timeout).
    let retryable = message.contains("40001")
        || message.contains("40p01")
        || message.contains("57014")
        || message.contains("serialization failure")
        || message.contains("deadlock")
        || message.contains("statement timeout")
        || message.contains("canceling statement due to statement timeout")
        || message.contains("connection reset")
        || message.contains("connection closed")
        || message.contains("broken pipe");
    if retryable {
        ErrorClass::Retryable
    } else {
        ErrorClass::Fatal
    }
}

/// Maps a database error into the ledger taxonomy.
///
/// Unique violations are mapped to [`LedgerError::Database`] here;
/// call sites that can attribute them to an idempotency reference
/// translate them to `DuplicateTransaction` themselves.
#[must_use]
pub fn map_db_err(err: DbErr) -> LedgerError {
    match classify(&err) {
        ErrorClass::Retryable => LedgerError::Transient(err.to_string()),
        ErrorClass::UniqueViolation | ErrorClass::Fatal => LedgerError::Database(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_millis_saturates() {
        assert_eq!(timeout_millis(Duration::from_millis(30_000)), 30_000);
        assert_eq!(timeout_millis(Duration::MAX), u64::MAX);
    }

    #[test]
    fn test_serialization_failure_is_retryable() {
        let err = DbErr::Custom(
            "Execution Error: error returned from database: could not serialize access due to concurrent update (SQLSTATE 40001)".to_string(),
        );
        assert_eq!(classify(&err), ErrorClass::Retryable);
    }

    #[test]
    fn test_deadlock_is_retryable() {
        let err = DbErr::Custom("deadlock detected (SQLSTATE 40P01)".to_string());
        assert_eq!(classify(&err), ErrorClass::Retryable);
    }

    #[test]
    fn test_statement_timeout_is_retryable() {
        let err =
            DbErr::Custom("canceling statement due to statement timeout".to_string());
        assert_eq!(classify(&err), ErrorClass::Retryable);
    }

    #[test]
    fn test_connection_reset_is_retryable() {
        let err = DbErr::Custom("connection reset by peer".to_string());
        assert_eq!(classify(&err), ErrorClass::Retryable);
    }

    #[test]
    fn test_constraint_violation_is_fatal() {
        let err = DbErr::Custom(
            "new row for relation violates check constraint chk_entry_amount_positive".to_string(),
        );
        assert_eq!(classify(&err), ErrorClass::Fatal);
    }

    #[test]
    fn test_map_retryable_to_transient() {
        let err = DbErr::Custom("deadlock detected".to_string());
        assert!(matches!(map_db_err(err), LedgerError::Transient(_)));
    }

    #[test]
    fn test_map_fatal_to_database() {
        let err = DbErr::Custom("relation does not exist".to_string());
        assert!(matches!(map_db_err(err), LedgerError::Database(_)));
    }
}
