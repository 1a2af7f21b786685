//! Ledger error taxonomy.
//!
//! Mirrors the engine's error handling contract: fatal input and business
//! errors, retryable concurrency errors, configuration errors that
//! escalate audit severity, and the invariant violation that aborts a
//! commit.

use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

use crate::audit::AuditSeverity;

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    // ========== Input Errors ==========
    /// Invalid input (missing or non-positive amount, unknown type, ...).
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Source and destination currencies must differ for exchanges.
    #[error("Invalid currency pair: {from} to {to}")]
    CurrencyPairInvalid {
        /// Source currency code.
        from: String,
        /// Destination currency code.
        to: String,
    },

    // ========== Business Errors ==========
    /// Reference conflict; carries the original transaction id so the
    /// caller can treat the call as already-succeeded.
    #[error("Duplicate transaction, original: {original_transaction_id}")]
    DuplicateTransaction {
        /// The transaction already recorded under this reference.
        original_transaction_id: Uuid,
    },

    /// Withdrawal or sell not covered by the available balance.
    #[error("Insufficient funds: available {available}, requested {requested}")]
    InsufficientFunds {
        /// Available balance under the row lock.
        available: Decimal,
        /// Amount the operation required.
        requested: Decimal,
    },

    /// Status transition outside the state machine.
    #[error("Invalid state: cannot move from {from} to {to}")]
    InvalidState {
        /// Current status.
        from: String,
        /// Requested status.
        to: String,
    },

    // ========== Not Found ==========
    /// Account not found.
    #[error("Account not found: {0}")]
    AccountNotFound(Uuid),

    /// Transaction not found.
    #[error("Transaction not found: {0}")]
    TransactionNotFound(Uuid),

    // ========== Configuration Errors ==========
    /// Required system account is missing from the tenant's chart.
    #[error("System account missing: {kind} {currency}")]
    SystemAccountMissing {
        /// System account kind.
        kind: String,
        /// Currency code.
        currency: String,
    },

    // ========== Invariant Violations ==========
    /// Debits and credits do not balance inside the commit.
    #[error("Double-entry violation for transaction {transaction_id}: difference {difference}")]
    DoubleEntryViolation {
        /// The offending transaction.
        transaction_id: Uuid,
        /// Signed debit-minus-credit difference that exceeded tolerance.
        difference: Decimal,
    },

    // ========== Concurrency Errors ==========
    /// Account version moved under us; eligible for retry.
    #[error("Optimistic conflict on account {account_id}: expected version {expected}, found {actual}")]
    OptimisticConflict {
        /// The account whose version moved.
        account_id: Uuid,
        /// Version the caller read.
        expected: i64,
        /// Version currently on the row.
        actual: i64,
    },

    /// Serialization failure, deadlock victim, or transient connection
    /// error classified by the store.
    #[error("Transient storage error: {0}")]
    Transient(String),

    /// Deadline elapsed mid-transaction; never retried to avoid doubled
    /// side effects.
    #[error("Deadline exceeded")]
    DeadlineExceeded,

    // ========== Degraded ==========
    /// Audit write failed after a successful commit; surfaced via
    /// logging/metrics, never via the caller's error path.
    #[error("Audit write failure: {0}")]
    AuditWriteFailure(String),

    // ========== Storage ==========
    /// Non-transient database error.
    #[error("Database error: {0}")]
    Database(String),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl LedgerError {
    /// Returns the stable error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "INVALID_INPUT",
            Self::CurrencyPairInvalid { .. } => "CURRENCY_PAIR_INVALID",
            Self::DuplicateTransaction { .. } => "DUPLICATE_TRANSACTION",
            Self::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            Self::InvalidState { .. } => "INVALID_STATE",
            Self::AccountNotFound(_) => "ACCOUNT_NOT_FOUND",
            Self::TransactionNotFound(_) => "TRANSACTION_NOT_FOUND",
            Self::SystemAccountMissing { .. } => "SYSTEM_ACCOUNT_MISSING",
            Self::DoubleEntryViolation { .. } => "DOUBLE_ENTRY_VIOLATION",
            Self::OptimisticConflict { .. } => "OPTIMISTIC_CONFLICT",
            Self::Transient(_) => "TRANSIENT_ERROR",
            Self::DeadlineExceeded => "DEADLINE_EXCEEDED",
            Self::AuditWriteFailure(_) => "AUDIT_WRITE_FAILURE",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Returns true if the orchestrator's retry loop may re-attempt.
    ///
    /// Only concurrency-class errors qualify; a deadline mid-transaction
    /// is fatal even though its cause may have been transient.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::OptimisticConflict { .. } | Self::Transient(_))
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self {
            Self::InvalidInput(_) | Self::CurrencyPairInvalid { .. } => 400,
            Self::AccountNotFound(_) | Self::TransactionNotFound(_) => 404,
            Self::DuplicateTransaction { .. } | Self::OptimisticConflict { .. } => 409,
            Self::InsufficientFunds { .. } | Self::InvalidState { .. } => 422,
            Self::SystemAccountMissing { .. }
            | Self::DoubleEntryViolation { .. }
            | Self::Transient(_)
            | Self::DeadlineExceeded
            | Self::AuditWriteFailure(_)
            | Self::Database(_)
            | Self::Internal(_) => 500,
        }
    }

    /// Audit severity attached when this error is recorded.
    #[must_use]
    pub fn audit_severity(&self) -> AuditSeverity {
        match self {
            Self::SystemAccountMissing { .. } | Self::DoubleEntryViolation { .. } => {
                AuditSeverity::Critical
            }
            Self::DuplicateTransaction { .. } => AuditSeverity::Medium,
            Self::InsufficientFunds { .. } | Self::InvalidState { .. } => AuditSeverity::Medium,
            _ => AuditSeverity::Low,
        }
    }
}
