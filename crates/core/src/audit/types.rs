//! Audit trail types for transaction lifecycle events.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use fintra_shared::types::{AuditId, TenantId, TransactionId, UserId};

/// Severity of an audit event.
///
/// Ordered from least to most severe so events can be escalated with
/// `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditSeverity {
    /// Routine lifecycle event.
    Low,
    /// Noteworthy event such as a rejected duplicate.
    Medium,
    /// High-value movement or a manual intervention.
    High,
    /// Integrity violation or configuration failure.
    Critical,
}

impl AuditSeverity {
    /// Returns the string representation of the severity.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }

    /// Parses a severity from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            "critical" => Some(Self::Critical),
            _ => None,
        }
    }

    /// Escalates to HIGH when `amount` exceeds the configured
    /// high-value threshold; lower severities are promoted, CRITICAL is
    /// never demoted.
    #[must_use]
    pub fn escalate_for_amount(self, amount: Decimal, threshold: Decimal) -> Self {
        if amount > threshold {
            self.max(Self::High)
        } else {
            self
        }
    }
}

impl fmt::Display for AuditSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What happened, one variant per lifecycle step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    /// Transaction header created in PENDING.
    TransactionCreated,
    /// Transaction moved to PROCESSING.
    TransactionProcessing,
    /// Transaction completed and posted.
    TransactionProcessed,
    /// Transaction failed and rolled back.
    TransactionFailed,
    /// Transaction cancelled before posting.
    TransactionCancelled,
    /// Completed transaction reversed.
    TransactionRefunded,
    /// A duplicate reference was rejected.
    DuplicateRejected,
    /// A transient failure triggered a retry.
    RetryAttempted,
    /// Double-entry or balance verification failed.
    IntegrityViolation,
    /// Customer or system account created.
    AccountCreated,
    /// Account deactivated.
    AccountDeactivated,
    /// System accounts bootstrapped for a tenant/currency.
    SystemBootstrap,
}

impl AuditAction {
    /// Returns the string representation of the action.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TransactionCreated => "TRANSACTION_CREATED",
            Self::TransactionProcessing => "TRANSACTION_PROCESSING",
            Self::TransactionProcessed => "TRANSACTION_PROCESSED",
            Self::TransactionFailed => "TRANSACTION_FAILED",
            Self::TransactionCancelled => "TRANSACTION_CANCELLED",
            Self::TransactionRefunded => "TRANSACTION_REFUNDED",
            Self::DuplicateRejected => "DUPLICATE_REJECTED",
            Self::RetryAttempted => "RETRY_ATTEMPTED",
            Self::IntegrityViolation => "INTEGRITY_VIOLATION",
            Self::AccountCreated => "ACCOUNT_CREATED",
            Self::AccountDeactivated => "ACCOUNT_DEACTIVATED",
            Self::SystemBootstrap => "SYSTEM_BOOTSTRAP",
        }
    }

    /// Baseline severity for the action before amount escalation.
    #[must_use]
    pub fn base_severity(&self) -> AuditSeverity {
        match self {
            Self::IntegrityViolation => AuditSeverity::Critical,
            Self::TransactionCancelled | Self::TransactionRefunded | Self::SystemBootstrap => {
                AuditSeverity::High
            }
            Self::DuplicateRejected | Self::RetryAttempted | Self::TransactionFailed => {
                AuditSeverity::Medium
            }
            _ => AuditSeverity::Low,
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Request-scoped context attached to an audit record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuditMetadata {
    /// Client IP address, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    /// Client user agent, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    /// Session identifier, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// Orchestrator processing time for the event.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing_time_ms: Option<u64>,
}

/// An audit event produced by the orchestrator, not yet persisted.
#[derive(Debug, Clone)]
pub struct AuditEvent {
    /// Tenant scope.
    pub tenant_id: TenantId,
    /// Acting user.
    pub user_id: UserId,
    /// What happened.
    pub action: AuditAction,
    /// Kind of resource affected, e.g. `"transaction"` or `"account"`.
    pub resource_type: String,
    /// Identifier of the affected resource.
    pub resource_id: String,
    /// Related transaction, when the event is transaction-scoped.
    pub transaction_id: Option<TransactionId>,
    /// Human-readable summary.
    pub description: String,
    /// State before the event, when applicable.
    pub old_values: Option<serde_json::Value>,
    /// State after the event, when applicable.
    pub new_values: Option<serde_json::Value>,
    /// Request-scoped context.
    pub metadata: AuditMetadata,
    /// Computed severity.
    pub severity: AuditSeverity,
}

impl AuditEvent {
    /// Builds a transaction-scoped event with the action's baseline
    /// severity, escalated for the amount.
    #[must_use]
    pub fn for_transaction(
        tenant_id: TenantId,
        user_id: UserId,
        action: AuditAction,
        transaction_id: TransactionId,
        description: impl Into<String>,
        amount: Decimal,
        high_value_threshold: Decimal,
    ) -> Self {
        Self {
            tenant_id,
            user_id,
            action,
            resource_type: "transaction".to_string(),
            resource_id: transaction_id.to_string(),
            transaction_id: Some(transaction_id),
            description: description.into(),
            old_values: None,
            new_values: None,
            metadata: AuditMetadata::default(),
            severity: action
                .base_severity()
                .escalate_for_amount(amount, high_value_threshold),
        }
    }

    /// Attaches before/after state snapshots.
    #[must_use]
    pub fn with_values(
        mut self,
        old_values: Option<serde_json::Value>,
        new_values: Option<serde_json::Value>,
    ) -> Self {
        self.old_values = old_values;
        self.new_values = new_values;
        self
    }

    /// Attaches request-scoped metadata.
    #[must_use]
    pub fn with_metadata(mut self, metadata: AuditMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Overrides the computed severity.
    #[must_use]
    pub fn with_severity(mut self, severity: AuditSeverity) -> Self {
        self.severity = severity;
        self
    }
}

/// A persisted audit record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    /// Unique identifier.
    pub id: AuditId,
    /// Tenant scope.
    pub tenant_id: TenantId,
    /// Acting user.
    pub user_id: UserId,
    /// What happened.
    pub action: AuditAction,
    /// Kind of resource affected.
    pub resource_type: String,
    /// Identifier of the affected resource.
    pub resource_id: String,
    /// Related transaction, when transaction-scoped.
    pub transaction_id: Option<TransactionId>,
    /// Human-readable summary.
    pub description: String,
    /// State before the event.
    pub old_values: Option<serde_json::Value>,
    /// State after the event.
    pub new_values: Option<serde_json::Value>,
    /// Request-scoped context.
    pub metadata: AuditMetadata,
    /// Severity of the event.
    pub severity: AuditSeverity,
    /// When the event happened.
    pub event_time: DateTime<Utc>,
}
