//! Financial transaction header and status state machine.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use fintra_shared::types::{CurrencyCode, CustomerId, TenantId, TransactionId, UserId};

/// Business classification of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    /// Funds entering a customer account.
    Deposit,
    /// Funds leaving a customer account.
    Withdrawal,
    /// Customer buys the destination currency.
    CurrencyBuy,
    /// Customer sells the source currency.
    CurrencySell,
}

impl TransactionType {
    /// Returns true for the two exchange types.
    #[must_use]
    pub fn is_exchange(self) -> bool {
        matches!(self, Self::CurrencyBuy | Self::CurrencySell)
    }
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Deposit => "deposit",
            Self::Withdrawal => "withdrawal",
            Self::CurrencyBuy => "currency_buy",
            Self::CurrencySell => "currency_sell",
        };
        write!(f, "{s}")
    }
}

/// Transaction lifecycle status.
///
/// ```text
/// PENDING ──► PROCESSING ──► COMPLETED
///    │            │
///    │            └──► FAILED ──► PENDING (operator retry)
///    └──► CANCELLED
/// COMPLETED ──► REFUNDED (via reversal only)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    /// Header inserted, not yet locked and posted.
    Pending,
    /// Accounts locked, entries being written.
    Processing,
    /// Entries posted and committed. Terminal for the normal flow.
    Completed,
    /// Rejected with no posted entries. Re-openable by an operator.
    Failed,
    /// Cancelled before any entries were posted. Terminal.
    Cancelled,
    /// Reversed after completion. Terminal.
    Refunded,
}

impl TransactionStatus {
    /// Returns true if `next` is a legal transition from this status.
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Processing)
                | (Self::Pending, Self::Cancelled)
                | (Self::Processing, Self::Completed)
                | (Self::Processing, Self::Failed)
                | (Self::Processing, Self::Cancelled)
                | (Self::Completed, Self::Refunded)
                | (Self::Failed, Self::Pending)
        )
    }

    /// Returns true for statuses no automatic flow ever leaves.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Refunded)
    }

    /// Returns true if the transaction may still be cancelled.
    #[must_use]
    pub fn is_cancellable(self) -> bool {
        matches!(self, Self::Pending | Self::Processing)
    }
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
            Self::Refunded => "refunded",
        };
        write!(f, "{s}")
    }
}

/// A financial transaction header as a plain data record.
///
/// Once COMPLETED, all fields other than `metadata` are immutable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinancialTransaction {
    /// Unique identifier.
    pub id: TransactionId,
    /// Human-readable number, unique per tenant (e.g. `TXN-00000117`).
    pub transaction_number: String,
    /// Tenant isolation boundary.
    pub tenant_id: TenantId,
    /// The customer the transaction belongs to.
    pub customer_id: CustomerId,
    /// Business classification.
    pub transaction_type: TransactionType,
    /// Source currency.
    pub from_currency: CurrencyCode,
    /// Destination currency; equals `from_currency` for non-exchanges.
    pub to_currency: CurrencyCode,
    /// Amount leaving the source side; strictly positive.
    pub source_amount: Decimal,
    /// Amount arriving on the destination side; strictly positive.
    pub destination_amount: Decimal,
    /// Exchange rate; 1 for non-exchanges.
    pub exchange_rate: Decimal,
    /// Fee charged, zero when no fee applies.
    pub fee_amount: Decimal,
    /// Currency the fee is charged in.
    pub fee_currency: CurrencyCode,
    /// Lifecycle status.
    pub status: TransactionStatus,
    /// Caller-provided idempotency key, unique per tenant.
    pub reference: Option<String>,
    /// External system reference, unique per tenant.
    pub external_reference: Option<String>,
    /// Free-form description.
    pub description: String,
    /// Opaque metadata map.
    pub metadata: serde_json::Value,
    /// User who created the transaction.
    pub created_by: UserId,
    /// When processing completed.
    pub processed_at: Option<DateTime<Utc>>,
    /// When processing failed.
    pub failed_at: Option<DateTime<Utc>>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Formats a transaction number from the per-tenant sequence.
#[must_use]
pub fn format_transaction_number(sequence: i64) -> String {
    format!("TXN-{sequence:08}")
}
