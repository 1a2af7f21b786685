//! Report data types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::ReportError;

/// Kind of report the engine can generate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportKind {
    /// Per-account debit/credit totals with a balance check.
    TrialBalance,
    /// Transaction counts and volume per type and currency.
    TransactionSummary,
    /// Denormalized balances replayed against posted entries.
    AccountReconciliation,
}

impl ReportKind {
    /// Parses a report kind from its wire name.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::InvalidKind`] for unknown names.
    pub fn parse(s: &str) -> Result<Self, ReportError> {
        match s {
            "trial_balance" => Ok(Self::TrialBalance),
            "transaction_summary" => Ok(Self::TransactionSummary),
            "account_reconciliation" => Ok(Self::AccountReconciliation),
            other => Err(ReportError::InvalidKind(other.to_string())),
        }
    }

    /// Returns the wire name of the kind.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TrialBalance => "trial_balance",
            Self::TransactionSummary => "transaction_summary",
            Self::AccountReconciliation => "account_reconciliation",
        }
    }
}

/// Per-account activity aggregated by the storage layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountActivity {
    /// Account ID.
    pub account_id: Uuid,
    /// Account number.
    pub account_number: String,
    /// Account name.
    pub name: String,
    /// Account type (asset, liability, equity, revenue, expense).
    pub account_type: String,
    /// Account currency.
    pub currency: String,
    /// Total posted debits.
    pub total_debit: Decimal,
    /// Total posted credits.
    pub total_credit: Decimal,
    /// Denormalized balance.
    pub balance: Decimal,
}

/// Trial balance report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrialBalanceReport {
    /// Report type identifier.
    pub report_type: String,
    /// Point in time the report reflects.
    pub as_of: DateTime<Utc>,
    /// Per-account activity.
    pub accounts: Vec<AccountActivity>,
    /// Totals.
    pub totals: TrialBalanceTotals,
}

/// Trial balance totals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrialBalanceTotals {
    /// Total debit.
    pub total_debit: Decimal,
    /// Total credit.
    pub total_credit: Decimal,
    /// Whether debits equal credits within tolerance.
    pub is_balanced: bool,
}

/// Transaction volume aggregated by the storage layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionVolume {
    /// Transaction type.
    pub transaction_type: String,
    /// Transaction status.
    pub status: String,
    /// Currency of the amounts.
    pub currency: String,
    /// Number of transactions.
    pub count: i64,
    /// Sum of transaction amounts.
    pub total_amount: Decimal,
}

/// Transaction summary report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionSummaryReport {
    /// Report type identifier.
    pub report_type: String,
    /// Range start.
    pub period_start: DateTime<Utc>,
    /// Range end.
    pub period_end: DateTime<Utc>,
    /// Per type/status/currency breakdown.
    pub rows: Vec<TransactionVolume>,
    /// Total number of transactions.
    pub total_count: i64,
}

/// One account's reconciliation outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconciliationRow {
    /// Account ID.
    pub account_id: Uuid,
    /// Account number.
    pub account_number: String,
    /// Account currency.
    pub currency: String,
    /// Denormalized balance.
    pub recorded_balance: Decimal,
    /// Balance recomputed from posted entries.
    pub replayed_balance: Decimal,
    /// Recorded minus replayed.
    pub drift: Decimal,
    /// Whether the drift is within tolerance.
    pub is_consistent: bool,
}

/// Account reconciliation report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountReconciliationReport {
    /// Report type identifier.
    pub report_type: String,
    /// Point in time the report reflects.
    pub as_of: DateTime<Utc>,
    /// Per-account outcomes.
    pub rows: Vec<ReconciliationRow>,
    /// Number of accounts with drift beyond tolerance.
    pub inconsistent_count: usize,
}
