//! Report generation service.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::invariant::within_tolerance;

use super::types::{
    AccountActivity, AccountReconciliationReport, ReconciliationRow, TransactionSummaryReport,
    TransactionVolume, TrialBalanceReport, TrialBalanceTotals,
};

/// Service for generating financial reports.
pub struct ReportService;

impl ReportService {
    /// Generates a trial balance report from per-account activity.
    ///
    /// The report is balanced iff total debits equal total credits
    /// within the ledger tolerance.
    #[must_use]
    pub fn generate_trial_balance(
        as_of: DateTime<Utc>,
        accounts: Vec<AccountActivity>,
    ) -> TrialBalanceReport {
        let total_debit: Decimal = accounts.iter().map(|a| a.total_debit).sum();
        let total_credit: Decimal = accounts.iter().map(|a| a.total_credit).sum();

        TrialBalanceReport {
            report_type: "trial_balance".to_string(),
            as_of,
            accounts,
            totals: TrialBalanceTotals {
                total_debit,
                total_credit,
                is_balanced: within_tolerance(total_debit - total_credit),
            },
        }
    }

    /// Generates a transaction summary from aggregated volumes.
    #[must_use]
    pub fn generate_transaction_summary(
        period_start: DateTime<Utc>,
        period_end: DateTime<Utc>,
        rows: Vec<TransactionVolume>,
    ) -> TransactionSummaryReport {
        let total_count = rows.iter().map(|r| r.count).sum();

        TransactionSummaryReport {
            report_type: "transaction_summary".to_string(),
            period_start,
            period_end,
            rows,
            total_count,
        }
    }

    /// Generates a reconciliation report from per-account outcomes.
    #[must_use]
    pub fn generate_account_reconciliation(
        as_of: DateTime<Utc>,
        rows: Vec<ReconciliationRow>,
    ) -> AccountReconciliationReport {
        let inconsistent_count = rows.iter().filter(|r| !r.is_consistent).count();

        AccountReconciliationReport {
            report_type: "account_reconciliation".to_string(),
            as_of,
            rows,
            inconsistent_count,
        }
    }
}
