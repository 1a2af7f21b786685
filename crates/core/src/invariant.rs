//! Ledger invariant checks.
//!
//! The orchestrator runs [`verify_double_entry`] inside every database
//! transaction before commit; the reconciliation and balance checks
//! back the reporting surface and the test suite.

use std::collections::HashMap;

use rust_decimal::Decimal;

use fintra_shared::types::TransactionId;

use crate::ledger::account::Account;
use crate::ledger::entry::LedgerEntry;
use crate::ledger::error::LedgerError;
use crate::ledger::posting::PlannedEntry;

/// Comparison tolerance for decimal sums, 10⁻⁸.
pub const TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 8);

/// Returns true when `difference` is within [`TOLERANCE`] of zero.
#[must_use]
pub fn within_tolerance(difference: Decimal) -> bool {
    difference.abs() <= TOLERANCE
}

/// Verifies that a posting plan balances per currency.
///
/// Called before the plan is persisted; the transaction header already
/// exists so violations carry its id.
///
/// # Errors
///
/// Returns [`LedgerError::DoubleEntryViolation`] with the first
/// out-of-balance difference found.
pub fn verify_plan(
    transaction_id: TransactionId,
    entries: &[PlannedEntry],
) -> Result<(), LedgerError> {
    verify_signed_sums(
        transaction_id,
        entries
            .iter()
            .map(|e| (e.currency.to_string(), e.signed_amount())),
    )
}

/// Verifies that the posted entries of one transaction balance per
/// currency, Σ DEBIT − Σ CREDIT = 0 within [`TOLERANCE`].
///
/// # Errors
///
/// Returns [`LedgerError::DoubleEntryViolation`] with the first
/// out-of-balance difference found.
pub fn verify_double_entry(
    transaction_id: TransactionId,
    entries: &[LedgerEntry],
) -> Result<(), LedgerError> {
    verify_signed_sums(
        transaction_id,
        entries
            .iter()
            .map(|e| (e.currency.to_string(), e.signed_amount())),
    )
}

fn verify_signed_sums(
    transaction_id: TransactionId,
    signed: impl Iterator<Item = (String, Decimal)>,
) -> Result<(), LedgerError> {
    let mut sums: HashMap<String, Decimal> = HashMap::new();
    for (currency, amount) in signed {
        *sums.entry(currency).or_default() += amount;
    }
    for difference in sums.into_values() {
        if !within_tolerance(difference) {
            return Err(LedgerError::DoubleEntryViolation {
                transaction_id: transaction_id.into_inner(),
                difference,
            });
        }
    }
    Ok(())
}

/// Outcome of replaying an account's entries against its denormalized
/// balance.
#[derive(Debug, Clone)]
pub struct Reconciliation {
    /// Balance recomputed from posted entries.
    pub replayed_balance: Decimal,
    /// The denormalized `Account.balance`.
    pub recorded_balance: Decimal,
    /// `recorded_balance - replayed_balance`.
    pub drift: Decimal,
}

impl Reconciliation {
    /// True when the drift is within [`TOLERANCE`].
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        within_tolerance(self.drift)
    }
}

/// Replays the posted entries for one account and compares the result
/// with the denormalized balance.
///
/// Reversed entries stay in the replay; their reversal entries offset
/// them.
#[must_use]
pub fn reconcile_account(account: &Account, entries: &[LedgerEntry]) -> Reconciliation {
    let replayed_balance = entries
        .iter()
        .filter(|e| e.account_id == account.id && e.is_posted)
        .map(|e| account.account_type.balance_change(e.entry_type, e.amount))
        .sum();
    Reconciliation {
        replayed_balance,
        recorded_balance: account.balance,
        drift: account.balance - replayed_balance,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    use fintra_shared::types::{
        AccountId, CurrencyCode, LedgerEntryId, TenantId, UserId,
    };

    use crate::ledger::account::AccountType;
    use crate::ledger::entry::EntryType;

    fn entry(
        transaction_id: TransactionId,
        account_id: AccountId,
        entry_type: EntryType,
        amount: Decimal,
        currency: &str,
    ) -> LedgerEntry {
        LedgerEntry {
            id: LedgerEntryId::new(),
            entry_number: 1,
            transaction_id,
            account_id,
            entry_type,
            amount,
            currency: CurrencyCode::parse(currency).unwrap(),
            posting_date: Utc::now(),
            description: "test".to_string(),
            is_posted: true,
            is_reversed: false,
            reversed_by_entry_id: None,
            tenant_id: TenantId::new(),
            created_by: UserId::new(),
        }
    }

    #[test]
    fn test_balanced_entries_pass() {
        let tx = TransactionId::new();
        let a = AccountId::new();
        let entries = vec![
            entry(tx, a, EntryType::Debit, dec!(100), "USD"),
            entry(tx, a, EntryType::Credit, dec!(100), "USD"),
            entry(tx, a, EntryType::Debit, dec!(85), "EUR"),
            entry(tx, a, EntryType::Credit, dec!(85), "EUR"),
        ];
        assert!(verify_double_entry(tx, &entries).is_ok());
    }

    #[test]
    fn test_unbalanced_entries_fail() {
        let tx = TransactionId::new();
        let a = AccountId::new();
        let entries = vec![
            entry(tx, a, EntryType::Debit, dec!(100), "USD"),
            entry(tx, a, EntryType::Credit, dec!(99.99), "USD"),
        ];
        let err = verify_double_entry(tx, &entries).unwrap_err();
        match err {
            LedgerError::DoubleEntryViolation { difference, .. } => {
                assert_eq!(difference, dec!(0.01));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_cross_currency_mismatch_fails() {
        // Balanced in aggregate but not per currency.
        let tx = TransactionId::new();
        let a = AccountId::new();
        let entries = vec![
            entry(tx, a, EntryType::Debit, dec!(100), "USD"),
            entry(tx, a, EntryType::Credit, dec!(100), "EUR"),
        ];
        assert!(verify_double_entry(tx, &entries).is_err());
    }

    #[test]
    fn test_tolerance_boundary() {
        assert!(within_tolerance(dec!(0.00000001)));
        assert!(within_tolerance(dec!(-0.00000001)));
        assert!(!within_tolerance(dec!(0.000000011)));
    }

    #[test]
    fn test_reconcile_account() {
        let account_id = AccountId::new();
        let account = Account {
            id: account_id,
            tenant_id: TenantId::new(),
            customer_id: Some(fintra_shared::types::CustomerId::new()),
            account_number: "1-00000001".to_string(),
            account_type: AccountType::Asset,
            name: "Wallet USD".to_string(),
            currency: CurrencyCode::parse("USD").unwrap(),
            balance: dec!(750),
            available_balance: dec!(750),
            blocked_balance: Decimal::ZERO,
            version: 2,
            is_active: true,
            created_by: UserId::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let tx = TransactionId::new();
        let entries = vec![
            entry(tx, account_id, EntryType::Debit, dec!(1000), "USD"),
            entry(tx, account_id, EntryType::Credit, dec!(250), "USD"),
            // Entries against other accounts are ignored.
            entry(tx, AccountId::new(), EntryType::Debit, dec!(42), "USD"),
        ];

        let result = reconcile_account(&account, &entries);
        assert_eq!(result.replayed_balance, dec!(750));
        assert!(result.is_consistent());
    }

    #[test]
    fn test_reconcile_detects_drift() {
        let account_id = AccountId::new();
        let account = Account {
            id: account_id,
            tenant_id: TenantId::new(),
            customer_id: None,
            account_number: "2-00000001".to_string(),
            account_type: AccountType::Liability,
            name: "Customer Deposits USD".to_string(),
            currency: CurrencyCode::parse("USD").unwrap(),
            balance: dec!(1000),
            available_balance: dec!(1000),
            blocked_balance: Decimal::ZERO,
            version: 1,
            is_active: true,
            created_by: UserId::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let tx = TransactionId::new();
        let entries = vec![entry(tx, account_id, EntryType::Credit, dec!(900), "USD")];

        let result = reconcile_account(&account, &entries);
        assert_eq!(result.drift, dec!(100));
        assert!(!result.is_consistent());
    }
}
