//! Ledger entry domain types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use fintra_shared::types::{AccountId, CurrencyCode, LedgerEntryId, TenantId, TransactionId, UserId};

/// Type of ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    /// Debit entry (increases assets/expenses, decreases liabilities/equity/revenue).
    Debit,
    /// Credit entry (decreases assets/expenses, increases liabilities/equity/revenue).
    Credit,
}

impl EntryType {
    /// Returns the opposite entry type, used for reversals.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Debit => Self::Credit,
            Self::Credit => Self::Debit,
        }
    }
}

/// A single posted ledger entry.
///
/// Posted entries are immutable except for the reversal flag and its
/// back-link; corrections are new entries of opposite type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Unique identifier.
    pub id: LedgerEntryId,
    /// Position within the owning transaction, starting at 1.
    pub entry_number: i32,
    /// The transaction this entry belongs to.
    pub transaction_id: TransactionId,
    /// The account affected by this entry.
    pub account_id: AccountId,
    /// Whether this is a debit or credit.
    pub entry_type: EntryType,
    /// Amount; always strictly positive.
    pub amount: Decimal,
    /// Currency of the amount.
    pub currency: CurrencyCode,
    /// Posting date.
    pub posting_date: DateTime<Utc>,
    /// Line-item description.
    pub description: String,
    /// Whether the entry has been posted.
    pub is_posted: bool,
    /// Whether the entry has been reversed.
    pub is_reversed: bool,
    /// The reversal entry that cancels this one, if any.
    pub reversed_by_entry_id: Option<LedgerEntryId>,
    /// Tenant isolation boundary.
    pub tenant_id: TenantId,
    /// User who created the entry.
    pub created_by: UserId,
}

impl LedgerEntry {
    /// Returns the signed amount (positive for debit, negative for credit).
    #[must_use]
    pub fn signed_amount(&self) -> Decimal {
        match self.entry_type {
            EntryType::Debit => self.amount,
            EntryType::Credit => -self.amount,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn entry(entry_type: EntryType, amount: Decimal) -> LedgerEntry {
        LedgerEntry {
            id: LedgerEntryId::new(),
            entry_number: 1,
            transaction_id: TransactionId::new(),
            account_id: AccountId::new(),
            entry_type,
            amount,
            currency: CurrencyCode::parse("USD").unwrap(),
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
    fn test_signed_amount() {
        assert_eq!(entry(EntryType::Debit, dec!(100)).signed_amount(), dec!(100));
        assert_eq!(
            entry(EntryType::Credit, dec!(100)).signed_amount(),
            dec!(-100)
        );
    }

    #[test]
    fn test_opposite() {
        assert_eq!(EntryType::Debit.opposite(), EntryType::Credit);
        assert_eq!(EntryType::Credit.opposite(), EntryType::Debit);
    }
}
