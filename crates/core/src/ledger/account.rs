//! Account domain types and balance sign rules.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use fintra_shared::types::{AccountId, CurrencyCode, CustomerId, TenantId, UserId};

use super::entry::EntryType;

/// Account classification in the chart of accounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountType {
    /// Asset account (customer wallets, currency pools).
    Asset,
    /// Liability account (customer deposits owed back).
    Liability,
    /// Equity account (exchange capital, retained earnings).
    Equity,
    /// Revenue account (exchange fees).
    Revenue,
    /// Expense account (operational, banking, technology).
    Expense,
}

impl AccountType {
    /// Returns true for debit-normal accounts: a DEBIT increases the balance.
    #[must_use]
    pub fn is_debit_normal(self) -> bool {
        matches!(self, Self::Asset | Self::Expense)
    }

    /// Calculates the signed balance change for one entry.
    ///
    /// Asset/Expense increase on DEBIT and decrease on CREDIT;
    /// Liability/Equity/Revenue the inverse.
    #[must_use]
    pub fn balance_change(self, entry_type: EntryType, amount: Decimal) -> Decimal {
        let debit_sign = if self.is_debit_normal() {
            Decimal::ONE
        } else {
            -Decimal::ONE
        };
        match entry_type {
            EntryType::Debit => amount * debit_sign,
            EntryType::Credit => -amount * debit_sign,
        }
    }

    /// Short prefix used when assigning account numbers.
    #[must_use]
    pub const fn number_prefix(self) -> &'static str {
        match self {
            Self::Asset => "1",
            Self::Liability => "2",
            Self::Equity => "3",
            Self::Revenue => "4",
            Self::Expense => "5",
        }
    }
}

impl std::fmt::Display for AccountType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Asset => "asset",
            Self::Liability => "liability",
            Self::Equity => "equity",
            Self::Revenue => "revenue",
            Self::Expense => "expense",
        };
        write!(f, "{s}")
    }
}

/// Canonical per-tenant system account kinds the orchestrator resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemAccountKind {
    /// Per-currency ASSET pool representing custody of a currency.
    Pool,
    /// Per-currency LIABILITY for customer deposits.
    Liability,
    /// Per-currency REVENUE account for exchange fees.
    FeeRevenue,
}

impl SystemAccountKind {
    /// The account type a system account of this kind carries.
    #[must_use]
    pub const fn account_type(self) -> AccountType {
        match self {
            Self::Pool => AccountType::Asset,
            Self::Liability => AccountType::Liability,
            Self::FeeRevenue => AccountType::Revenue,
        }
    }

    /// Human-readable account name for the bootstrap chart.
    #[must_use]
    pub fn account_name(self, currency: &CurrencyCode) -> String {
        match self {
            Self::Pool => format!("Customer Pool {currency}"),
            Self::Liability => format!("Customer Deposits {currency}"),
            Self::FeeRevenue => format!("Exchange Fees {currency}"),
        }
    }
}

/// A ledger account as a plain data record.
///
/// Invariants live in the orchestrator and invariant checker, not here;
/// this is the repository's row shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    /// Unique identifier.
    pub id: AccountId,
    /// Tenant isolation boundary.
    pub tenant_id: TenantId,
    /// Owning customer; `None` marks a system account.
    pub customer_id: Option<CustomerId>,
    /// Unique per-tenant account number.
    pub account_number: String,
    /// Account classification.
    pub account_type: AccountType,
    /// Account display name.
    pub name: String,
    /// Currency this account is denominated in.
    pub currency: CurrencyCode,
    /// Denormalized balance; authoritative together with posted entries.
    pub balance: Decimal,
    /// `balance - blocked_balance`.
    pub available_balance: Decimal,
    /// Amount blocked by holds; never negative.
    pub blocked_balance: Decimal,
    /// Monotonic counter; strictly increases on every mutation.
    pub version: i64,
    /// Active flag; accounts are deactivated, never deleted.
    pub is_active: bool,
    /// User who created the account.
    pub created_by: UserId,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Formats an account number from the per-tenant, per-type counter.
///
/// Numbers look like `1-00000042`: type prefix, then a zero-padded
/// monotonically increasing sequence.
#[must_use]
pub fn format_account_number(account_type: AccountType, sequence: i64) -> String {
    format!("{}-{:08}", account_type.number_prefix(), sequence)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_debit_normal_types() {
        assert!(AccountType::Asset.is_debit_normal());
        assert!(AccountType::Expense.is_debit_normal());
        assert!(!AccountType::Liability.is_debit_normal());
        assert!(!AccountType::Equity.is_debit_normal());
        assert!(!AccountType::Revenue.is_debit_normal());
    }

    #[test]
    fn test_balance_change_asset() {
        assert_eq!(
            AccountType::Asset.balance_change(EntryType::Debit, dec!(100)),
            dec!(100)
        );
        assert_eq!(
            AccountType::Asset.balance_change(EntryType::Credit, dec!(100)),
            dec!(-100)
        );
    }

    #[test]
    fn test_balance_change_liability() {
        assert_eq!(
            AccountType::Liability.balance_change(EntryType::Debit, dec!(100)),
            dec!(-100)
        );
        assert_eq!(
            AccountType::Liability.balance_change(EntryType::Credit, dec!(100)),
            dec!(100)
        );
    }

    #[test]
    fn test_balance_change_revenue() {
        assert_eq!(
            AccountType::Revenue.balance_change(EntryType::Credit, dec!(5)),
            dec!(5)
        );
    }

    #[test]
    fn test_system_account_kinds() {
        assert_eq!(SystemAccountKind::Pool.account_type(), AccountType::Asset);
        assert_eq!(
            SystemAccountKind::Liability.account_type(),
            AccountType::Liability
        );
        assert_eq!(
            SystemAccountKind::FeeRevenue.account_type(),
            AccountType::Revenue
        );
    }

    #[test]
    fn test_system_account_names() {
        let usd = fintra_shared::types::CurrencyCode::parse("usd").unwrap();
        assert_eq!(
            SystemAccountKind::Liability.account_name(&usd),
            "Customer Deposits USD"
        );
    }

    #[test]
    fn test_account_number_format() {
        assert_eq!(
            format_account_number(AccountType::Asset, 42),
            "1-00000042"
        );
        assert_eq!(
            format_account_number(AccountType::Revenue, 1),
            "4-00000001"
        );
    }
}
