//! Posting planner: turns business events into balanced debit/credit pairs.
//!
//! The planner is pure; it works on already-resolved accounts and
//! produces the ordered entry list the ledger writer persists. Entry
//! order defines the per-transaction `entry_number` sequence.

use rust_decimal::Decimal;

use fintra_shared::types::{AccountId, CurrencyCode};

use super::account::AccountType;
use super::entry::{EntryType, LedgerEntry};
use super::error::LedgerError;

/// An account resolved for posting.
#[derive(Debug, Clone)]
pub struct PostingAccount {
    /// The account ID.
    pub id: AccountId,
    /// The account's classification, for balance sign rules.
    pub account_type: AccountType,
    /// The account's currency.
    pub currency: CurrencyCode,
}

/// One entry the ledger writer will persist; `entry_number` is the
/// position in the plan, starting at 1.
#[derive(Debug, Clone)]
pub struct PlannedEntry {
    /// The account to post against.
    pub account_id: AccountId,
    /// The account's classification.
    pub account_type: AccountType,
    /// Debit or credit.
    pub entry_type: EntryType,
    /// Amount; strictly positive.
    pub amount: Decimal,
    /// Currency of the amount.
    pub currency: CurrencyCode,
    /// Line-item description.
    pub description: String,
}

impl PlannedEntry {
    /// Signed amount: positive for debit, negative for credit.
    #[must_use]
    pub fn signed_amount(&self) -> Decimal {
        match self.entry_type {
            EntryType::Debit => self.amount,
            EntryType::Credit => -self.amount,
        }
    }

    /// The signed change this entry applies to its account's balance.
    #[must_use]
    pub fn balance_change(&self) -> Decimal {
        self.account_type.balance_change(self.entry_type, self.amount)
    }
}

/// Accounts resolved for an exchange posting.
#[derive(Debug, Clone)]
pub struct ExchangeAccounts {
    /// Customer account in the source currency.
    pub customer_source: PostingAccount,
    /// System pool in the source currency.
    pub source_pool: PostingAccount,
    /// Customer account in the destination currency.
    pub customer_destination: PostingAccount,
    /// System pool in the destination currency.
    pub destination_pool: PostingAccount,
    /// Fee revenue account in the fee currency; required when a fee is
    /// charged.
    pub fee_revenue: Option<PostingAccount>,
}

/// Amounts for an exchange posting, already split per side.
#[derive(Debug, Clone, Copy)]
pub struct ExchangeAmounts {
    /// Amount leaving the customer source account, fee included when the
    /// fee is charged in the source currency.
    pub source_total: Decimal,
    /// Amount arriving on the customer destination account, net of a
    /// destination-side fee.
    pub destination_total: Decimal,
    /// Fee amount; zero when no fee applies.
    pub fee: Decimal,
    /// True when the fee is charged in the source currency.
    pub fee_on_source_side: bool,
}

/// Stateless service producing balanced posting plans.
pub struct PostingPlanner;

impl PostingPlanner {
    /// Deposit: customer ASSET debit, Customer Deposits LIABILITY credit.
    ///
    /// # Errors
    ///
    /// Fails when the pair is malformed (non-positive amount, identical
    /// accounts, currency mismatch).
    pub fn plan_deposit(
        customer: &PostingAccount,
        deposit_liability: &PostingAccount,
        amount: Decimal,
        description: &str,
    ) -> Result<Vec<PlannedEntry>, LedgerError> {
        Self::pair(customer, deposit_liability, amount, description)
    }

    /// Withdrawal: the reverse pair of a deposit.
    ///
    /// # Errors
    ///
    /// Fails when the pair is malformed.
    pub fn plan_withdrawal(
        customer: &PostingAccount,
        deposit_liability: &PostingAccount,
        amount: Decimal,
        description: &str,
    ) -> Result<Vec<PlannedEntry>, LedgerError> {
        Self::pair(deposit_liability, customer, amount, description)
    }

    /// Currency exchange: two balanced pairs (customer source ↔ source
    /// pool, customer destination ↔ destination pool) plus, when a fee is
    /// charged, a fee pair crediting Fee Revenue against the pool on the
    /// fee's side.
    ///
    /// The customer-side amounts already carry the fee (`source_total`
    /// includes a source-side fee, `destination_total` is net of a
    /// destination-side fee), so the customer's balance moves by exactly
    /// the gross amount while Fee Revenue receives the fee as a credit.
    ///
    /// # Errors
    ///
    /// Fails when any pair is malformed or a fee is charged without a
    /// fee revenue account.
    pub fn plan_exchange(
        accounts: &ExchangeAccounts,
        amounts: ExchangeAmounts,
        description: &str,
    ) -> Result<Vec<PlannedEntry>, LedgerError> {
        let mut entries = Self::pair(
            &accounts.source_pool,
            &accounts.customer_source,
            amounts.source_total,
            description,
        )?;
        entries.extend(Self::pair(
            &accounts.customer_destination,
            &accounts.destination_pool,
            amounts.destination_total,
            description,
        )?);

        if amounts.fee > Decimal::ZERO {
            let Some(fee_revenue) = &accounts.fee_revenue else {
                return Err(LedgerError::Internal(
                    "fee charged without a fee revenue account".to_string(),
                ));
            };
            let fee_pool = if amounts.fee_on_source_side {
                &accounts.source_pool
            } else {
                &accounts.destination_pool
            };
            entries.extend(Self::pair(
                fee_pool,
                fee_revenue,
                amounts.fee,
                &format!("{description} (fee)"),
            )?);
        }

        Ok(entries)
    }

    /// Reversal plan for posted entries: same accounts and amounts with
    /// the entry types flipped, preserving the original order. The caller
    /// supplies the account classification it resolved for each entry.
    #[must_use]
    pub fn plan_reversal(
        original: &[(&LedgerEntry, AccountType)],
        reason: &str,
    ) -> Vec<PlannedEntry> {
        original
            .iter()
            .map(|(entry, account_type)| PlannedEntry {
                account_id: entry.account_id,
                account_type: *account_type,
                entry_type: entry.entry_type.opposite(),
                amount: entry.amount,
                currency: entry.currency.clone(),
                description: format!("Reversal: {reason}"),
            })
            .collect()
    }

    /// One balanced pair: DEBIT `debit_account`, CREDIT `credit_account`.
    fn pair(
        debit_account: &PostingAccount,
        credit_account: &PostingAccount,
        amount: Decimal,
        description: &str,
    ) -> Result<Vec<PlannedEntry>, LedgerError> {
        if amount <= Decimal::ZERO {
            return Err(LedgerError::InvalidInput(
                "entry amount must be strictly positive".to_string(),
            ));
        }
        if debit_account.id == credit_account.id {
            return Err(LedgerError::InvalidInput(
                "debit and credit accounts must be distinct".to_string(),
            ));
        }
        if debit_account.currency != credit_account.currency {
            return Err(LedgerError::InvalidInput(format!(
                "pair currency mismatch: {} vs {}",
                debit_account.currency, credit_account.currency
            )));
        }

        Ok(vec![
            PlannedEntry {
                account_id: debit_account.id,
                account_type: debit_account.account_type,
                entry_type: EntryType::Debit,
                amount,
                currency: debit_account.currency.clone(),
                description: description.to_string(),
            },
            PlannedEntry {
                account_id: credit_account.id,
                account_type: credit_account.account_type,
                entry_type: EntryType::Credit,
                amount,
                currency: credit_account.currency.clone(),
                description: description.to_string(),
            },
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;

    fn usd() -> CurrencyCode {
        CurrencyCode::parse("USD").unwrap()
    }

    fn eur() -> CurrencyCode {
        CurrencyCode::parse("EUR").unwrap()
    }

    fn account(account_type: AccountType, currency: CurrencyCode) -> PostingAccount {
        PostingAccount {
            id: AccountId::new(),
            account_type,
            currency,
        }
    }

    fn per_currency_difference(entries: &[PlannedEntry]) -> HashMap<String, Decimal> {
        let mut sums: HashMap<String, Decimal> = HashMap::new();
        for entry in entries {
            *sums.entry(entry.currency.to_string()).or_default() += entry.signed_amount();
        }
        sums
    }

    #[test]
    fn test_deposit_pair() {
        let customer = account(AccountType::Asset, usd());
        let liability = account(AccountType::Liability, usd());
        let entries =
            PostingPlanner::plan_deposit(&customer, &liability, dec!(1000), "Deposit").unwrap();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].entry_type, EntryType::Debit);
        assert_eq!(entries[0].account_id, customer.id);
        assert_eq!(entries[0].balance_change(), dec!(1000));
        assert_eq!(entries[1].entry_type, EntryType::Credit);
        assert_eq!(entries[1].account_id, liability.id);
        assert_eq!(entries[1].balance_change(), dec!(1000));
    }

    #[test]
    fn test_withdrawal_pair_is_reverse() {
        let customer = account(AccountType::Asset, usd());
        let liability = account(AccountType::Liability, usd());
        let entries =
            PostingPlanner::plan_withdrawal(&customer, &liability, dec!(250), "Withdrawal")
                .unwrap();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].account_id, liability.id);
        assert_eq!(entries[0].entry_type, EntryType::Debit);
        assert_eq!(entries[1].account_id, customer.id);
        assert_eq!(entries[1].entry_type, EntryType::Credit);
        assert_eq!(entries[1].balance_change(), dec!(-250));
    }

    #[test]
    fn test_pair_rejects_currency_mismatch() {
        let customer = account(AccountType::Asset, usd());
        let liability = account(AccountType::Liability, eur());
        assert!(PostingPlanner::plan_deposit(&customer, &liability, dec!(1), "x").is_err());
    }

    #[test]
    fn test_pair_rejects_same_account() {
        let customer = account(AccountType::Asset, usd());
        assert!(PostingPlanner::plan_deposit(&customer, &customer.clone(), dec!(1), "x").is_err());
    }

    fn exchange_accounts() -> ExchangeAccounts {
        ExchangeAccounts {
            customer_source: account(AccountType::Asset, usd()),
            source_pool: account(AccountType::Asset, usd()),
            customer_destination: account(AccountType::Asset, eur()),
            destination_pool: account(AccountType::Asset, eur()),
            fee_revenue: Some(account(AccountType::Revenue, usd())),
        }
    }

    #[test]
    fn test_exchange_without_fee_is_four_entries() {
        let accounts = exchange_accounts();
        let entries = PostingPlanner::plan_exchange(
            &accounts,
            ExchangeAmounts {
                source_total: dec!(500),
                destination_total: dec!(425),
                fee: Decimal::ZERO,
                fee_on_source_side: true,
            },
            "USD to EUR",
        )
        .unwrap();

        assert_eq!(entries.len(), 4);
        let sums = per_currency_difference(&entries);
        assert_eq!(sums["USD"], Decimal::ZERO);
        assert_eq!(sums["EUR"], Decimal::ZERO);
    }

    #[test]
    fn test_exchange_with_source_fee() {
        let accounts = exchange_accounts();
        let entries = PostingPlanner::plan_exchange(
            &accounts,
            ExchangeAmounts {
                source_total: dec!(505),
                destination_total: dec!(425),
                fee: dec!(5),
                fee_on_source_side: true,
            },
            "USD to EUR",
        )
        .unwrap();

        assert_eq!(entries.len(), 6);
        let sums = per_currency_difference(&entries);
        assert_eq!(sums["USD"], Decimal::ZERO);
        assert_eq!(sums["EUR"], Decimal::ZERO);

        // Customer gives up gross amount; fee revenue is credited the fee.
        let customer_change: Decimal = entries
            .iter()
            .filter(|e| e.account_id == accounts.customer_source.id)
            .map(PlannedEntry::balance_change)
            .sum();
        assert_eq!(customer_change, dec!(-505));

        let fee_account = accounts.fee_revenue.as_ref().unwrap();
        let fee_change: Decimal = entries
            .iter()
            .filter(|e| e.account_id == fee_account.id)
            .map(PlannedEntry::balance_change)
            .sum();
        assert_eq!(fee_change, dec!(5));
    }

    #[test]
    fn test_reversal_flips_entry_types() {
        use chrono::Utc;
        use fintra_shared::types::{LedgerEntryId, TenantId, TransactionId, UserId};

        let customer = account(AccountType::Asset, usd());
        let original = super::super::entry::LedgerEntry {
            id: LedgerEntryId::new(),
            entry_number: 1,
            transaction_id: TransactionId::new(),
            account_id: customer.id,
            entry_type: EntryType::Debit,
            amount: dec!(100),
            currency: usd(),
            posting_date: Utc::now(),
            description: "Deposit".to_string(),
            is_posted: true,
            is_reversed: false,
            reversed_by_entry_id: None,
            tenant_id: TenantId::new(),
            created_by: UserId::new(),
        };

        let plan =
            PostingPlanner::plan_reversal(&[(&original, AccountType::Asset)], "cancelled");
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].entry_type, EntryType::Credit);
        assert_eq!(plan[0].amount, dec!(100));
        assert_eq!(plan[0].balance_change(), dec!(-100));
        assert!(plan[0].description.contains("cancelled"));
    }

    #[test]
    fn test_exchange_fee_without_revenue_account_fails() {
        let mut accounts = exchange_accounts();
        accounts.fee_revenue = None;
        let result = PostingPlanner::plan_exchange(
            &accounts,
            ExchangeAmounts {
                source_total: dec!(505),
                destination_total: dec!(425),
                fee: dec!(5),
                fee_on_source_side: true,
            },
            "USD to EUR",
        );
        assert!(result.is_err());
    }

    proptest! {
        /// Every plan the planner emits balances per currency.
        #[test]
        fn prop_plans_balance_per_currency(
            amount_cents in 1i64..1_000_000_000,
            fee_cents in 0i64..1_000_000,
        ) {
            let amount = Decimal::new(amount_cents, 2);
            let fee = Decimal::new(fee_cents, 2);

            let accounts = exchange_accounts();
            let entries = PostingPlanner::plan_exchange(
                &accounts,
                ExchangeAmounts {
                    source_total: amount + fee,
                    destination_total: amount,
                    fee,
                    fee_on_source_side: true,
                },
                "prop",
            ).unwrap();

            for (currency, diff) in per_currency_difference(&entries) {
                prop_assert_eq!(diff, Decimal::ZERO, "unbalanced in {}", currency);
            }
        }

        /// Deposit then matching withdrawal nets to zero on both accounts.
        #[test]
        fn prop_deposit_withdrawal_roundtrip(amount_cents in 1i64..1_000_000_000) {
            let amount = Decimal::new(amount_cents, 2);
            let customer = account(AccountType::Asset, usd());
            let liability = account(AccountType::Liability, usd());

            let mut changes: HashMap<AccountId, Decimal> = HashMap::new();
            for entry in PostingPlanner::plan_deposit(&customer, &liability, amount, "d")
                .unwrap()
                .iter()
                .chain(
                    PostingPlanner::plan_withdrawal(&customer, &liability, amount, "w")
                        .unwrap()
                        .iter(),
                )
            {
                *changes.entry(entry.account_id).or_default() += entry.balance_change();
            }

            prop_assert_eq!(changes[&customer.id], Decimal::ZERO);
            prop_assert_eq!(changes[&liability.id], Decimal::ZERO);
        }
    }
}
