//! `SeaORM` active enums mapped to PostgreSQL enum types.
//!
//! Each enum converts to and from its `fintra-core` counterpart so the
//! domain layer never sees ORM types.

use fintra_core::audit;
use fintra_core::ledger::{account, entry, transaction};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Account classification, `account_type` in PostgreSQL.
#[derive(Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "account_type")]
pub enum AccountType {
    /// Asset account.
    #[sea_orm(string_value = "asset")]
    Asset,
    /// Liability account.
    #[sea_orm(string_value = "liability")]
    Liability,
    /// Equity account.
    #[sea_orm(string_value = "equity")]
    Equity,
    /// Revenue account.
    #[sea_orm(string_value = "revenue")]
    Revenue,
    /// Expense account.
    #[sea_orm(string_value = "expense")]
    Expense,
}

impl From<account::AccountType> for AccountType {
    fn from(value: account::AccountType) -> Self {
        match value {
            account::AccountType::Asset => Self::Asset,
            account::AccountType::Liability => Self::Liability,
            account::AccountType::Equity => Self::Equity,
            account::AccountType::Revenue => Self::Revenue,
            account::AccountType::Expense => Self::Expense,
        }
    }
}

impl From<AccountType> for account::AccountType {
    fn from(value: AccountType) -> Self {
        match value {
            AccountType::Asset => Self::Asset,
            AccountType::Liability => Self::Liability,
            AccountType::Equity => Self::Equity,
            AccountType::Revenue => Self::Revenue,
            AccountType::Expense => Self::Expense,
        }
    }
}

/// Entry direction, `entry_type` in PostgreSQL.
#[derive(Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "entry_type")]
pub enum EntryType {
    /// Debit entry.
    #[sea_orm(string_value = "debit")]
    Debit,
    /// Credit entry.
    #[sea_orm(string_value = "credit")]
    Credit,
}

impl From<entry::EntryType> for EntryType {
    fn from(value: entry::EntryType) -> Self {
        match value {
            entry::EntryType::Debit => Self::Debit,
            entry::EntryType::Credit => Self::Credit,
        }
    }
}

impl From<EntryType> for entry::EntryType {
    fn from(value: EntryType) -> Self {
        match value {
            EntryType::Debit => Self::Debit,
            EntryType::Credit => Self::Credit,
        }
    }
}

/// Transaction kind, `transaction_type` in PostgreSQL.
#[derive(Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "transaction_type")]
pub enum TransactionType {
    /// Deposit of external funds.
    #[sea_orm(string_value = "deposit")]
    Deposit,
    /// Withdrawal of funds.
    #[sea_orm(string_value = "withdrawal")]
    Withdrawal,
    /// Exchange buying the destination currency.
    #[sea_orm(string_value = "currency_buy")]
    CurrencyBuy,
    /// Exchange selling the source currency.
    #[sea_orm(string_value = "currency_sell")]
    CurrencySell,
}

impl From<transaction::TransactionType> for TransactionType {
    fn from(value: transaction::TransactionType) -> Self {
        match value {
            transaction::TransactionType::Deposit => Self::Deposit,
            transaction::TransactionType::Withdrawal => Self::Withdrawal,
            transaction::TransactionType::CurrencyBuy => Self::CurrencyBuy,
            transaction::TransactionType::CurrencySell => Self::CurrencySell,
        }
    }
}

impl From<TransactionType> for transaction::TransactionType {
    fn from(value: TransactionType) -> Self {
        match value {
            TransactionType::Deposit => Self::Deposit,
            TransactionType::Withdrawal => Self::Withdrawal,
            TransactionType::CurrencyBuy => Self::CurrencyBuy,
            TransactionType::CurrencySell => Self::CurrencySell,
        }
    }
}

/// Transaction lifecycle state, `transaction_status` in PostgreSQL.
#[derive(Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "transaction_status")]
pub enum TransactionStatus {
    /// Created, not yet posted.
    #[sea_orm(string_value = "pending")]
    Pending,
    /// Posting in progress.
    #[sea_orm(string_value = "processing")]
    Processing,
    /// Posted and committed.
    #[sea_orm(string_value = "completed")]
    Completed,
    /// Rejected or rolled back.
    #[sea_orm(string_value = "failed")]
    Failed,
    /// Abandoned before posting.
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
    /// Reversed after completion.
    #[sea_orm(string_value = "refunded")]
    Refunded,
}

impl From<transaction::TransactionStatus> for TransactionStatus {
    fn from(value: transaction::TransactionStatus) -> Self {
        match value {
            transaction::TransactionStatus::Pending => Self::Pending,
            transaction::TransactionStatus::Processing => Self::Processing,
            transaction::TransactionStatus::Completed => Self::Completed,
            transaction::TransactionStatus::Failed => Self::Failed,
            transaction::TransactionStatus::Cancelled => Self::Cancelled,
            transaction::TransactionStatus::Refunded => Self::Refunded,
        }
    }
}

impl From<TransactionStatus> for transaction::TransactionStatus {
    fn from(value: TransactionStatus) -> Self {
        match value {
            TransactionStatus::Pending => Self::Pending,
            TransactionStatus::Processing => Self::Processing,
            TransactionStatus::Completed => Self::Completed,
            TransactionStatus::Failed => Self::Failed,
            TransactionStatus::Cancelled => Self::Cancelled,
            TransactionStatus::Refunded => Self::Refunded,
        }
    }
}

/// Audit severity, `audit_severity` in PostgreSQL.
#[derive(Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "audit_severity")]
pub enum AuditSeverity {
    /// Routine lifecycle event.
    #[sea_orm(string_value = "low")]
    Low,
    /// Noteworthy event.
    #[sea_orm(string_value = "medium")]
    Medium,
    /// High-value movement or manual intervention.
    #[sea_orm(string_value = "high")]
    High,
    /// Integrity or configuration failure.
    #[sea_orm(string_value = "critical")]
    Critical,
}

impl From<audit::AuditSeverity> for AuditSeverity {
    fn from(value: audit::AuditSeverity) -> Self {
        match value {
            audit::AuditSeverity::Low => Self::Low,
            audit::AuditSeverity::Medium => Self::Medium,
            audit::AuditSeverity::High => Self::High,
            audit::AuditSeverity::Critical => Self::Critical,
        }
    }
}

impl From<AuditSeverity> for audit::AuditSeverity {
    fn from(value: AuditSeverity) -> Self {
        match value {
            AuditSeverity::Low => Self::Low,
            AuditSeverity::Medium => Self::Medium,
            AuditSeverity::High => Self::High,
            AuditSeverity::Critical => Self::Critical,
        }
    }
}
