//! `SeaORM` Entity for the ledger_entries table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use fintra_core::ledger::entry::LedgerEntry;
use fintra_core::ledger::error::LedgerError;

use super::sea_orm_active_enums::EntryType;

/// One posted ledger entry row. Immutable except for the reversal flag
/// and its back-link.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "ledger_entries")]
pub struct Model {
    /// Primary key.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// Position within the owning transaction, starting at 1.
    pub entry_number: i32,
    /// Owning transaction.
    pub transaction_id: Uuid,
    /// Account the entry posts against.
    pub account_id: Uuid,
    /// Debit or credit.
    pub entry_type: EntryType,
    /// Amount; strictly positive.
    #[sea_orm(column_type = "Decimal(Some((26, 8)))")]
    pub amount: Decimal,
    /// Currency of the amount.
    pub currency: String,
    /// Posting date.
    pub posting_date: DateTimeWithTimeZone,
    /// Line-item description.
    pub description: String,
    /// Whether the entry has been posted.
    pub is_posted: bool,
    /// Whether the entry has been reversed.
    pub is_reversed: bool,
    /// The reversal entry that cancels this one, if any.
    pub reversed_by_entry_id: Option<Uuid>,
    /// Tenant isolation boundary.
    pub tenant_id: Uuid,
    /// User who created the entry.
    pub created_by: Uuid,
}

/// Entity relations.
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// The owning transaction.
    #[sea_orm(
        belongs_to = "super::financial_transactions::Entity",
        from = "Column::TransactionId",
        to = "super::financial_transactions::Column::Id"
    )]
    FinancialTransactions,
    /// The account the entry posts against.
    #[sea_orm(
        belongs_to = "super::accounts::Entity",
        from = "Column::AccountId",
        to = "super::accounts::Column::Id"
    )]
    Accounts,
}

impl Related<super::financial_transactions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::FinancialTransactions.def()
    }
}

impl Related<super::accounts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Accounts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Converts the row into the domain entry record.
    ///
    /// # Errors
    ///
    /// Fails when the stored currency code does not parse.
    pub fn into_domain(self) -> Result<LedgerEntry, LedgerError> {
        Ok(LedgerEntry {
            id: self.id.into(),
            entry_number: self.entry_number,
            transaction_id: self.transaction_id.into(),
            account_id: self.account_id.into(),
            entry_type: self.entry_type.into(),
            amount: self.amount,
            currency: super::parse_currency(&self.currency)?,
            posting_date: self.posting_date.to_utc(),
            description: self.description,
            is_posted: self.is_posted,
            is_reversed: self.is_reversed,
            reversed_by_entry_id: self.reversed_by_entry_id.map(Into::into),
            tenant_id: self.tenant_id.into(),
            created_by: self.created_by.into(),
        })
    }
}
