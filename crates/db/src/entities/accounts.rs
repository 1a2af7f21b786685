//! `SeaORM` Entity for the accounts table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use fintra_core::ledger::account::Account;
use fintra_core::ledger::error::LedgerError;

use super::sea_orm_active_enums::AccountType;

/// One account row: a customer wallet or a system account.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "accounts")]
pub struct Model {
    /// Primary key.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// Tenant isolation boundary.
    pub tenant_id: Uuid,
    /// Owning customer; NULL for system accounts.
    pub customer_id: Option<Uuid>,
    /// Human-readable account number, unique per tenant.
    pub account_number: String,
    /// Account classification.
    pub account_type: AccountType,
    /// Display name.
    pub name: String,
    /// ISO currency code.
    pub currency: String,
    /// Denormalized ledger balance.
    pub balance: Decimal,
    /// Balance available for new debits.
    pub available_balance: Decimal,
    /// Balance held against pending operations.
    pub blocked_balance: Decimal,
    /// Optimistic lock version, bumped on every balance mutation.
    pub version: i64,
    /// Whether the account accepts postings.
    pub is_active: bool,
    /// User who created the account.
    pub created_by: Uuid,
    /// Creation time.
    pub created_at: DateTimeWithTimeZone,
    /// Last mutation time.
    pub updated_at: DateTimeWithTimeZone,
}

/// Entity relations.
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Ledger entries posted against this account.
    #[sea_orm(has_many = "super::ledger_entries::Entity")]
    LedgerEntries,
}

impl Related<super::ledger_entries::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::LedgerEntries.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Converts the row into the domain account record.
    ///
    /// # Errors
    ///
    /// Fails when the stored currency code does not parse.
    pub fn into_domain(self) -> Result<Account, LedgerError> {
        Ok(Account {
            id: self.id.into(),
            tenant_id: self.tenant_id.into(),
            customer_id: self.customer_id.map(Into::into),
            account_number: self.account_number,
            account_type: self.account_type.into(),
            name: self.name,
            currency: super::parse_currency(&self.currency)?,
            balance: self.balance,
            available_balance: self.available_balance,
            blocked_balance: self.blocked_balance,
            version: self.version,
            is_active: self.is_active,
            created_by: self.created_by.into(),
            created_at: self.created_at.to_utc(),
            updated_at: self.updated_at.to_utc(),
        })
    }
}
