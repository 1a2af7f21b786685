//! `SeaORM` Entity for the financial_transactions table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use fintra_core::ledger::error::LedgerError;
use fintra_core::ledger::transaction::FinancialTransaction;

use super::sea_orm_active_enums::{TransactionStatus, TransactionType};

/// One transaction header row.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "financial_transactions")]
pub struct Model {
    /// Primary key.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// Human-readable transaction number, unique per tenant.
    pub transaction_number: String,
    /// Tenant isolation boundary.
    pub tenant_id: Uuid,
    /// Customer the transaction belongs to.
    pub customer_id: Uuid,
    /// Kind of transaction.
    pub transaction_type: TransactionType,
    /// Source currency; equals `to_currency` for single-currency types.
    pub from_currency: String,
    /// Destination currency.
    pub to_currency: String,
    /// Amount in the source currency.
    #[sea_orm(column_type = "Decimal(Some((26, 8)))")]
    pub source_amount: Decimal,
    /// Amount in the destination currency.
    #[sea_orm(column_type = "Decimal(Some((26, 8)))")]
    pub destination_amount: Decimal,
    /// Exchange rate applied; 1 for single-currency types.
    #[sea_orm(column_type = "Decimal(Some((26, 8)))")]
    pub exchange_rate: Decimal,
    /// Fee charged.
    #[sea_orm(column_type = "Decimal(Some((26, 8)))")]
    pub fee_amount: Decimal,
    /// Currency the fee is charged in.
    pub fee_currency: String,
    /// Lifecycle state.
    pub status: TransactionStatus,
    /// Caller-supplied idempotency reference, unique per tenant.
    pub reference: Option<String>,
    /// External system reference, unique per tenant.
    pub external_reference: Option<String>,
    /// Description.
    pub description: String,
    /// Free-form metadata.
    pub metadata: Json,
    /// User who created the transaction.
    pub created_by: Uuid,
    /// When the transaction completed.
    pub processed_at: Option<DateTimeWithTimeZone>,
    /// When the transaction failed.
    pub failed_at: Option<DateTimeWithTimeZone>,
    /// Creation time.
    pub created_at: DateTimeWithTimeZone,
    /// Last mutation time.
    pub updated_at: DateTimeWithTimeZone,
}

/// Entity relations.
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Ledger entries belonging to this transaction.
    #[sea_orm(has_many = "super::ledger_entries::Entity")]
    LedgerEntries,
    /// Audit records referencing this transaction.
    #[sea_orm(has_many = "super::financial_audits::Entity")]
    FinancialAudits,
}

impl Related<super::ledger_entries::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::LedgerEntries.def()
    }
}

impl Related<super::financial_audits::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::FinancialAudits.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Converts the row into the domain transaction record.
    ///
    /// # Errors
    ///
    /// Fails when a stored currency code does not parse.
    pub fn into_domain(self) -> Result<FinancialTransaction, LedgerError> {
        Ok(FinancialTransaction {
            id: self.id.into(),
            transaction_number: self.transaction_number,
            tenant_id: self.tenant_id.into(),
            customer_id: self.customer_id.into(),
            transaction_type: self.transaction_type.into(),
            from_currency: super::parse_currency(&self.from_currency)?,
            to_currency: super::parse_currency(&self.to_currency)?,
            source_amount: self.source_amount,
            destination_amount: self.destination_amount,
            exchange_rate: self.exchange_rate,
            fee_amount: self.fee_amount,
            fee_currency: super::parse_currency(&self.fee_currency)?,
            status: self.status.into(),
            reference: self.reference,
            external_reference: self.external_reference,
            description: self.description,
            metadata: self.metadata,
            created_by: self.created_by.into(),
            processed_at: self.processed_at.map(|t| t.to_utc()),
            failed_at: self.failed_at.map(|t| t.to_utc()),
            created_at: self.created_at.to_utc(),
            updated_at: self.updated_at.to_utc(),
        })
    }
}
