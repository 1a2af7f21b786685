//! `SeaORM` Entity for the financial_audits table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use fintra_core::audit::{AuditAction, AuditMetadata, AuditRecord};
use fintra_core::ledger::error::LedgerError;

use super::sea_orm_active_enums::AuditSeverity;

/// One append-only audit row.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "financial_audits")]
pub struct Model {
    /// Primary key.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// Tenant isolation boundary.
    pub tenant_id: Uuid,
    /// Acting user.
    pub user_id: Uuid,
    /// Action name, e.g. `TRANSACTION_PROCESSED`.
    pub action: String,
    /// Kind of resource affected.
    pub resource_type: String,
    /// Identifier of the affected resource.
    pub resource_id: String,
    /// Related transaction, when transaction-scoped.
    pub transaction_id: Option<Uuid>,
    /// Human-readable summary.
    pub description: String,
    /// State before the event.
    pub old_values: Option<Json>,
    /// State after the event.
    pub new_values: Option<Json>,
    /// Request-scoped context (ip, user agent, session, timing).
    pub metadata: Json,
    /// Severity of the event.
    pub severity: AuditSeverity,
    /// When the event happened.
    pub event_time: DateTimeWithTimeZone,
}

/// Entity relations.
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// The related transaction, when transaction-scoped.
    #[sea_orm(
        belongs_to = "super::financial_transactions::Entity",
        from = "Column::TransactionId",
        to = "super::financial_transactions::Column::Id"
    )]
    FinancialTransactions,
}

impl Related<super::financial_transactions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::FinancialTransactions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Converts the row into the domain audit record.
    ///
    /// # Errors
    ///
    /// Fails when the stored action name or metadata does not parse.
    pub fn into_domain(self) -> Result<AuditRecord, LedgerError> {
        let action: AuditAction = serde_json::from_value(serde_json::Value::String(
            self.action.clone(),
        ))
        .map_err(|e| LedgerError::Internal(format!("stored audit action invalid: {e}")))?;
        let metadata: AuditMetadata = serde_json::from_value(self.metadata)
            .map_err(|e| LedgerError::Internal(format!("stored audit metadata invalid: {e}")))?;

        Ok(AuditRecord {
            id: self.id.into(),
            tenant_id: self.tenant_id.into(),
            user_id: self.user_id.into(),
            action,
            resource_type: self.resource_type,
            resource_id: self.resource_id,
            transaction_id: self.transaction_id.map(Into::into),
            description: self.description,
            old_values: self.old_values,
            new_values: self.new_values,
            metadata,
            severity: self.severity.into(),
            event_time: self.event_time.to_utc(),
        })
    }
}
