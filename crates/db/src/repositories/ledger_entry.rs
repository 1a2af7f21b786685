//! Ledger entry repository: append-only entry writes and reversal
//! back-links.

use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use fintra_core::ledger::entry::LedgerEntry;
use fintra_core::ledger::error::LedgerError;
use fintra_core::ledger::posting::PlannedEntry;
use fintra_shared::types::{TenantId, TransactionId, UserId};

use crate::entities::ledger_entries;
use crate::store;

/// Repository for ledger entry rows.
#[derive(Debug, Clone, Default)]
pub struct LedgerEntryRepository;

impl LedgerEntryRepository {
    /// Creates a new ledger entry repository.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Persists a posting plan against a transaction; plan order
    /// becomes the `entry_number` sequence starting at 1.
    ///
    /// # Errors
    ///
    /// Returns a storage error when an insert fails.
    pub async fn insert_plan<C: ConnectionTrait>(
        &self,
        conn: &C,
        tenant_id: TenantId,
        transaction_id: TransactionId,
        created_by: UserId,
        posting_date: DateTime<Utc>,
        plan: &[PlannedEntry],
    ) -> Result<Vec<LedgerEntry>, LedgerError> {
        self.insert_numbered(conn, tenant_id, transaction_id, created_by, posting_date, plan, 1)
            .await
    }

    /// Persists reversal entries, continuing the transaction's entry
    /// numbering after the originals, and back-links each original to
    /// the entry that reverses it.
    ///
    /// `plan` must be ordered like `originals`.
    ///
    /// # Errors
    ///
    /// Returns a storage error when an insert or update fails.
    pub async fn insert_reversals<C: ConnectionTrait>(
        &self,
        conn: &C,
        tenant_id: TenantId,
        transaction_id: TransactionId,
        created_by: UserId,
        posting_date: DateTime<Utc>,
        plan: &[PlannedEntry],
        originals: &[LedgerEntry],
    ) -> Result<Vec<LedgerEntry>, LedgerError> {
        let next_number = i32::try_from(originals.len())
            .map_err(|_| LedgerError::Internal("entry number overflow".to_string()))?
            + 1;
        let reversals = self
            .insert_numbered(
                conn,
                tenant_id,
                transaction_id,
                created_by,
                posting_date,
                plan,
                next_number,
            )
            .await?;

        for (original, reversal) in originals.iter().zip(&reversals) {
            let result = ledger_entries::Entity::update_many()
                .col_expr(ledger_entries::Column::IsReversed, Expr::value(true))
                .col_expr(
                    ledger_entries::Column::ReversedByEntryId,
                    Expr::value(Some(reversal.id.into_inner())),
                )
                .filter(ledger_entries::Column::Id.eq(original.id.into_inner()))
                .filter(ledger_entries::Column::IsReversed.eq(false))
                .exec(conn)
                .await
                .map_err(store::map_db_err)?;
            if result.rows_affected == 0 {
                return Err(LedgerError::Internal(format!(
                    "entry {} already reversed",
                    original.id
                )));
            }
        }

        Ok(reversals)
    }

    /// Fetches the entries of a transaction in entry order.
    ///
    /// # Errors
    ///
    /// Returns a storage error when the query fails.
    pub async fn for_transaction<C: ConnectionTrait>(
        &self,
        conn: &C,
        transaction_id: TransactionId,
    ) -> Result<Vec<LedgerEntry>, LedgerError> {
        ledger_entries::Entity::find()
            .filter(ledger_entries::Column::TransactionId.eq(transaction_id.into_inner()))
            .order_by_asc(ledger_entries::Column::EntryNumber)
            .all(conn)
            .await
            .map_err(store::map_db_err)?
            .into_iter()
            .map(ledger_entries::Model::into_domain)
            .collect()
    }

    /// Fetches the posted entries against one account in posting order.
    ///
    /// # Errors
    ///
    /// Returns a storage error when the query fails.
    pub async fn for_account<C: ConnectionTrait>(
        &self,
        conn: &C,
        account_id: Uuid,
    ) -> Result<Vec<LedgerEntry>, LedgerError> {
        ledger_entries::Entity::find()
            .filter(ledger_entries::Column::AccountId.eq(account_id))
            .filter(ledger_entries::Column::IsPosted.eq(true))
            .order_by_asc(ledger_entries::Column::PostingDate)
            .all(conn)
            .await
            .map_err(store::map_db_err)?
            .into_iter()
            .map(ledger_entries::Model::into_domain)
            .collect()
    }

    async fn insert_numbered<C: ConnectionTrait>(
        &self,
        conn: &C,
        tenant_id: TenantId,
        transaction_id: TransactionId,
        created_by: UserId,
        posting_date: DateTime<Utc>,
        plan: &[PlannedEntry],
        first_number: i32,
    ) -> Result<Vec<LedgerEntry>, LedgerError> {
        let mut inserted = Vec::with_capacity(plan.len());
        for (index, planned) in plan.iter().enumerate() {
            let offset = i32::try_from(index)
                .map_err(|_| LedgerError::Internal("entry number overflow".to_string()))?;
            let model = ledger_entries::ActiveModel {
                id: Set(Uuid::now_v7()),
                entry_number: Set(first_number + offset),
                transaction_id: Set(transaction_id.into_inner()),
                account_id: Set(planned.account_id.into_inner()),
                entry_type: Set(planned.entry_type.into()),
                amount: Set(planned.amount),
                currency: Set(planned.currency.as_str().to_string()),
                posting_date: Set(posting_date.into()),
                description: Set(planned.description.clone()),
                is_posted: Set(true),
                is_reversed: Set(false),
                reversed_by_entry_id: Set(None),
                tenant_id: Set(tenant_id.into_inner()),
                created_by: Set(created_by.into_inner()),
            };
            inserted.push(
                model
                    .insert(conn)
                    .await
                    .map_err(store::map_db_err)?
                    .into_domain()?,
            );
        }
        Ok(inserted)
    }
}
