//! Report repository: aggregation queries backing the report service.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
};

use fintra_core::invariant;
use fintra_core::ledger::entry::EntryType;
use fintra_core::ledger::error::LedgerError;
use fintra_core::reports::{AccountActivity, ReconciliationRow, TransactionVolume};
use fintra_shared::types::TenantId;

use crate::entities::{accounts, financial_transactions, ledger_entries};
use crate::store;

/// Repository for report aggregation queries.
#[derive(Debug, Clone)]
pub struct ReportRepository {
    db: DatabaseConnection,
}

impl ReportRepository {
    /// Creates a new report repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Per-account debit/credit totals for a tenant, optionally limited
    /// to entries posted at or before `as_of`.
    ///
    /// # Errors
    ///
    /// Returns a storage error when a query fails.
    pub async fn account_activity(
        &self,
        tenant_id: TenantId,
        as_of: Option<DateTime<Utc>>,
    ) -> Result<Vec<AccountActivity>, LedgerError> {
        let account_rows = accounts::Entity::find()
            .filter(accounts::Column::TenantId.eq(tenant_id.into_inner()))
            .order_by_asc(accounts::Column::AccountNumber)
            .all(&self.db)
            .await
            .map_err(store::map_db_err)?;

        let mut result = Vec::with_capacity(account_rows.len());
        for row in account_rows {
            let (total_debit, total_credit) = self.account_totals(&self.db, row.id, as_of).await?;
            let account = row.into_domain()?;
            result.push(AccountActivity {
                account_id: account.id.into_inner(),
                account_number: account.account_number,
                name: account.name,
                account_type: account.account_type.to_string(),
                currency: account.currency.to_string(),
                total_debit,
                total_credit,
                balance: account.balance,
            });
        }
        Ok(result)
    }

    /// Transaction counts and amounts per type, status, and currency
    /// within a time range.
    ///
    /// # Errors
    ///
    /// Returns a storage error when a query fails.
    pub async fn transaction_volumes(
        &self,
        tenant_id: TenantId,
        period_start: DateTime<Utc>,
        period_end: DateTime<Utc>,
    ) -> Result<Vec<TransactionVolume>, LedgerError> {
        let rows = financial_transactions::Entity::find()
            .filter(financial_transactions::Column::TenantId.eq(tenant_id.into_inner()))
            .filter(financial_transactions::Column::CreatedAt.gte(period_start))
            .filter(financial_transactions::Column::CreatedAt.lte(period_end))
            .all(&self.db)
            .await
            .map_err(store::map_db_err)?;

        let mut grouped: std::collections::BTreeMap<(String, String, String), (i64, Decimal)> =
            std::collections::BTreeMap::new();
        for row in rows {
            let transaction = row.into_domain()?;
            let key = (
                transaction.transaction_type.to_string(),
                transaction.status.to_string(),
                transaction.from_currency.to_string(),
            );
            let slot = grouped.entry(key).or_insert((0, Decimal::ZERO));
            slot.0 += 1;
            slot.1 += transaction.source_amount;
        }

        Ok(grouped
            .into_iter()
            .map(
                |((transaction_type, status, currency), (count, total_amount))| {
                    TransactionVolume {
                        transaction_type,
                        status,
                        currency,
                        count,
                        total_amount,
                    }
                },
            )
            .collect())
    }

    /// Replays posted entries per account and compares with the
    /// denormalized balances.
    ///
    /// # Errors
    ///
    /// Returns a storage error when a query fails.
    pub async fn reconciliation_rows(
        &self,
        tenant_id: TenantId,
    ) -> Result<Vec<ReconciliationRow>, LedgerError> {
        let account_rows = accounts::Entity::find()
            .filter(accounts::Column::TenantId.eq(tenant_id.into_inner()))
            .order_by_asc(accounts::Column::AccountNumber)
            .all(&self.db)
            .await
            .map_err(store::map_db_err)?;

        let mut result = Vec::with_capacity(account_rows.len());
        for row in account_rows {
            let account = row.into_domain()?;
            let entries = ledger_entries::Entity::find()
                .filter(ledger_entries::Column::AccountId.eq(account.id.into_inner()))
                .filter(ledger_entries::Column::IsPosted.eq(true))
                .all(&self.db)
                .await
                .map_err(store::map_db_err)?
                .into_iter()
                .map(ledger_entries::Model::into_domain)
                .collect::<Result<Vec<_>, _>>()?;

            let outcome = invariant::reconcile_account(&account, &entries);
            result.push(ReconciliationRow {
                account_id: account.id.into_inner(),
                account_number: account.account_number,
                currency: account.currency.to_string(),
                recorded_balance: outcome.recorded_balance,
                replayed_balance: outcome.replayed_balance,
                drift: outcome.drift,
                is_consistent: outcome.is_consistent(),
            });
        }
        Ok(result)
    }

    async fn account_totals<C: ConnectionTrait>(
        &self,
        conn: &C,
        account_id: uuid::Uuid,
        as_of: Option<DateTime<Utc>>,
    ) -> Result<(Decimal, Decimal), LedgerError> {
        let mut query = ledger_entries::Entity::find()
            .filter(ledger_entries::Column::AccountId.eq(account_id))
            .filter(ledger_entries::Column::IsPosted.eq(true));
        if let Some(as_of) = as_of {
            query = query.filter(ledger_entries::Column::PostingDate.lte(as_of));
        }
        let rows = query.all(conn).await.map_err(store::map_db_err)?;

        let mut total_debit = Decimal::ZERO;
        let mut total_credit = Decimal::ZERO;
        for row in rows {
            let entry = row.into_domain()?;
            match entry.entry_type {
                EntryType::Debit => total_debit += entry.amount,
                EntryType::Credit => total_credit += entry.amount,
            }
        }
        Ok((total_debit, total_credit))
    }
}
