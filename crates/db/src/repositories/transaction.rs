//! Transaction repository: header lifecycle, idempotency lookups, and
//! guarded status transitions.

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

use fintra_core::audit::AuditRecord;
use fintra_core::ledger::entry::LedgerEntry;
use fintra_core::ledger::error::LedgerError;
use fintra_core::ledger::transaction::{
    format_transaction_number, FinancialTransaction, TransactionStatus, TransactionType,
};
use fintra_shared::types::{CurrencyCode, CustomerId, PageRequest, TenantId, TransactionId, UserId};

use crate::entities::{financial_audits, financial_transactions, ledger_entries};
use crate::store;

/// Input for creating a transaction header.
#[derive(Debug, Clone)]
pub struct NewTransaction {
    /// Tenant scope.
    pub tenant_id: TenantId,
    /// Owning customer.
    pub customer_id: CustomerId,
    /// Kind of transaction.
    pub transaction_type: TransactionType,
    /// Source currency.
    pub from_currency: CurrencyCode,
    /// Destination currency; equals the source for single-currency
    /// types.
    pub to_currency: CurrencyCode,
    /// Amount in the source currency.
    pub source_amount: Decimal,
    /// Amount in the destination currency.
    pub destination_amount: Decimal,
    /// Exchange rate applied.
    pub exchange_rate: Decimal,
    /// Fee charged.
    pub fee_amount: Decimal,
    /// Currency the fee is charged in.
    pub fee_currency: CurrencyCode,
    /// Caller-supplied idempotency reference.
    pub reference: Option<String>,
    /// External system reference.
    pub external_reference: Option<String>,
    /// Description.
    pub description: String,
    /// Free-form metadata.
    pub metadata: serde_json::Value,
    /// User creating the transaction.
    pub created_by: UserId,
}

/// Filter options for listing transactions.
#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    /// Filter by customer.
    pub customer_id: Option<CustomerId>,
    /// Filter by status.
    pub status: Option<TransactionStatus>,
    /// Filter by transaction type.
    pub transaction_type: Option<TransactionType>,
    /// Page to fetch.
    pub page: PageRequest,
}

/// A transaction header with its entries and audit trail.
#[derive(Debug, Clone)]
pub struct TransactionDetail {
    /// Transaction header.
    pub transaction: FinancialTransaction,
    /// Posted ledger entries, in entry order.
    pub entries: Vec<LedgerEntry>,
    /// Audit records, oldest first.
    pub audits: Vec<AuditRecord>,
}

/// Repository for transaction headers.
#[derive(Debug, Clone, Default)]
pub struct TransactionRepository;

impl TransactionRepository {
    /// Creates a new transaction repository.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Inserts a PENDING header, enforcing reference idempotency.
    ///
    /// Duplicates are detected by lookup before the insert and by the
    /// unique indexes on the race; both paths return
    /// [`LedgerError::DuplicateTransaction`] carrying the original id.
    ///
    /// # Errors
    ///
    /// Returns a duplicate, transient, or storage error.
    pub async fn insert_pending<C: ConnectionTrait>(
        &self,
        conn: &C,
        input: NewTransaction,
    ) -> Result<FinancialTransaction, LedgerError> {
        if let Some(reference) = &input.reference {
            if let Some(original) = self
                .find_by_reference(conn, input.tenant_id, reference)
                .await?
            {
                return Err(LedgerError::DuplicateTransaction {
                    original_transaction_id: original.id.into_inner(),
                });
            }
        }
        if let Some(external) = &input.external_reference {
            if let Some(original) = self
                .find_by_external_reference(conn, input.tenant_id, external)
                .await?
            {
                return Err(LedgerError::DuplicateTransaction {
                    original_transaction_id: original.id.into_inner(),
                });
            }
        }

        let transaction_number = self.next_transaction_number(conn, input.tenant_id).await?;
        let now = Utc::now();
        let model = financial_transactions::ActiveModel {
            id: Set(Uuid::now_v7()),
            transaction_number: Set(transaction_number),
            tenant_id: Set(input.tenant_id.into_inner()),
            customer_id: Set(input.customer_id.into_inner()),
            transaction_type: Set(input.transaction_type.into()),
            from_currency: Set(input.from_currency.as_str().to_string()),
            to_currency: Set(input.to_currency.as_str().to_string()),
            source_amount: Set(input.source_amount),
            destination_amount: Set(input.destination_amount),
            exchange_rate: Set(input.exchange_rate),
            fee_amount: Set(input.fee_amount),
            fee_currency: Set(input.fee_currency.as_str().to_string()),
            status: Set(TransactionStatus::Pending.into()),
            reference: Set(input.reference.clone()),
            external_reference: Set(input.external_reference.clone()),
            description: Set(input.description.clone()),
            metadata: Set(input.metadata.clone()),
            created_by: Set(input.created_by.into_inner()),
            processed_at: Set(None),
            failed_at: Set(None),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        match model.insert(conn).await {
            Ok(inserted) => inserted.into_domain(),
            Err(err) if store::classify(&err) == store::ErrorClass::UniqueViolation => {
                self.resolve_unique_violation(conn, &input, &err.to_string())
                    .await
            }
            Err(err) => Err(store::map_db_err(err)),
        }
    }

    /// Attributes a unique violation either to an idempotency reference
    /// (duplicate) or to the transaction number allocator (transient).
    async fn resolve_unique_violation<C: ConnectionTrait>(
        &self,
        conn: &C,
        input: &NewTransaction,
        message: &str,
    ) -> Result<FinancialTransaction, LedgerError> {
        if let Some(reference) = &input.reference {
            if let Some(original) = self
                .find_by_reference(conn, input.tenant_id, reference)
                .await?
            {
                return Err(LedgerError::DuplicateTransaction {
                    original_transaction_id: original.id.into_inner(),
                });
            }
        }
        if let Some(external) = &input.external_reference {
            if let Some(original) = self
                .find_by_external_reference(conn, input.tenant_id, external)
                .await?
            {
                return Err(LedgerError::DuplicateTransaction {
                    original_transaction_id: original.id.into_inner(),
                });
            }
        }
        // Number allocator collision under concurrency; retry picks a
        // fresh number.
        Err(LedgerError::Transient(format!(
            "transaction number collision: {message}"
        )))
    }

    /// Finds a transaction by idempotency reference.
    ///
    /// # Errors
    ///
    /// Returns a storage error when the query fails.
    pub async fn find_by_reference<C: ConnectionTrait>(
        &self,
        conn: &C,
        tenant_id: TenantId,
        reference: &str,
    ) -> Result<Option<FinancialTransaction>, LedgerError> {
        financial_transactions::Entity::find()
            .filter(financial_transactions::Column::TenantId.eq(tenant_id.into_inner()))
            .filter(financial_transactions::Column::Reference.eq(reference))
            .one(conn)
            .await
            .map_err(store::map_db_err)?
            .map(financial_transactions::Model::into_domain)
            .transpose()
    }

    /// Finds a transaction by external reference.
    ///
    /// # Errors
    ///
    /// Returns a storage error when the query fails.
    pub async fn find_by_external_reference<C: ConnectionTrait>(
        &self,
        conn: &C,
        tenant_id: TenantId,
        external_reference: &str,
    ) -> Result<Option<FinancialTransaction>, LedgerError> {
        financial_transactions::Entity::find()
            .filter(financial_transactions::Column::TenantId.eq(tenant_id.into_inner()))
            .filter(financial_transactions::Column::ExternalReference.eq(external_reference))
            .one(conn)
            .await
            .map_err(store::map_db_err)?
            .map(financial_transactions::Model::into_domain)
            .transpose()
    }

    /// Fetches a transaction header scoped to a tenant.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::TransactionNotFound`] when absent.
    pub async fn get<C: ConnectionTrait>(
        &self,
        conn: &C,
        tenant_id: TenantId,
        transaction_id: TransactionId,
    ) -> Result<FinancialTransaction, LedgerError> {
        financial_transactions::Entity::find_by_id(transaction_id.into_inner())
            .filter(financial_transactions::Column::TenantId.eq(tenant_id.into_inner()))
            .one(conn)
            .await
            .map_err(store::map_db_err)?
            .ok_or(LedgerError::TransactionNotFound(
                transaction_id.into_inner(),
            ))?
            .into_domain()
    }

    /// Fetches a transaction header with `SELECT ... FOR UPDATE`.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::TransactionNotFound`] when absent.
    pub async fn get_locked<C: ConnectionTrait>(
        &self,
        conn: &C,
        tenant_id: TenantId,
        transaction_id: TransactionId,
    ) -> Result<FinancialTransaction, LedgerError> {
        financial_transactions::Entity::find_by_id(transaction_id.into_inner())
            .filter(financial_transactions::Column::TenantId.eq(tenant_id.into_inner()))
            .lock_exclusive()
            .one(conn)
            .await
            .map_err(store::map_db_err)?
            .ok_or(LedgerError::TransactionNotFound(
                transaction_id.into_inner(),
            ))?
            .into_domain()
    }

    /// Moves a transaction from `from` to `to`, guarded so no edge
    /// outside the state machine is ever persisted.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::InvalidState`] when the edge is illegal
    /// or the row is no longer in `from`.
    pub async fn transition<C: ConnectionTrait>(
        &self,
        conn: &C,
        tenant_id: TenantId,
        transaction_id: TransactionId,
        from: TransactionStatus,
        to: TransactionStatus,
    ) -> Result<(), LedgerError> {
        if !from.can_transition_to(to) {
            return Err(LedgerError::InvalidState {
                from: from.to_string(),
                to: to.to_string(),
            });
        }

        let now = Utc::now();
        let mut update = financial_transactions::Entity::update_many()
            .col_expr(
                financial_transactions::Column::Status,
                Expr::value(crate::entities::sea_orm_active_enums::TransactionStatus::from(to)),
            )
            .col_expr(financial_transactions::Column::UpdatedAt, Expr::value(now));
        if to == TransactionStatus::Completed {
            update = update.col_expr(
                financial_transactions::Column::ProcessedAt,
                Expr::value(Some(now)),
            );
        }
        if to == TransactionStatus::Failed {
            update = update.col_expr(
                financial_transactions::Column::FailedAt,
                Expr::value(Some(now)),
            );
        }

        let result = update
            .filter(financial_transactions::Column::Id.eq(transaction_id.into_inner()))
            .filter(financial_transactions::Column::TenantId.eq(tenant_id.into_inner()))
            .filter(
                financial_transactions::Column::Status
                    .eq(crate::entities::sea_orm_active_enums::TransactionStatus::from(from)),
            )
            .exec(conn)
            .await
            .map_err(store::map_db_err)?;

        if result.rows_affected == 0 {
            let actual = self.get(conn, tenant_id, transaction_id).await?;
            return Err(LedgerError::InvalidState {
                from: actual.status.to_string(),
                to: to.to_string(),
            });
        }
        Ok(())
    }

    /// Fetches a transaction with its entries and audit trail.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::TransactionNotFound`] when absent.
    pub async fn get_detail<C: ConnectionTrait>(
        &self,
        conn: &C,
        tenant_id: TenantId,
        transaction_id: TransactionId,
    ) -> Result<TransactionDetail, LedgerError> {
        let transaction = self.get(conn, tenant_id, transaction_id).await?;

        let entries = ledger_entries::Entity::find()
            .filter(ledger_entries::Column::TransactionId.eq(transaction_id.into_inner()))
            .order_by_asc(ledger_entries::Column::EntryNumber)
            .all(conn)
            .await
            .map_err(store::map_db_err)?
            .into_iter()
            .map(ledger_entries::Model::into_domain)
            .collect::<Result<Vec<_>, _>>()?;

        let audits = financial_audits::Entity::find()
            .filter(financial_audits::Column::TransactionId.eq(transaction_id.into_inner()))
            .order_by_asc(financial_audits::Column::EventTime)
            .all(conn)
            .await
            .map_err(store::map_db_err)?
            .into_iter()
            .map(financial_audits::Model::into_domain)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(TransactionDetail {
            transaction,
            entries,
            audits,
        })
    }

    /// Lists transactions for a tenant, newest first.
    ///
    /// # Errors
    ///
    /// Returns a storage error when the query fails.
    pub async fn list<C: ConnectionTrait>(
        &self,
        conn: &C,
        tenant_id: TenantId,
        filter: TransactionFilter,
    ) -> Result<(Vec<FinancialTransaction>, u64), LedgerError> {
        let mut query = financial_transactions::Entity::find()
            .filter(financial_transactions::Column::TenantId.eq(tenant_id.into_inner()));

        if let Some(customer_id) = filter.customer_id {
            query = query
                .filter(financial_transactions::Column::CustomerId.eq(customer_id.into_inner()));
        }
        if let Some(status) = filter.status {
            query = query.filter(
                financial_transactions::Column::Status
                    .eq(crate::entities::sea_orm_active_enums::TransactionStatus::from(status)),
            );
        }
        if let Some(transaction_type) = filter.transaction_type {
            query = query.filter(
                financial_transactions::Column::TransactionType.eq(
                    crate::entities::sea_orm_active_enums::TransactionType::from(transaction_type),
                ),
            );
        }

        let total = query
            .clone()
            .count(conn)
            .await
            .map_err(store::map_db_err)?;

        let rows = query
            .order_by_desc(financial_transactions::Column::CreatedAt)
            .offset(filter.page.offset())
            .limit(filter.page.limit())
            .all(conn)
            .await
            .map_err(store::map_db_err)?;

        let transactions = rows
            .into_iter()
            .map(financial_transactions::Model::into_domain)
            .collect::<Result<Vec<_>, _>>()?;
        Ok((transactions, total))
    }

    /// Allocates the next transaction number for a tenant.
    async fn next_transaction_number<C: ConnectionTrait>(
        &self,
        conn: &C,
        tenant_id: TenantId,
    ) -> Result<String, LedgerError> {
        let count = financial_transactions::Entity::find()
            .filter(financial_transactions::Column::TenantId.eq(tenant_id.into_inner()))
            .count(conn)
            .await
            .map_err(store::map_db_err)?;
        let sequence = i64::try_from(count)
            .map_err(|_| LedgerError::Internal("transaction sequence overflow".to_string()))?
            + 1;
        Ok(format_transaction_number(sequence))
    }
}
