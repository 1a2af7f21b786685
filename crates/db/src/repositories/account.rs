//! Account repository: wallets, system accounts, row locks, and
//! balance mutations.

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

use fintra_core::ledger::account::{
    format_account_number, Account, AccountType, SystemAccountKind,
};
use fintra_core::ledger::error::LedgerError;
use fintra_shared::types::{CurrencyCode, CustomerId, TenantId, UserId};

use crate::entities::accounts;
use crate::store;

/// Repository for account rows.
#[derive(Debug, Clone, Default)]
pub struct AccountRepository;

impl AccountRepository {
    /// Creates a new account repository.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Finds the customer's wallet for a currency, creating it on first
    /// use.
    ///
    /// The lookup deliberately includes inactive wallets: the unique
    /// index allows one wallet per customer and currency, so a
    /// deactivated wallet blocks further postings in that currency
    /// instead of spawning a replacement account.
    ///
    /// # Errors
    ///
    /// Returns a storage error; a lost race on the wallet unique index
    /// surfaces as [`LedgerError::Transient`] so the caller retries.
    pub async fn get_or_create_customer_account<C: ConnectionTrait>(
        &self,
        conn: &C,
        tenant_id: TenantId,
        customer_id: CustomerId,
        currency: &CurrencyCode,
        created_by: UserId,
    ) -> Result<Account, LedgerError> {
        if let Some(existing) = accounts::Entity::find()
            .filter(accounts::Column::TenantId.eq(tenant_id.into_inner()))
            .filter(accounts::Column::CustomerId.eq(customer_id.into_inner()))
            .filter(accounts::Column::Currency.eq(currency.as_str()))
            .one(conn)
            .await
            .map_err(store::map_db_err)?
        {
            return existing.into_domain();
        }

        let account_number = self
            .next_account_number(conn, tenant_id, AccountType::Asset)
            .await?;
        let now = Utc::now();
        let model = accounts::ActiveModel {
            id: Set(Uuid::now_v7()),
            tenant_id: Set(tenant_id.into_inner()),
            customer_id: Set(Some(customer_id.into_inner())),
            account_number: Set(account_number),
            account_type: Set(AccountType::Asset.into()),
            name: Set(format!("Customer Wallet {currency}")),
            currency: Set(currency.as_str().to_string()),
            balance: Set(Decimal::ZERO),
            available_balance: Set(Decimal::ZERO),
            blocked_balance: Set(Decimal::ZERO),
            version: Set(1),
            is_active: Set(true),
            created_by: Set(created_by.into_inner()),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        match model.insert(conn).await {
            Ok(inserted) => inserted.into_domain(),
            Err(err) if store::classify(&err) == store::ErrorClass::UniqueViolation => {
                // Lost the creation race; the retry will find the row.
                Err(LedgerError::Transient(format!(
                    "account creation race: {err}"
                )))
            }
            Err(err) => Err(store::map_db_err(err)),
        }
    }

    /// Looks up a system account for a tenant and currency.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::SystemAccountMissing`] when the tenant's
    /// chart has not been bootstrapped for this currency.
    pub async fn get_system_account<C: ConnectionTrait>(
        &self,
        conn: &C,
        tenant_id: TenantId,
        kind: SystemAccountKind,
        currency: &CurrencyCode,
    ) -> Result<Account, LedgerError> {
        let model = accounts::Entity::find()
            .filter(accounts::Column::TenantId.eq(tenant_id.into_inner()))
            .filter(accounts::Column::CustomerId.is_null())
            .filter(accounts::Column::Currency.eq(currency.as_str()))
            .filter(accounts::Column::Name.eq(kind.account_name(currency)))
            .one(conn)
            .await
            .map_err(store::map_db_err)?
            .ok_or_else(|| LedgerError::SystemAccountMissing {
                kind: format!("{kind:?}"),
                currency: currency.to_string(),
            })?;
        model.into_domain()
    }

    /// Creates the pool, deposit liability, and fee revenue accounts
    /// for each currency, skipping any that already exist.
    ///
    /// # Errors
    ///
    /// Returns a storage error when an insert fails.
    pub async fn bootstrap_system_accounts<C: ConnectionTrait>(
        &self,
        conn: &C,
        tenant_id: TenantId,
        currencies: &[CurrencyCode],
        created_by: UserId,
    ) -> Result<Vec<Account>, LedgerError> {
        let kinds = [
            SystemAccountKind::Pool,
            SystemAccountKind::Liability,
            SystemAccountKind::FeeRevenue,
        ];
        let mut created = Vec::new();
        for currency in currencies {
            for kind in kinds {
                if self
                    .get_system_account(conn, tenant_id, kind, currency)
                    .await
                    .is_ok()
                {
                    continue;
                }
                let account_type = kind.account_type();
                let account_number = self
                    .next_account_number(conn, tenant_id, account_type)
                    .await?;
                let now = Utc::now();
                let model = accounts::ActiveModel {
                    id: Set(Uuid::now_v7()),
                    tenant_id: Set(tenant_id.into_inner()),
                    customer_id: Set(None),
                    account_number: Set(account_number),
                    account_type: Set(account_type.into()),
                    name: Set(kind.account_name(currency)),
                    currency: Set(currency.as_str().to_string()),
                    balance: Set(Decimal::ZERO),
                    available_balance: Set(Decimal::ZERO),
                    blocked_balance: Set(Decimal::ZERO),
                    version: Set(1),
                    is_active: Set(true),
                    created_by: Set(created_by.into_inner()),
                    created_at: Set(now.into()),
                    updated_at: Set(now.into()),
                };
                created.push(
                    model
                        .insert(conn)
                        .await
                        .map_err(store::map_db_err)?
                        .into_domain()?,
                );
            }
        }
        Ok(created)
    }

    /// Locks the given accounts with `SELECT ... FOR UPDATE`, in
    /// ascending id order so concurrent orchestrators cannot deadlock
    /// on each other.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::AccountNotFound`] when a row is missing.
    pub async fn lock_for_update<C: ConnectionTrait>(
        &self,
        conn: &C,
        mut account_ids: Vec<Uuid>,
    ) -> Result<Vec<Account>, LedgerError> {
        account_ids.sort_unstable();
        account_ids.dedup();

        let rows = accounts::Entity::find()
            .filter(accounts::Column::Id.is_in(account_ids.clone()))
            .order_by_asc(accounts::Column::Id)
            .lock_exclusive()
            .all(conn)
            .await
            .map_err(store::map_db_err)?;

        if rows.len() != account_ids.len() {
            let found: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
            let missing = account_ids
                .into_iter()
                .find(|id| !found.contains(id))
                .unwrap_or_default();
            return Err(LedgerError::AccountNotFound(missing));
        }

        rows.into_iter().map(accounts::Model::into_domain).collect()
    }

    /// Applies a signed balance change to a locked account, bumping the
    /// version.
    ///
    /// The row lock makes this safe; the version filter is a backstop
    /// that surfaces as [`LedgerError::OptimisticConflict`] if the row
    /// moved anyway.
    ///
    /// # Errors
    ///
    /// Returns a storage error or an optimistic conflict.
    pub async fn apply_balance_change<C: ConnectionTrait>(
        &self,
        conn: &C,
        account: &Account,
        change: Decimal,
    ) -> Result<(), LedgerError> {
        let new_balance = account.balance + change;
        let new_available = new_balance - account.blocked_balance;
        let result = accounts::Entity::update_many()
            .col_expr(accounts::Column::Balance, Expr::value(new_balance))
            .col_expr(accounts::Column::AvailableBalance, Expr::value(new_available))
            .col_expr(accounts::Column::Version, Expr::value(account.version + 1))
            .col_expr(accounts::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(accounts::Column::Id.eq(account.id.into_inner()))
            .filter(accounts::Column::Version.eq(account.version))
            .exec(conn)
            .await
            .map_err(store::map_db_err)?;

        if result.rows_affected == 0 {
            let actual = accounts::Entity::find_by_id(account.id.into_inner())
                .one(conn)
                .await
                .map_err(store::map_db_err)?
                .map_or(0, |row| row.version);
            return Err(LedgerError::OptimisticConflict {
                account_id: account.id.into_inner(),
                expected: account.version,
                actual,
            });
        }
        Ok(())
    }

    /// Fetches the customer's wallet for a currency.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::AccountNotFound`] when no wallet exists.
    pub async fn get_customer_account<C: ConnectionTrait>(
        &self,
        conn: &C,
        tenant_id: TenantId,
        customer_id: CustomerId,
        currency: &CurrencyCode,
    ) -> Result<Account, LedgerError> {
        accounts::Entity::find()
            .filter(accounts::Column::TenantId.eq(tenant_id.into_inner()))
            .filter(accounts::Column::CustomerId.eq(customer_id.into_inner()))
            .filter(accounts::Column::Currency.eq(currency.as_str()))
            .one(conn)
            .await
            .map_err(store::map_db_err)?
            .ok_or(LedgerError::AccountNotFound(customer_id.into_inner()))?
            .into_domain()
    }

    /// Lists all accounts for a tenant.
    ///
    /// # Errors
    ///
    /// Returns a storage error when the query fails.
    pub async fn list_for_tenant<C: ConnectionTrait>(
        &self,
        conn: &C,
        tenant_id: TenantId,
    ) -> Result<Vec<Account>, LedgerError> {
        let rows = accounts::Entity::find()
            .filter(accounts::Column::TenantId.eq(tenant_id.into_inner()))
            .order_by_asc(accounts::Column::AccountNumber)
            .all(conn)
            .await
            .map_err(store::map_db_err)?;
        rows.into_iter().map(accounts::Model::into_domain).collect()
    }

    /// Deactivates an account so it rejects further postings.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::AccountNotFound`] when the account does
    /// not belong to the tenant.
    pub async fn deactivate<C: ConnectionTrait>(
        &self,
        conn: &C,
        tenant_id: TenantId,
        account_id: Uuid,
    ) -> Result<(), LedgerError> {
        let result = accounts::Entity::update_many()
            .col_expr(accounts::Column::IsActive, Expr::value(false))
            .col_expr(accounts::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(accounts::Column::Id.eq(account_id))
            .filter(accounts::Column::TenantId.eq(tenant_id.into_inner()))
            .exec(conn)
            .await
            .map_err(store::map_db_err)?;
        if result.rows_affected == 0 {
            return Err(LedgerError::AccountNotFound(account_id));
        }
        Ok(())
    }

    /// Allocates the next account number for a tenant and type.
    ///
    /// A concurrent allocation of the same number is caught by the
    /// unique index and retried as transient.
    async fn next_account_number<C: ConnectionTrait>(
        &self,
        conn: &C,
        tenant_id: TenantId,
        account_type: AccountType,
    ) -> Result<String, LedgerError> {
        let count = accounts::Entity::find()
            .filter(accounts::Column::TenantId.eq(tenant_id.into_inner()))
            .filter(accounts::Column::AccountType.eq(crate::entities::sea_orm_active_enums::AccountType::from(account_type)))
            .count(conn)
            .await
            .map_err(store::map_db_err)?;
        let sequence = i64::try_from(count)
            .map_err(|_| LedgerError::Internal("account sequence overflow".to_string()))?
            + 1;
        Ok(format_account_number(account_type, sequence))
    }
}
