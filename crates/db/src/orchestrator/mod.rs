//! Transaction orchestrator.
//!
//! Drives the full posting flow for deposits, withdrawals, and currency
//! exchanges: header creation with reference idempotency, the status
//! state machine, account row locking in deterministic order, balanced
//! entry posting under REPEATABLE READ, invariant verification before
//! commit, bounded retry of concurrency failures, and best-effort audit
//! after commit.
//!
//! The header is committed standalone before posting begins, so a
//! failed posting leaves a FAILED header with zero entries, and a
//! crashed process leaves a PENDING header an operator can cancel.

pub mod retry;

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{ConnectionTrait, DatabaseConnection, DatabaseTransaction};
use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

use fintra_core::audit::{AuditAction, AuditEvent, AuditMetadata, AuditRecord};
use fintra_core::invariant;
use fintra_core::ledger::account::{Account, SystemAccountKind};
use fintra_core::ledger::error::LedgerError;
use fintra_core::ledger::posting::{
    ExchangeAccounts, ExchangeAmounts, PlannedEntry, PostingAccount, PostingPlanner,
};
use fintra_core::ledger::transaction::{
    FinancialTransaction, TransactionStatus, TransactionType,
};
use fintra_core::ledger::types::{DepositInput, ExchangeInput, WithdrawalInput};
use fintra_core::ledger::validation;
use fintra_core::reports::{
    AccountReconciliationReport, ReportService, TransactionSummaryReport, TrialBalanceReport,
};
use fintra_shared::config::AppConfig;
use fintra_shared::types::{
    AccountId, CurrencyCode, CustomerId, PageRequest, TenantId, TransactionId, UserId,
};

use crate::repositories::{
    AccountRepository, AuditRepository, LedgerEntryRepository, NewTransaction, ReportRepository,
    TransactionDetail, TransactionFilter, TransactionRepository,
};
use crate::store;
use retry::RetryPolicy;

/// Balance snapshot for one customer wallet.
///
/// `ledger_balance` is replayed from posted entries; it matches
/// `balance` on a consistent ledger.
#[derive(Debug, Clone, Serialize)]
pub struct BalanceView {
    /// Wallet account id.
    pub account_id: AccountId,
    /// Wallet account number.
    pub account_number: String,
    /// Wallet currency.
    pub currency: CurrencyCode,
    /// Denormalized balance.
    pub balance: Decimal,
    /// Balance minus blocked funds.
    pub available_balance: Decimal,
    /// Funds under hold.
    pub blocked_balance: Decimal,
    /// Balance replayed from posted entries.
    pub ledger_balance: Decimal,
    /// True when the replayed and recorded balances agree.
    pub is_consistent: bool,
    /// Last account mutation.
    pub updated_at: DateTime<Utc>,
}

/// Drives ledger use-cases against the repositories.
#[derive(Debug, Clone)]
pub struct LedgerOrchestrator {
    db: DatabaseConnection,
    accounts: AccountRepository,
    transactions: TransactionRepository,
    entries: LedgerEntryRepository,
    audits: AuditRepository,
    reports: ReportRepository,
    high_value_threshold: Decimal,
    retry_policy: RetryPolicy,
    query_timeout: Duration,
}

impl LedgerOrchestrator {
    /// Builds an orchestrator over a pooled connection.
    #[must_use]
    pub fn new(db: DatabaseConnection, config: &AppConfig) -> Self {
        Self {
            accounts: AccountRepository::new(),
            transactions: TransactionRepository::new(),
            entries: LedgerEntryRepository::new(),
            audits: AuditRepository::new(db.clone()),
            reports: ReportRepository::new(db.clone()),
            high_value_threshold: config.ledger.high_value_threshold,
            retry_policy: RetryPolicy::from_config(&config.ledger),
            query_timeout: Duration::from_millis(config.database.query_timeout_ms),
            db,
        }
    }

    // ===================== Use-cases =====================

    /// Creates and posts a deposit.
    ///
    /// # Errors
    ///
    /// Returns validation, duplicate, or posting errors; on a posting
    /// error the header is left FAILED with no entries.
    pub async fn deposit(&self, input: DepositInput) -> Result<FinancialTransaction, LedgerError> {
        validation::validate_deposit(&input)?;
        let header = self
            .create_header(NewTransaction {
                tenant_id: input.tenant_id,
                customer_id: input.customer_id,
                transaction_type: TransactionType::Deposit,
                from_currency: input.currency.clone(),
                to_currency: input.currency.clone(),
                source_amount: input.amount,
                destination_amount: input.amount,
                exchange_rate: Decimal::ONE,
                fee_amount: Decimal::ZERO,
                fee_currency: input.currency,
                reference: input.reference,
                external_reference: input.external_reference,
                description: input.description,
                metadata: input.metadata,
                created_by: input.created_by,
            })
            .await?;
        self.run_posting(header).await
    }

    /// Creates and posts a withdrawal.
    ///
    /// # Errors
    ///
    /// Returns validation, duplicate, insufficient-funds, or posting
    /// errors.
    pub async fn withdraw(
        &self,
        input: WithdrawalInput,
    ) -> Result<FinancialTransaction, LedgerError> {
        validation::validate_withdrawal(&input)?;
        let header = self
            .create_header(NewTransaction {
                tenant_id: input.tenant_id,
                customer_id: input.customer_id,
                transaction_type: TransactionType::Withdrawal,
                from_currency: input.currency.clone(),
                to_currency: input.currency.clone(),
                source_amount: input.amount,
                destination_amount: input.amount,
                exchange_rate: Decimal::ONE,
                fee_amount: Decimal::ZERO,
                fee_currency: input.currency,
                reference: input.reference,
                external_reference: input.external_reference,
                description: input.description,
                metadata: input.metadata,
                created_by: input.created_by,
            })
            .await?;
        self.run_posting(header).await
    }

    /// Creates and posts a currency exchange (buy or sell).
    ///
    /// # Errors
    ///
    /// Returns validation, duplicate, insufficient-funds, or posting
    /// errors.
    pub async fn exchange(
        &self,
        input: ExchangeInput,
    ) -> Result<FinancialTransaction, LedgerError> {
        validation::validate_exchange(&input)?;
        let fee_currency = input
            .fee_currency
            .clone()
            .unwrap_or_else(|| input.from_currency.clone());
        let header = self
            .create_header(NewTransaction {
                tenant_id: input.tenant_id,
                customer_id: input.customer_id,
                transaction_type: input.transaction_type,
                from_currency: input.from_currency,
                to_currency: input.to_currency,
                source_amount: input.source_amount,
                destination_amount: input.destination_amount,
                exchange_rate: input.exchange_rate,
                fee_amount: input.fee_amount,
                fee_currency,
                reference: input.reference,
                external_reference: input.external_reference,
                description: input.description,
                metadata: input.metadata,
                created_by: input.created_by,
            })
            .await?;
        self.run_posting(header).await
    }

    /// Cancels a PENDING or PROCESSING transaction, or refunds a
    /// COMPLETED one by posting reversal entries.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::InvalidState`] for FAILED, CANCELLED, and
    /// REFUNDED transactions.
    pub async fn cancel(
        &self,
        tenant_id: TenantId,
        transaction_id: TransactionId,
        reason: &str,
        cancelled_by: UserId,
    ) -> Result<FinancialTransaction, LedgerError> {
        let txn = store::begin_repeatable_read(&self.db)
            .await
            .map_err(store::map_db_err)?;
        store::set_statement_timeout(&txn, self.query_timeout)
            .await
            .map_err(store::map_db_err)?;

        let header = self
            .transactions
            .get_locked(&txn, tenant_id, transaction_id)
            .await?;

        let action = match header.status {
            status if status.is_cancellable() => {
                self.transactions
                    .transition(&txn, tenant_id, transaction_id, status, TransactionStatus::Cancelled)
                    .await?;
                AuditAction::TransactionCancelled
            }
            TransactionStatus::Completed => {
                self.post_reversal(&txn, &header, reason, cancelled_by).await?;
                AuditAction::TransactionRefunded
            }
            other => {
                return Err(LedgerError::InvalidState {
                    from: other.to_string(),
                    to: TransactionStatus::Cancelled.to_string(),
                })
            }
        };
        txn.commit().await.map_err(store::map_db_err)?;

        self.audits
            .append(
                AuditEvent::for_transaction(
                    tenant_id,
                    cancelled_by,
                    action,
                    transaction_id,
                    format!("{} {}: {reason}", header.transaction_number, action),
                    header.source_amount,
                    self.high_value_threshold,
                )
                .with_values(
                    Some(json!({ "status": header.status.to_string() })),
                    Some(json!({ "reason": reason })),
                ),
            )
            .await;

        self.transactions.get(&self.db, tenant_id, transaction_id).await
    }

    /// Fetches a transaction with its entries and audit trail.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::TransactionNotFound`] when absent.
    pub async fn get_transaction(
        &self,
        tenant_id: TenantId,
        transaction_id: TransactionId,
    ) -> Result<TransactionDetail, LedgerError> {
        self.transactions
            .get_detail(&self.db, tenant_id, transaction_id)
            .await
    }

    /// Lists transactions for a tenant, newest first.
    ///
    /// # Errors
    ///
    /// Returns a storage error when the query fails.
    pub async fn list_transactions(
        &self,
        tenant_id: TenantId,
        filter: TransactionFilter,
    ) -> Result<(Vec<FinancialTransaction>, u64), LedgerError> {
        self.transactions.list(&self.db, tenant_id, filter).await
    }

    /// Returns the customer's wallet balance in one currency, with the
    /// balance replayed from posted entries alongside the recorded one.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::AccountNotFound`] when no wallet exists.
    pub async fn get_balance(
        &self,
        tenant_id: TenantId,
        customer_id: CustomerId,
        currency: &CurrencyCode,
    ) -> Result<BalanceView, LedgerError> {
        let account = self
            .accounts
            .get_customer_account(&self.db, tenant_id, customer_id, currency)
            .await?;
        let entries = self
            .entries
            .for_account(&self.db, account.id.into_inner())
            .await?;
        let reconciliation = invariant::reconcile_account(&account, &entries);
        Ok(BalanceView {
            account_id: account.id,
            account_number: account.account_number,
            currency: account.currency,
            balance: account.balance,
            available_balance: account.available_balance,
            blocked_balance: account.blocked_balance,
            ledger_balance: reconciliation.replayed_balance,
            is_consistent: reconciliation.is_consistent(),
            updated_at: account.updated_at,
        })
    }

    /// Lists all accounts for a tenant.
    ///
    /// # Errors
    ///
    /// Returns a storage error when the query fails.
    pub async fn list_accounts(&self, tenant_id: TenantId) -> Result<Vec<Account>, LedgerError> {
        self.accounts.list_for_tenant(&self.db, tenant_id).await
    }

    /// Deactivates an account so further postings against it fail.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::AccountNotFound`] when the account does
    /// not belong to the tenant.
    pub async fn deactivate_account(
        &self,
        tenant_id: TenantId,
        account_id: Uuid,
        deactivated_by: UserId,
    ) -> Result<(), LedgerError> {
        self.accounts
            .deactivate(&self.db, tenant_id, account_id)
            .await?;
        self.audits
            .append(AuditEvent {
                tenant_id,
                user_id: deactivated_by,
                action: AuditAction::AccountDeactivated,
                resource_type: "account".to_string(),
                resource_id: account_id.to_string(),
                transaction_id: None,
                description: "account deactivated".to_string(),
                old_values: Some(json!({ "is_active": true })),
                new_values: Some(json!({ "is_active": false })),
                metadata: AuditMetadata::default(),
                severity: AuditAction::AccountDeactivated.base_severity(),
            })
            .await;
        Ok(())
    }

    /// Creates the per-currency system accounts (pool, deposit
    /// liability, fee revenue) for a tenant, skipping existing ones.
    ///
    /// # Errors
    ///
    /// Returns a storage error when an insert fails.
    pub async fn bootstrap_tenant(
        &self,
        tenant_id: TenantId,
        currencies: &[CurrencyCode],
        created_by: UserId,
    ) -> Result<Vec<Account>, LedgerError> {
        let txn = store::begin_repeatable_read(&self.db)
            .await
            .map_err(store::map_db_err)?;
        let created = self
            .accounts
            .bootstrap_system_accounts(&txn, tenant_id, currencies, created_by)
            .await?;
        txn.commit().await.map_err(store::map_db_err)?;

        if !created.is_empty() {
            for account in &created {
                self.audits
                    .append(AuditEvent {
                        tenant_id,
                        user_id: created_by,
                        action: AuditAction::AccountCreated,
                        resource_type: "account".to_string(),
                        resource_id: account.account_number.clone(),
                        transaction_id: None,
                        description: format!("system account {} created", account.name),
                        old_values: None,
                        new_values: Some(json!({
                            "account_type": account.account_type.to_string(),
                            "currency": account.currency.as_str(),
                        })),
                        metadata: AuditMetadata::default(),
                        severity: AuditAction::AccountCreated.base_severity(),
                    })
                    .await;
            }
            self.audits
                .append(AuditEvent {
                    tenant_id,
                    user_id: created_by,
                    action: AuditAction::SystemBootstrap,
                    resource_type: "tenant".to_string(),
                    resource_id: tenant_id.to_string(),
                    transaction_id: None,
                    description: format!("{} system accounts bootstrapped", created.len()),
                    old_values: None,
                    new_values: None,
                    metadata: AuditMetadata::default(),
                    severity: AuditAction::SystemBootstrap.base_severity(),
                })
                .await;
        }
        Ok(created)
    }

    // ===================== Reports =====================

    /// Trial balance as of a point in time (now when omitted).
    ///
    /// # Errors
    ///
    /// Returns a storage error when a query fails.
    pub async fn trial_balance(
        &self,
        tenant_id: TenantId,
        as_of: Option<DateTime<Utc>>,
    ) -> Result<TrialBalanceReport, LedgerError> {
        let as_of_ts = as_of.unwrap_or_else(Utc::now);
        let rows = self.reports.account_activity(tenant_id, as_of).await?;
        Ok(ReportService::generate_trial_balance(as_of_ts, rows))
    }

    /// Transaction volumes grouped by type, status, and currency over a
    /// period.
    ///
    /// # Errors
    ///
    /// Returns a storage error when a query fails.
    pub async fn transaction_summary(
        &self,
        tenant_id: TenantId,
        period_start: DateTime<Utc>,
        period_end: DateTime<Utc>,
    ) -> Result<TransactionSummaryReport, LedgerError> {
        let rows = self
            .reports
            .transaction_volumes(tenant_id, period_start, period_end)
            .await?;
        Ok(ReportService::generate_transaction_summary(
            period_start,
            period_end,
            rows,
        ))
    }

    /// Per-account drift between recorded and replayed balances.
    ///
    /// # Errors
    ///
    /// Returns a storage error when a query fails.
    pub async fn account_reconciliation(
        &self,
        tenant_id: TenantId,
    ) -> Result<AccountReconciliationReport, LedgerError> {
        let rows = self.reports.reconciliation_rows(tenant_id).await?;
        Ok(ReportService::generate_account_reconciliation(
            Utc::now(),
            rows,
        ))
    }

    /// Lists audit records for a tenant, newest first.
    ///
    /// # Errors
    ///
    /// Returns a storage error when the query fails.
    pub async fn list_audits(
        &self,
        tenant_id: TenantId,
        page: PageRequest,
    ) -> Result<(Vec<AuditRecord>, u64), LedgerError> {
        self.audits.list_for_tenant(tenant_id, page).await
    }

    /// Re-attempts audit events whose original write failed. Returns
    /// the number of records written.
    pub async fn replay_audit_queue(&self) -> usize {
        self.audits.replay_pending().await
    }

    // ===================== Posting flow =====================

    /// Inserts the PENDING header on its own commit and records the
    /// creation. Duplicate references are audited and rejected here,
    /// before any posting work.
    async fn create_header(
        &self,
        input: NewTransaction,
    ) -> Result<FinancialTransaction, LedgerError> {
        let tenant_id = input.tenant_id;
        let created_by = input.created_by;
        let inserted = retry::with_retry(self.retry_policy, "insert_header", || {
            self.transactions.insert_pending(&self.db, input.clone())
        })
        .await;
        let header = match inserted {
            Ok(outcome) => outcome.value,
            Err(err) => {
                if let LedgerError::DuplicateTransaction {
                    original_transaction_id,
                } = &err
                {
                    self.audits
                        .append(AuditEvent {
                            tenant_id,
                            user_id: created_by,
                            action: AuditAction::DuplicateRejected,
                            resource_type: "transaction".to_string(),
                            resource_id: original_transaction_id.to_string(),
                            transaction_id: Some(TransactionId::from(*original_transaction_id)),
                            description: "duplicate reference rejected".to_string(),
                            old_values: None,
                            new_values: None,
                            metadata: AuditMetadata::default(),
                            severity: AuditAction::DuplicateRejected.base_severity(),
                        })
                        .await;
                }
                return Err(err);
            }
        };

        self.audits
            .append(AuditEvent::for_transaction(
                header.tenant_id,
                header.created_by,
                AuditAction::TransactionCreated,
                header.id,
                format!(
                    "{} {} created",
                    header.transaction_type, header.transaction_number
                ),
                header.source_amount,
                self.high_value_threshold,
            ))
            .await;
        Ok(header)
    }

    /// Runs the posting attempt under the retry policy, then records
    /// the final outcome.
    async fn run_posting(
        &self,
        header: FinancialTransaction,
    ) -> Result<FinancialTransaction, LedgerError> {
        let started = Instant::now();
        let result = retry::with_retry(self.retry_policy, "post_transaction", || {
            self.attempt_posting(&header)
        })
        .await;

        match result {
            Ok(outcome) => {
                if outcome.attempts > 1 {
                    self.audits
                        .append(AuditEvent::for_transaction(
                            header.tenant_id,
                            header.created_by,
                            AuditAction::RetryAttempted,
                            header.id,
                            format!(
                                "{} posted after {} attempts",
                                header.transaction_number, outcome.attempts
                            ),
                            header.source_amount,
                            self.high_value_threshold,
                        ))
                        .await;
                }
                let completed = self
                    .transactions
                    .get(&self.db, header.tenant_id, header.id)
                    .await?;
                let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
                self.audits
                    .append(
                        AuditEvent::for_transaction(
                            header.tenant_id,
                            header.created_by,
                            AuditAction::TransactionProcessed,
                            header.id,
                            format!(
                                "{} {} completed",
                                header.transaction_type, header.transaction_number
                            ),
                            header.source_amount,
                            self.high_value_threshold,
                        )
                        .with_values(
                            Some(json!({ "status": TransactionStatus::Pending.to_string() })),
                            Some(json!({ "status": completed.status.to_string() })),
                        )
                        .with_metadata(AuditMetadata {
                            processing_time_ms: Some(elapsed_ms),
                            ..AuditMetadata::default()
                        }),
                    )
                    .await;
                Ok(completed)
            }
            Err(err) => {
                self.record_failure(&header, &err).await;
                Err(err)
            }
        }
    }

    /// One posting attempt: drive the header into PROCESSING, then post
    /// entries inside a deadline-bounded transaction. A failed attempt
    /// leaves the header FAILED so a later attempt can re-open it.
    async fn attempt_posting(&self, header: &FinancialTransaction) -> Result<(), LedgerError> {
        let tenant_id = header.tenant_id;
        let id = header.id;

        let current = self.transactions.get(&self.db, tenant_id, id).await?;
        match current.status {
            TransactionStatus::Pending => {}
            TransactionStatus::Failed => {
                self.transactions
                    .transition(
                        &self.db,
                        tenant_id,
                        id,
                        TransactionStatus::Failed,
                        TransactionStatus::Pending,
                    )
                    .await?;
            }
            other => {
                return Err(LedgerError::InvalidState {
                    from: other.to_string(),
                    to: TransactionStatus::Processing.to_string(),
                })
            }
        }
        self.transactions
            .transition(
                &self.db,
                tenant_id,
                id,
                TransactionStatus::Pending,
                TransactionStatus::Processing,
            )
            .await?;

        match tokio::time::timeout(self.query_timeout, self.post_entries(header)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => {
                self.fail_processing(header).await;
                Err(err)
            }
            Err(_elapsed) => {
                self.fail_processing(header).await;
                Err(LedgerError::DeadlineExceeded)
            }
        }
    }

    /// The posting transaction: lock, check, plan, verify, write,
    /// complete, commit. Dropping the transaction on any error path
    /// rolls everything back, header transitions included.
    async fn post_entries(&self, header: &FinancialTransaction) -> Result<(), LedgerError> {
        let txn = store::begin_repeatable_read(&self.db)
            .await
            .map_err(store::map_db_err)?;
        store::set_statement_timeout(&txn, self.query_timeout)
            .await
            .map_err(store::map_db_err)?;

        let (locked, plan) = self.build_plan(&txn, header).await?;
        invariant::verify_plan(header.id, &plan)?;

        let inserted = self
            .entries
            .insert_plan(
                &txn,
                header.tenant_id,
                header.id,
                header.created_by,
                Utc::now(),
                &plan,
            )
            .await?;
        self.apply_plan_balances(&txn, &locked, &plan).await?;
        invariant::verify_double_entry(header.id, &inserted)?;

        self.transactions
            .transition(
                &txn,
                header.tenant_id,
                header.id,
                TransactionStatus::Processing,
                TransactionStatus::Completed,
            )
            .await?;
        txn.commit().await.map_err(store::map_db_err)?;
        Ok(())
    }

    /// Resolves and locks the accounts for a header and produces the
    /// balanced posting plan. Balance preconditions are checked against
    /// the locked rows, never the pre-lock reads.
    async fn build_plan(
        &self,
        txn: &DatabaseTransaction,
        header: &FinancialTransaction,
    ) -> Result<(Vec<Account>, Vec<PlannedEntry>), LedgerError> {
        match header.transaction_type {
            TransactionType::Deposit => {
                let wallet = self
                    .accounts
                    .get_or_create_customer_account(
                        txn,
                        header.tenant_id,
                        header.customer_id,
                        &header.from_currency,
                        header.created_by,
                    )
                    .await?;
                let liability = self
                    .accounts
                    .get_system_account(
                        txn,
                        header.tenant_id,
                        SystemAccountKind::Liability,
                        &header.from_currency,
                    )
                    .await?;
                let locked = self
                    .accounts
                    .lock_for_update(
                        txn,
                        vec![wallet.id.into_inner(), liability.id.into_inner()],
                    )
                    .await?;
                require_active(&locked)?;
                let plan = PostingPlanner::plan_deposit(
                    &posting_account(&locked, wallet.id)?,
                    &posting_account(&locked, liability.id)?,
                    header.source_amount,
                    &header.description,
                )?;
                Ok((locked, plan))
            }
            TransactionType::Withdrawal => {
                let wallet = self
                    .accounts
                    .get_customer_account(
                        txn,
                        header.tenant_id,
                        header.customer_id,
                        &header.from_currency,
                    )
                    .await?;
                let liability = self
                    .accounts
                    .get_system_account(
                        txn,
                        header.tenant_id,
                        SystemAccountKind::Liability,
                        &header.from_currency,
                    )
                    .await?;
                let locked = self
                    .accounts
                    .lock_for_update(
                        txn,
                        vec![wallet.id.into_inner(), liability.id.into_inner()],
                    )
                    .await?;
                require_active(&locked)?;
                require_available(&locked, wallet.id, header.source_amount)?;
                let plan = PostingPlanner::plan_withdrawal(
                    &posting_account(&locked, wallet.id)?,
                    &posting_account(&locked, liability.id)?,
                    header.source_amount,
                    &header.description,
                )?;
                Ok((locked, plan))
            }
            TransactionType::CurrencyBuy | TransactionType::CurrencySell => {
                self.build_exchange_plan(txn, header).await
            }
        }
    }

    /// Exchange plan: two customer/pool pairs plus a fee pair when a
    /// fee is charged. The available-funds check covers the source
    /// amount plus any source-side fee; buy and sell are checked alike.
    async fn build_exchange_plan(
        &self,
        txn: &DatabaseTransaction,
        header: &FinancialTransaction,
    ) -> Result<(Vec<Account>, Vec<PlannedEntry>), LedgerError> {
        let source_wallet = self
            .accounts
            .get_customer_account(
                txn,
                header.tenant_id,
                header.customer_id,
                &header.from_currency,
            )
            .await?;
        let destination_wallet = self
            .accounts
            .get_or_create_customer_account(
                txn,
                header.tenant_id,
                header.customer_id,
                &header.to_currency,
                header.created_by,
            )
            .await?;
        let source_pool = self
            .accounts
            .get_system_account(
                txn,
                header.tenant_id,
                SystemAccountKind::Pool,
                &header.from_currency,
            )
            .await?;
        let destination_pool = self
            .accounts
            .get_system_account(
                txn,
                header.tenant_id,
                SystemAccountKind::Pool,
                &header.to_currency,
            )
            .await?;

        let fee_on_source_side = header.fee_currency == header.from_currency;
        let fee_revenue = if header.fee_amount > Decimal::ZERO {
            Some(
                self.accounts
                    .get_system_account(
                        txn,
                        header.tenant_id,
                        SystemAccountKind::FeeRevenue,
                        &header.fee_currency,
                    )
                    .await?,
            )
        } else {
            None
        };

        let mut ids = vec![
            source_wallet.id.into_inner(),
            destination_wallet.id.into_inner(),
            source_pool.id.into_inner(),
            destination_pool.id.into_inner(),
        ];
        if let Some(fee_account) = &fee_revenue {
            ids.push(fee_account.id.into_inner());
        }
        let locked = self.accounts.lock_for_update(txn, ids).await?;
        require_active(&locked)?;

        let source_side_fee = if fee_on_source_side {
            header.fee_amount
        } else {
            Decimal::ZERO
        };
        let source_total = header.source_amount + source_side_fee;
        let destination_total = header.destination_amount - (header.fee_amount - source_side_fee);
        require_available(&locked, source_wallet.id, source_total)?;

        let exchange_accounts = ExchangeAccounts {
            customer_source: posting_account(&locked, source_wallet.id)?,
            source_pool: posting_account(&locked, source_pool.id)?,
            customer_destination: posting_account(&locked, destination_wallet.id)?,
            destination_pool: posting_account(&locked, destination_pool.id)?,
            fee_revenue: match &fee_revenue {
                Some(account) => Some(posting_account(&locked, account.id)?),
                None => None,
            },
        };
        let plan = PostingPlanner::plan_exchange(
            &exchange_accounts,
            ExchangeAmounts {
                source_total,
                destination_total,
                fee: header.fee_amount,
                fee_on_source_side,
            },
            &header.description,
        )?;
        Ok((locked, plan))
    }

    /// Posts reversal entries for a completed transaction under the
    /// caller's transaction and moves the header to REFUNDED.
    async fn post_reversal(
        &self,
        txn: &DatabaseTransaction,
        header: &FinancialTransaction,
        reason: &str,
        cancelled_by: UserId,
    ) -> Result<(), LedgerError> {
        let originals = self.entries.for_transaction(txn, header.id).await?;
        if originals.is_empty() {
            return Err(LedgerError::Internal(format!(
                "completed transaction {} has no entries",
                header.id
            )));
        }

        let ids = originals
            .iter()
            .map(|entry| entry.account_id.into_inner())
            .collect();
        let locked = self.accounts.lock_for_update(txn, ids).await?;

        let classified = originals
            .iter()
            .map(|entry| {
                account_by_id(&locked, entry.account_id)
                    .map(|account| (entry, account.account_type))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let plan = PostingPlanner::plan_reversal(&classified, reason);
        invariant::verify_plan(header.id, &plan)?;

        self.entries
            .insert_reversals(
                txn,
                header.tenant_id,
                header.id,
                cancelled_by,
                Utc::now(),
                &plan,
                &originals,
            )
            .await?;
        self.apply_plan_balances(txn, &locked, &plan).await?;

        self.transactions
            .transition(
                txn,
                header.tenant_id,
                header.id,
                TransactionStatus::Completed,
                TransactionStatus::Refunded,
            )
            .await
    }

    /// Applies the plan's net balance change to each locked account,
    /// in ascending account id order, one version bump per account.
    async fn apply_plan_balances<C: ConnectionTrait>(
        &self,
        conn: &C,
        locked: &[Account],
        plan: &[PlannedEntry],
    ) -> Result<(), LedgerError> {
        let mut changes: BTreeMap<Uuid, Decimal> = BTreeMap::new();
        for entry in plan {
            *changes.entry(entry.account_id.into_inner()).or_default() += entry.balance_change();
        }
        for (account_id, change) in changes {
            let account = account_by_id(locked, AccountId::from(account_id))?;
            self.accounts
                .apply_balance_change(conn, account, change)
                .await?;
        }
        Ok(())
    }

    /// Best-effort PROCESSING -> FAILED after a rolled-back attempt.
    async fn fail_processing(&self, header: &FinancialTransaction) {
        if let Err(err) = self
            .transactions
            .transition(
                &self.db,
                header.tenant_id,
                header.id,
                TransactionStatus::Processing,
                TransactionStatus::Failed,
            )
            .await
        {
            tracing::error!(
                transaction_id = %header.id,
                error = %err,
                "could not mark transaction failed"
            );
        }
    }

    /// Records the final failure of a posting, escalating integrity
    /// violations to their own action and the error's severity.
    async fn record_failure(&self, header: &FinancialTransaction, err: &LedgerError) {
        let action = if matches!(err, LedgerError::DoubleEntryViolation { .. }) {
            AuditAction::IntegrityViolation
        } else {
            AuditAction::TransactionFailed
        };
        let event = AuditEvent::for_transaction(
            header.tenant_id,
            header.created_by,
            action,
            header.id,
            format!(
                "{} {} failed: {err}",
                header.transaction_type, header.transaction_number
            ),
            header.source_amount,
            self.high_value_threshold,
        )
        .with_values(
            None,
            Some(json!({
                "status": TransactionStatus::Failed.to_string(),
                "error_code": err.error_code(),
            })),
        );
        let severity = event.severity.max(err.audit_severity());
        self.audits.append(event.with_severity(severity)).await;
    }
}

/// Rejects posting against a deactivated account.
fn require_active(accounts: &[Account]) -> Result<(), LedgerError> {
    for account in accounts {
        if !account.is_active {
            return Err(LedgerError::InvalidInput(format!(
                "account {} is inactive",
                account.account_number
            )));
        }
    }
    Ok(())
}

/// Checks the available balance of one locked account.
fn require_available(
    accounts: &[Account],
    account_id: AccountId,
    requested: Decimal,
) -> Result<(), LedgerError> {
    let account = account_by_id(accounts, account_id)?;
    if account.available_balance < requested {
        return Err(LedgerError::InsufficientFunds {
            available: account.available_balance,
            requested,
        });
    }
    Ok(())
}

fn account_by_id(accounts: &[Account], account_id: AccountId) -> Result<&Account, LedgerError> {
    accounts
        .iter()
        .find(|account| account.id == account_id)
        .ok_or(LedgerError::AccountNotFound(account_id.into_inner()))
}

fn posting_account(accounts: &[Account], account_id: AccountId) -> Result<PostingAccount, LedgerError> {
    let account = account_by_id(accounts, account_id)?;
    Ok(PostingAccount {
        id: account.id,
        account_type: account.account_type,
        currency: account.currency.clone(),
    })
}
