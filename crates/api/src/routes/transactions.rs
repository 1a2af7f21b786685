//! Transaction routes: deposits, withdrawals, exchanges, cancellation.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use fintra_core::audit::AuditRecord;
use fintra_core::ledger::transaction::{
    FinancialTransaction, TransactionStatus, TransactionType,
};
use fintra_core::ledger::types::{DepositInput, ExchangeInput, WithdrawalInput};
use fintra_core::ledger::LedgerError;
use fintra_db::repositories::TransactionFilter;
use fintra_shared::types::{CurrencyCode, PageRequest, PageResponse};

use crate::error::ApiError;
use crate::AppState;

/// Creates the transaction routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/tenants/{tenant_id}/transactions/deposit",
            post(create_deposit),
        )
        .route(
            "/tenants/{tenant_id}/transactions/withdrawal",
            post(create_withdrawal),
        )
        .route(
            "/tenants/{tenant_id}/transactions/exchange",
            post(create_exchange),
        )
        .route("/tenants/{tenant_id}/transactions", get(list_transactions))
        .route(
            "/tenants/{tenant_id}/transactions/{transaction_id}",
            get(get_transaction),
        )
        .route(
            "/tenants/{tenant_id}/transactions/{transaction_id}/cancel",
            post(cancel_transaction),
        )
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for a deposit.
#[derive(Debug, Deserialize)]
pub struct DepositRequest {
    /// Customer receiving the funds.
    pub customer_id: Uuid,
    /// Currency code (ISO 4217).
    pub currency: String,
    /// Amount as a decimal string.
    pub amount: Decimal,
    /// Description.
    pub description: String,
    /// Idempotency reference.
    pub reference: Option<String>,
    /// External system reference.
    pub external_reference: Option<String>,
    /// Free-form metadata.
    #[serde(default)]
    pub metadata: serde_json::Value,
    /// Acting user.
    pub created_by: Uuid,
}

/// Request body for a withdrawal; same shape as a deposit.
pub type WithdrawalRequest = DepositRequest;

/// Request body for a currency exchange.
#[derive(Debug, Deserialize)]
pub struct ExchangeRequest {
    /// Customer performing the exchange.
    pub customer_id: Uuid,
    /// `currency_buy` or `currency_sell`.
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    /// Currency the customer pays with.
    pub from_currency: String,
    /// Currency the customer receives.
    pub to_currency: String,
    /// Amount leaving the source account.
    pub source_amount: Decimal,
    /// Amount arriving on the destination account.
    pub destination_amount: Decimal,
    /// Rate transacted at.
    pub exchange_rate: Decimal,
    /// Fee charged; zero when absent.
    #[serde(default)]
    pub fee_amount: Decimal,
    /// Currency the fee is charged in.
    pub fee_currency: Option<String>,
    /// Description.
    pub description: String,
    /// Idempotency reference.
    pub reference: Option<String>,
    /// External system reference.
    pub external_reference: Option<String>,
    /// Free-form metadata.
    #[serde(default)]
    pub metadata: serde_json::Value,
    /// Acting user.
    pub created_by: Uuid,
}

/// Request body for cancelling or refunding a transaction.
#[derive(Debug, Deserialize)]
pub struct CancelRequest {
    /// Why the transaction is being cancelled.
    pub reason: String,
    /// Acting user.
    pub cancelled_by: Uuid,
}

/// Query parameters for listing transactions.
#[derive(Debug, Deserialize)]
pub struct ListTransactionsQuery {
    /// Filter by customer.
    pub customer_id: Option<Uuid>,
    /// Filter by status.
    pub status: Option<TransactionStatus>,
    /// Filter by transaction type.
    #[serde(rename = "type")]
    pub transaction_type: Option<TransactionType>,
    /// Page number (1-indexed).
    pub page: Option<u32>,
    /// Page size (default 50, max 100).
    pub per_page: Option<u32>,
}

impl ListTransactionsQuery {
    fn page_request(&self) -> PageRequest {
        let defaults = PageRequest::default();
        PageRequest {
            page: self.page.unwrap_or(defaults.page),
            per_page: self.per_page.unwrap_or(defaults.per_page),
        }
    }
}

/// A transaction with its entries and audit trail.
#[derive(Debug, Serialize)]
pub struct TransactionDetailResponse {
    /// Transaction header.
    pub transaction: FinancialTransaction,
    /// Posted ledger entries, in entry order.
    pub entries: Vec<fintra_core::ledger::LedgerEntry>,
    /// Audit records, oldest first.
    pub audits: Vec<AuditRecord>,
}

// ============================================================================
// Route Handlers
// ============================================================================

fn parse_currency(raw: &str) -> Result<CurrencyCode, ApiError> {
    CurrencyCode::parse(raw)
        .map_err(|err| ApiError(LedgerError::InvalidInput(err.to_string())))
}

/// POST `/tenants/{tenant_id}/transactions/deposit`
async fn create_deposit(
    State(state): State<AppState>,
    Path(tenant_id): Path<Uuid>,
    Json(body): Json<DepositRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let input = DepositInput {
        tenant_id: tenant_id.into(),
        customer_id: body.customer_id.into(),
        currency: parse_currency(&body.currency)?,
        amount: body.amount,
        description: body.description,
        reference: body.reference,
        external_reference: body.external_reference,
        metadata: body.metadata,
        created_by: body.created_by.into(),
    };
    let transaction = state.orchestrator.deposit(input).await?;
    Ok((StatusCode::CREATED, Json(transaction)))
}

/// POST `/tenants/{tenant_id}/transactions/withdrawal`
async fn create_withdrawal(
    State(state): State<AppState>,
    Path(tenant_id): Path<Uuid>,
    Json(body): Json<WithdrawalRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let input = WithdrawalInput {
        tenant_id: tenant_id.into(),
        customer_id: body.customer_id.into(),
        currency: parse_currency(&body.currency)?,
        amount: body.amount,
        description: body.description,
        reference: body.reference,
        external_reference: body.external_reference,
        metadata: body.metadata,
        created_by: body.created_by.into(),
    };
    let transaction = state.orchestrator.withdraw(input).await?;
    Ok((StatusCode::CREATED, Json(transaction)))
}

/// POST `/tenants/{tenant_id}/transactions/exchange`
async fn create_exchange(
    State(state): State<AppState>,
    Path(tenant_id): Path<Uuid>,
    Json(body): Json<ExchangeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let fee_currency = match &body.fee_currency {
        Some(raw) => Some(parse_currency(raw)?),
        None => None,
    };
    let input = ExchangeInput {
        tenant_id: tenant_id.into(),
        customer_id: body.customer_id.into(),
        transaction_type: body.transaction_type,
        from_currency: parse_currency(&body.from_currency)?,
        to_currency: parse_currency(&body.to_currency)?,
        source_amount: body.source_amount,
        destination_amount: body.destination_amount,
        exchange_rate: body.exchange_rate,
        fee_amount: body.fee_amount,
        fee_currency,
        description: body.description,
        reference: body.reference,
        external_reference: body.external_reference,
        metadata: body.metadata,
        created_by: body.created_by.into(),
    };
    let transaction = state.orchestrator.exchange(input).await?;
    Ok((StatusCode::CREATED, Json(transaction)))
}

/// GET `/tenants/{tenant_id}/transactions`
async fn list_transactions(
    State(state): State<AppState>,
    Path(tenant_id): Path<Uuid>,
    Query(query): Query<ListTransactionsQuery>,
) -> Result<Json<PageResponse<FinancialTransaction>>, ApiError> {
    let page = query.page_request();
    let filter = TransactionFilter {
        customer_id: query.customer_id.map(Into::into),
        status: query.status,
        transaction_type: query.transaction_type,
        page: page.clone(),
    };
    let (transactions, total) = state
        .orchestrator
        .list_transactions(tenant_id.into(), filter)
        .await?;
    Ok(Json(PageResponse::new(
        transactions,
        page.page,
        page.per_page,
        total,
    )))
}

/// GET `/tenants/{tenant_id}/transactions/{transaction_id}`
async fn get_transaction(
    State(state): State<AppState>,
    Path((tenant_id, transaction_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<TransactionDetailResponse>, ApiError> {
    let detail = state
        .orchestrator
        .get_transaction(tenant_id.into(), transaction_id.into())
        .await?;
    Ok(Json(TransactionDetailResponse {
        transaction: detail.transaction,
        entries: detail.entries,
        audits: detail.audits,
    }))
}

/// POST `/tenants/{tenant_id}/transactions/{transaction_id}/cancel`
async fn cancel_transaction(
    State(state): State<AppState>,
    Path((tenant_id, transaction_id)): Path<(Uuid, Uuid)>,
    Json(body): Json<CancelRequest>,
) -> Result<Json<FinancialTransaction>, ApiError> {
    let transaction = state
        .orchestrator
        .cancel(
            tenant_id.into(),
            transaction_id.into(),
            &body.reason,
            body.cancelled_by.into(),
        )
        .await?;
    Ok(Json(transaction))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("USD", true)]
    #[case("eur", true)]
    #[case("DOLLARS", false)]
    #[case("", false)]
    fn test_parse_currency(#[case] raw: &str, #[case] ok: bool) {
        assert_eq!(parse_currency(raw).is_ok(), ok);
    }

    #[test]
    fn test_exchange_request_deserializes() {
        let body: ExchangeRequest = serde_json::from_value(serde_json::json!({
            "customer_id": "0191c8a0-0000-7000-8000-000000000001",
            "type": "currency_sell",
            "from_currency": "USD",
            "to_currency": "EUR",
            "source_amount": "500",
            "destination_amount": "425",
            "exchange_rate": "0.85",
            "fee_amount": "5",
            "fee_currency": "USD",
            "description": "sell",
            "created_by": "0191c8a0-0000-7000-8000-000000000002"
        }))
        .expect("valid body");
        assert_eq!(body.transaction_type, TransactionType::CurrencySell);
        assert_eq!(body.fee_currency.as_deref(), Some("USD"));
    }

    #[test]
    fn test_list_query_defaults() {
        let query: ListTransactionsQuery =
            serde_json::from_value(serde_json::json!({})).expect("empty query");
        assert!(query.status.is_none());
        let page = query.page_request();
        assert_eq!(page.page, 1);
        assert_eq!(page.per_page, 50);
    }
}
