//! Account and balance routes.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use uuid::Uuid;

use fintra_core::ledger::{Account, LedgerError};
use fintra_db::orchestrator::BalanceView;
use fintra_shared::types::CurrencyCode;

use crate::error::ApiError;
use crate::AppState;

/// Creates the account routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/tenants/{tenant_id}/accounts", get(list_accounts))
        .route(
            "/tenants/{tenant_id}/accounts/{account_id}/deactivate",
            post(deactivate_account),
        )
        .route(
            "/tenants/{tenant_id}/customers/{customer_id}/balances/{currency}",
            get(get_balance),
        )
        .route("/tenants/{tenant_id}/bootstrap", post(bootstrap_tenant))
}

/// Request body for deactivating an account.
#[derive(Debug, Deserialize)]
pub struct DeactivateRequest {
    /// Acting user.
    pub deactivated_by: Uuid,
}

/// Request body for bootstrapping a tenant's system accounts.
#[derive(Debug, Deserialize)]
pub struct BootstrapRequest {
    /// Currencies to create system accounts for.
    pub currencies: Vec<String>,
    /// Acting user.
    pub created_by: Uuid,
}

/// GET `/tenants/{tenant_id}/accounts`
async fn list_accounts(
    State(state): State<AppState>,
    Path(tenant_id): Path<Uuid>,
) -> Result<Json<Vec<Account>>, ApiError> {
    let accounts = state.orchestrator.list_accounts(tenant_id.into()).await?;
    Ok(Json(accounts))
}

/// POST `/tenants/{tenant_id}/accounts/{account_id}/deactivate`
async fn deactivate_account(
    State(state): State<AppState>,
    Path((tenant_id, account_id)): Path<(Uuid, Uuid)>,
    Json(body): Json<DeactivateRequest>,
) -> Result<StatusCode, ApiError> {
    state
        .orchestrator
        .deactivate_account(tenant_id.into(), account_id, body.deactivated_by.into())
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET `/tenants/{tenant_id}/customers/{customer_id}/balances/{currency}`
async fn get_balance(
    State(state): State<AppState>,
    Path((tenant_id, customer_id, currency)): Path<(Uuid, Uuid, String)>,
) -> Result<Json<BalanceView>, ApiError> {
    let currency = CurrencyCode::parse(&currency)
        .map_err(|err| ApiError(LedgerError::InvalidInput(err.to_string())))?;
    let balance = state
        .orchestrator
        .get_balance(tenant_id.into(), customer_id.into(), &currency)
        .await?;
    Ok(Json(balance))
}

/// POST `/tenants/{tenant_id}/bootstrap`
async fn bootstrap_tenant(
    State(state): State<AppState>,
    Path(tenant_id): Path<Uuid>,
    Json(body): Json<BootstrapRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let currencies = body
        .currencies
        .iter()
        .map(|raw| {
            CurrencyCode::parse(raw)
                .map_err(|err| ApiError(LedgerError::InvalidInput(err.to_string())))
        })
        .collect::<Result<Vec<_>, _>>()?;
    let created = state
        .orchestrator
        .bootstrap_tenant(tenant_id.into(), &currencies, body.created_by.into())
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}
