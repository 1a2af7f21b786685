//! Audit trail routes.

use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};
use uuid::Uuid;

use fintra_core::audit::AuditRecord;
use fintra_shared::types::{PageRequest, PageResponse};

use crate::error::ApiError;
use crate::AppState;

/// Creates the audit routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/tenants/{tenant_id}/audits", get(list_audits))
}

/// GET `/tenants/{tenant_id}/audits`
async fn list_audits(
    State(state): State<AppState>,
    Path(tenant_id): Path<Uuid>,
    Query(page): Query<PageRequest>,
) -> Result<Json<PageResponse<AuditRecord>>, ApiError> {
    let (records, total) = state
        .orchestrator
        .list_audits(tenant_id.into(), page.clone())
        .await?;
    Ok(Json(PageResponse::new(
        records,
        page.page,
        page.per_page,
        total,
    )))
}
