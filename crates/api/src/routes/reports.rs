//! Report routes.

use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use uuid::Uuid;

use fintra_core::reports::{ReportError, ReportKind};

use crate::error::ApiError;
use crate::AppState;

/// Creates the report routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/tenants/{tenant_id}/reports/{kind}", get(generate_report))
}

/// Query parameters for report generation.
#[derive(Debug, Default, Deserialize)]
pub struct ReportQuery {
    /// Point in time for trial balance and reconciliation; defaults to
    /// now.
    pub as_of: Option<DateTime<Utc>>,
    /// Summary period start; defaults to 30 days before the end.
    pub period_start: Option<DateTime<Utc>>,
    /// Summary period end; defaults to now.
    pub period_end: Option<DateTime<Utc>>,
}

/// GET `/tenants/{tenant_id}/reports/{kind}`
///
/// `kind` is one of `trial_balance`, `transaction_summary`, or
/// `account_reconciliation`.
async fn generate_report(
    State(state): State<AppState>,
    Path((tenant_id, kind)): Path<(Uuid, String)>,
    Query(query): Query<ReportQuery>,
) -> Result<Response, ApiError> {
    let kind = ReportKind::parse(&kind)?;
    let tenant_id = tenant_id.into();
    match kind {
        ReportKind::TrialBalance => {
            let report = state.orchestrator.trial_balance(tenant_id, query.as_of).await?;
            Ok(Json(report).into_response())
        }
        ReportKind::TransactionSummary => {
            let period_end = query.period_end.unwrap_or_else(Utc::now);
            let period_start = query
                .period_start
                .unwrap_or_else(|| period_end - Duration::days(30));
            if period_end < period_start {
                return Err(ReportError::InvalidDateRange {
                    start: period_start,
                    end: period_end,
                }
                .into());
            }
            let report = state
                .orchestrator
                .transaction_summary(tenant_id, period_start, period_end)
                .await?;
            Ok(Json(report).into_response())
        }
        ReportKind::AccountReconciliation => {
            let report = state.orchestrator.account_reconciliation(tenant_id).await?;
            Ok(Json(report).into_response())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_kind_parses_all_routes() {
        for kind in [
            "trial_balance",
            "transaction_summary",
            "account_reconciliation",
        ] {
            assert!(ReportKind::parse(kind).is_ok(), "{kind} must parse");
        }
        assert!(ReportKind::parse("balance_sheet").is_err());
    }

    #[test]
    fn test_default_period_is_30_days() {
        let query = ReportQuery::default();
        let end = query.period_end.unwrap_or_else(Utc::now);
        let start = query
            .period_start
            .unwrap_or_else(|| end - Duration::days(30));
        assert_eq!(end - start, Duration::days(30));
    }
}
