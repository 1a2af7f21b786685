//! Ledger error to HTTP response mapping.
//!
//! Response bodies are `{ "error": CODE, "message": ... }`. Server-side
//! failures are logged with their detail and answered with a generic
//! message; nothing from SQL or the storage layer leaks to clients.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use fintra_core::ledger::error::LedgerError;
use fintra_core::reports::ReportError;

/// Error wrapper carrying a ledger error to the HTTP boundary.
#[derive(Debug)]
pub struct ApiError(pub LedgerError);

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        Self(err)
    }
}

impl From<ReportError> for ApiError {
    fn from(err: ReportError) -> Self {
        Self(LedgerError::InvalidInput(err.to_string()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.http_status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let message = if status.is_server_error() {
            tracing::error!(error = %self.0, code = self.0.error_code(), "request failed");
            "An internal error occurred".to_string()
        } else {
            self.0.to_string()
        };
        (
            status,
            Json(json!({
                "error": self.0.error_code(),
                "message": message,
            })),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_insufficient_funds_is_unprocessable() {
        let response = ApiError(LedgerError::InsufficientFunds {
            available: dec!(10),
            requested: dec!(20),
        })
        .into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn test_duplicate_is_conflict() {
        let response = ApiError(LedgerError::DuplicateTransaction {
            original_transaction_id: uuid::Uuid::nil(),
        })
        .into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_storage_errors_are_internal() {
        let response = ApiError(LedgerError::Database("connection reset".to_string()))
            .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_report_error_is_bad_request() {
        let err: ApiError = ReportError::InvalidKind("bogus".to_string()).into();
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
