//! Router-level tests driven through `tower::ServiceExt::oneshot`.
//!
//! These run against a disconnected database handle, so they cover the
//! routing, extraction, and error-mapping layers without touching
//! PostgreSQL.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use sea_orm::DatabaseConnection;
use tower::ServiceExt;
use uuid::Uuid;

use fintra_api::{create_router, AppState};
use fintra_shared::config::{AppConfig, DatabaseConfig, LedgerConfig, ServerConfig};

fn test_app() -> axum::Router {
    let config = AppConfig {
        server: ServerConfig::default(),
        database: DatabaseConfig::default(),
        ledger: LedgerConfig::default(),
    };
    create_router(AppState::new(DatabaseConnection::default(), &config))
}

async fn get(app: axum::Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri(uri)
                .body(Body::empty())
                .expect("request must build"),
        )
        .await
        .expect("router must respond");
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body must collect")
        .to_bytes();
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("body must be JSON")
    };
    (status, json)
}

#[tokio::test]
async fn test_health_reports_connection_down() {
    let (status, body) = get(test_app(), "/api/v1/health").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["connection"], "down");
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn test_unknown_report_kind_is_rejected() {
    let tenant_id = Uuid::new_v4();
    let (status, body) = get(
        test_app(),
        &format!("/api/v1/tenants/{tenant_id}/reports/balance_sheet"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "INVALID_INPUT");
}

#[tokio::test]
async fn test_malformed_transaction_id_is_rejected() {
    let tenant_id = Uuid::new_v4();
    let (status, _body) = get(
        test_app(),
        &format!("/api/v1/tenants/{tenant_id}/transactions/not-a-uuid"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_route_returns_404() {
    let (status, _body) = get(test_app(), "/api/v1/nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
