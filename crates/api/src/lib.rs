//! HTTP API layer with Axum routes.
//!
//! This crate provides:
//! - REST API routes for transactions, balances, accounts, and reports
//! - The ledger error to HTTP response mapping
//! - Request/response DTOs with decimals serialized as strings

pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use sea_orm::DatabaseConnection;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use fintra_db::LedgerOrchestrator;
use fintra_shared::AppConfig;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool, used directly by the health check.
    pub db: Arc<DatabaseConnection>,
    /// The ledger orchestrator behind every business route.
    pub orchestrator: Arc<LedgerOrchestrator>,
}

impl AppState {
    /// Builds the state from a pooled connection and configuration.
    #[must_use]
    pub fn new(db: DatabaseConnection, config: &AppConfig) -> Self {
        Self {
            orchestrator: Arc::new(LedgerOrchestrator::new(db.clone(), config)),
            db: Arc::new(db),
        }
    }
}

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", routes::api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
