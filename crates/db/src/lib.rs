//! Storage layer with `SeaORM` entities and repositories.
//!
//! This crate provides:
//! - `SeaORM` entity definitions for the four ledger tables
//! - Repository abstractions for data access
//! - The ledger orchestrator driving transactional postings
//! - Database migrations

pub mod entities;
pub mod migration;
pub mod orchestrator;
pub mod repositories;
pub mod store;

pub use orchestrator::LedgerOrchestrator;
pub use repositories::{
    AccountRepository, AuditRepository, LedgerEntryRepository, ReportRepository,
    TransactionRepository,
};

use std::time::Duration;

use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};

use fintra_shared::config::DatabaseConfig;

/// Establishes a pooled connection to the database.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect(config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(config.url());
    options
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_timeout(Duration::from_millis(config.acquire_timeout_ms))
        .idle_timeout(Duration::from_millis(config.idle_timeout_ms))
        .sqlx_logging(false);
    Database::connect(options).await
}
