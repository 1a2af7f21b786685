//! Database migration runner for Fintra.
//!
//! Usage:
//!   migrator up      - Run all pending migrations
//!   migrator down    - Rollback last migration
//!   migrator status  - Show migration status
//!   migrator fresh   - Drop all tables and re-run migrations
//!
//! With `DB_FORCE_SYNC=true` in development mode, the schema is
//! dropped and recreated unconditionally, skipping the CLI.

use sea_orm_migration::prelude::*;

use fintra_db::migration::Migrator;
use fintra_shared::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;
    if config.allow_force_sync() {
        let db = fintra_db::connect(&config.database).await?;
        Migrator::fresh(&db).await?;
        println!("Schema force-synced (fresh)");
        return Ok(());
    }

    // Run the migrator CLI (it sets up its own tracing)
    cli::run_cli(Migrator).await;
    Ok(())
}
