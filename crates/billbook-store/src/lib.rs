//! # billbook-store — Transaction Sources
//!
//! Implementations of [`billbook_core::TransactionSource`]:
//!
//! - [`PgTransactionSource`] reads companies, expenses and incomes from
//!   PostgreSQL via SQLx.
//! - [`MemorySource`] keeps everything in memory; used by tests and by the
//!   CLI when exporting from a JSON fixture.
//!
//! ## Database Mode
//!
//! The database is **optional** for the API. When `DATABASE_URL` is unset
//! the service starts without a data source and export requests answer
//! 503. The bookkeeping application owns the schema; the bundled
//! migration only mirrors the columns the export reads.

pub mod memory;
pub mod pg;

pub use memory::{Fixture, FixtureCompany, MemorySource};
pub use pg::PgTransactionSource;

use sqlx::postgres::{PgPool, PgPoolOptions};

/// Connect to PostgreSQL.
pub async fn init_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(20)
        .min_connections(2)
        .acquire_timeout(std::time::Duration::from_secs(5))
        .connect(database_url)
        .await?;

    tracing::info!("Connected to PostgreSQL");
    Ok(pool)
}

/// Apply the bundled schema migration.
pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    tracing::info!("Database migrations applied");
    Ok(())
}
