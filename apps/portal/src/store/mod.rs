use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use sea_orm::DatabaseConnection;
use std::time::Duration;
use tracing::instrument;

pub mod investments;
pub mod members;
pub mod proposals;

// Use a OnceCell for safe, one-time initialization.
pub static DB: OnceCell<DatabaseConnection> = OnceCell::new();

/// Initializes the database connection pool.
/// Reads the DATABASE_URL from environment variables.
#[instrument]
pub async fn initialize_db() -> Result<()> {
    let database_url =
        std::env::var("DATABASE_URL").context("DATABASE_URL environment variable not set")?;

    let mut opt = sea_orm::ConnectOptions::new(database_url);
    opt.max_connections(10)
        .min_connections(5)
        .connect_timeout(Duration::from_secs(8))
        .acquire_timeout(Duration::from_secs(8))
        .idle_timeout(Duration::from_secs(5 * 60))
        .max_lifetime(Duration::from_secs(30 * 60))
        .sqlx_logging(false);

    let db = sea_orm::Database::connect(opt)
        .await
        .context("Failed to connect to the database")?;

    DB.set(db)
        .map_err(|_| anyhow::anyhow!("Failed to set database connection"))
}

/// Retrieves the global database connection.
/// Panics if the database is not initialized.
#[inline(always)]
pub fn db() -> &'static DatabaseConnection {
    DB.get()
        .expect("Database connection not initialized. Call initialize_db first.")
}
