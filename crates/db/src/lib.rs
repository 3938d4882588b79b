//! Postgres storage for CommunityWatch.
//!
//! Five tables back the site: `user`, `issue`, `comment`, `upvote` and
//! `notification`. Deleting an issue cascades to its comments and votes.

pub mod entities;
pub mod migrations;
pub mod repositories;
pub mod test_utils;

use communitywatch_common::{AppError, Config, config::DatabaseConfig};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use std::time::Duration;
use tracing::log::LevelFilter;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const IDLE_TIMEOUT: Duration = Duration::from_secs(600);
const MAX_LIFETIME: Duration = Duration::from_secs(1800);

/// Pool settings for the configured database.
#[must_use]
pub fn connect_options(database: &DatabaseConfig) -> ConnectOptions {
    let mut opt = ConnectOptions::new(&database.url);
    opt.max_connections(database.max_connections)
        .min_connections(database.min_connections.min(database.max_connections))
        .connect_timeout(CONNECT_TIMEOUT)
        .acquire_timeout(CONNECT_TIMEOUT)
        .idle_timeout(IDLE_TIMEOUT)
        .max_lifetime(MAX_LIFETIME)
        .sqlx_logging(true)
        .sqlx_logging_level(LevelFilter::Debug);
    opt
}

/// Open the connection pool.
pub async fn init(config: &Config) -> Result<DatabaseConnection, AppError> {
    let db = Database::connect(connect_options(&config.database))
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;
    tracing::info!(
        max_connections = config.database.max_connections,
        "Database pool ready"
    );
    Ok(db)
}

/// Create or upgrade the schema.
pub async fn migrate(db: &DatabaseConnection) -> Result<(), AppError> {
    use sea_orm_migration::MigratorTrait;

    migrations::Migrator::up(db, None)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;
    tracing::info!("Schema up to date");
    Ok(())
}
