use std::{str::FromStr, time::Duration};

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use thiserror::Error;

const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_MIN_CONNECTIONS: u32 = 1;
const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 10;

// Path relative to crates/qzone-db/Cargo.toml; resolves to <workspace-root>/migrations/
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations");

#[derive(Debug, Clone, Copy)]
pub struct PoolConfig {
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: DEFAULT_MAX_CONNECTIONS,
            min_connections: DEFAULT_MIN_CONNECTIONS,
            acquire_timeout_secs: DEFAULT_ACQUIRE_TIMEOUT_SECS,
        }
    }
}

impl PoolConfig {
    #[must_use]
    pub fn from_app_config(config: &qzone_core::AppConfig) -> Self {
        Self {
            max_connections: config.db_max_connections,
            min_connections: config.db_min_connections,
            acquire_timeout_secs: config.db_acquire_timeout_secs,
        }
    }
}

#[derive(Debug, Error)]
pub enum DbError {
    #[error("invalid value in column {column}: {reason}")]
    Decode { column: &'static str, reason: String },
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Open a `SQLite` pool with foreign keys enforced on every connection.
///
/// The database file is created if it does not exist yet.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the URL is malformed or the connection cannot be established.
pub async fn connect_pool(
    database_url: &str,
    config: PoolConfig,
) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true);

    SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .connect_with(options)
        .await
}

/// Open a single-connection in-memory database with all migrations applied.
///
/// The connection is pinned so the database lives as long as the pool.
///
/// # Errors
///
/// Returns [`DbError`] if the connection or a migration fails.
pub async fn connect_in_memory() -> Result<SqlitePool, DbError> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;
    run_migrations(&pool).await?;
    Ok(pool)
}

/// Run all pending migrations against the pool.
///
/// Returns the number of migrations that were applied.
///
/// # Errors
///
/// Returns [`sqlx::migrate::MigrateError`] if any migration fails.
pub async fn run_migrations(pool: &SqlitePool) -> Result<usize, sqlx::migrate::MigrateError> {
    // The _sqlx_migrations table does not exist on a fresh database; treat absence as zero.
    let applied_before: i64 =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM _sqlx_migrations WHERE success = 1")
            .fetch_one(pool)
            .await
            .unwrap_or(0);

    MIGRATOR.run(pool).await?;

    let applied_after: i64 =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM _sqlx_migrations WHERE success = 1")
            .fetch_one(pool)
            .await
            .unwrap_or(0);

    let delta = (applied_after - applied_before).max(0);
    Ok(usize::try_from(delta).unwrap_or(0))
}

/// Send a `SELECT 1` to verify the pool has a live connection.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the query fails.
pub async fn ping(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query_scalar::<_, i64>("SELECT 1")
        .fetch_one(pool)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_config_has_sane_defaults() {
        let config = PoolConfig::default();

        assert_eq!(config.max_connections, DEFAULT_MAX_CONNECTIONS);
        assert_eq!(config.min_connections, DEFAULT_MIN_CONNECTIONS);
        assert_eq!(config.acquire_timeout_secs, DEFAULT_ACQUIRE_TIMEOUT_SECS);
    }

    #[tokio::test]
    async fn in_memory_pool_is_migrated_and_enforces_foreign_keys() {
        let pool = connect_in_memory().await.expect("in-memory pool");
        ping(&pool).await.expect("ping");

        let fk: i64 = sqlx::query_scalar("PRAGMA foreign_keys")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(fk, 1);

        // Second run is a no-op.
        assert_eq!(run_migrations(&pool).await.unwrap(), 0);
    }
}

pub mod history;
pub mod nearby_locations;
pub mod settings;
pub mod store;
pub mod surveys;

pub use history::{
    clear_history, list_completed_surveys, list_redemptions, record_completed_survey,
    record_redemption, CompletedSurveyRow, PointBalance, RedemptionRow,
};
pub use nearby_locations::{
    count_nearby_locations, delete_all_nearby_locations, delete_nearby_location,
    get_nearby_location, list_nearby_locations, list_nearby_locations_in_bounds,
    replace_all_nearby_locations, upsert_nearby_location, upsert_nearby_locations,
    NearbyLocationRow,
};
pub use settings::{
    clear_session, get_setting, load_session, remove_setting, save_session, set_setting,
    SettingKey, UserSession,
};
pub use store::LocalStore;
pub use surveys::{
    count_surveys, delete_all_surveys, delete_survey, get_survey, list_surveys,
    list_surveys_in_bounds, upsert_survey, upsert_surveys, SurveyRow,
};
