//! Wiring shared by every command that touches storage or the backend.

use std::sync::Arc;

use anyhow::Context;
use qzone_client::{ApiClient, TokenHolder};
use qzone_core::AppConfig;
use qzone_db::{LocalStore, PoolConfig};
use qzone_sync::{
    FixedLocationSource, LocationProvider, RewardRepository, SurveyRepository, UserRepository,
};

use crate::DbCommands;

pub(crate) struct App {
    pub config: AppConfig,
    pub location: LocationProvider,
    pub surveys: SurveyRepository,
    pub rewards: RewardRepository,
    pub user: UserRepository,
}

impl App {
    /// Connect, migrate, restore the saved session and load the survey snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if the database, catalog or API client cannot be set up.
    pub(crate) async fn bootstrap(config: AppConfig) -> anyhow::Result<Self> {
        let pool = qzone_db::connect_pool(&config.database_url, PoolConfig::from_app_config(&config))
            .await
            .context("failed to open local database")?;
        let applied = qzone_db::run_migrations(&pool).await?;
        if applied > 0 {
            tracing::info!(applied, "applied database migrations");
        }

        let catalog = Arc::new(
            qzone_core::load_catalog(&config.catalog_path).with_context(|| {
                format!("failed to load catalog {}", config.catalog_path.display())
            })?,
        );
        let api = Arc::new(
            ApiClient::from_app_config(&config, TokenHolder::default())
                .map_err(|e| anyhow::anyhow!("failed to build API client: {e}"))?,
        );
        let store = LocalStore::new(pool);

        let source = Arc::new(FixedLocationSource::new(config.device_location));
        let location = LocationProvider::from_app_config(source, &config);

        let user = UserRepository::new(Arc::clone(&api), store.clone(), Arc::clone(&catalog));
        if let Err(e) = user.restore_session().await {
            tracing::warn!(error = %e, "could not restore saved session");
        }

        let surveys = SurveyRepository::new(api, store, Arc::clone(&catalog))
            .with_location_provider(location.clone())
            .with_max_results(config.nearby_max_results);
        surveys.refresh_surveys().await;

        Ok(Self {
            config,
            location,
            surveys,
            rewards: RewardRepository::new(catalog),
            user,
        })
    }
}

pub(crate) async fn run_db(config: &AppConfig, command: &DbCommands) -> anyhow::Result<()> {
    let pool = qzone_db::connect_pool(&config.database_url, PoolConfig::from_app_config(config))
        .await
        .context("failed to open local database")?;
    match command {
        DbCommands::Ping => {
            qzone_db::ping(&pool).await?;
            println!("database ok");
        }
        DbCommands::Migrate => {
            let applied = qzone_db::run_migrations(&pool).await?;
            println!("applied {applied} migration(s)");
        }
    }
    Ok(())
}
