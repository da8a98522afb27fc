//! Shared handle over the local cache with live queries.
//!
//! `LocalStore` wraps the free query functions of this crate and bumps a
//! per-table version after every committed write. `watch_*` streams yield
//! the full ordered result set once on subscription and again after each
//! version bump, so readers always see the latest committed rows.

use std::future::Future;
use std::sync::Arc;

use futures::stream::{self, BoxStream, StreamExt};
use qzone_core::{BoundingBox, NearbyLocation, Survey};
use sqlx::SqlitePool;
use tokio::sync::watch;

use crate::{nearby_locations, surveys, DbError};

#[derive(Clone)]
pub struct LocalStore {
    pool: SqlitePool,
    surveys_version: Arc<watch::Sender<u64>>,
    locations_version: Arc<watch::Sender<u64>>,
}

impl LocalStore {
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            surveys_version: Arc::new(watch::Sender::new(0)),
            locations_version: Arc::new(watch::Sender::new(0)),
        }
    }

    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    fn bump(version: &watch::Sender<u64>) {
        version.send_modify(|v| *v = v.wrapping_add(1));
    }

    // -----------------------------------------------------------------------
    // Surveys
    // -----------------------------------------------------------------------

    /// # Errors
    ///
    /// Propagates [`DbError`] from the underlying write.
    pub async fn upsert_survey(&self, survey: &Survey) -> Result<(), DbError> {
        surveys::upsert_survey(&self.pool, survey).await?;
        Self::bump(&self.surveys_version);
        Ok(())
    }

    /// # Errors
    ///
    /// Propagates [`DbError`] from the underlying write.
    pub async fn upsert_surveys(&self, batch: &[Survey]) -> Result<u64, DbError> {
        let written = surveys::upsert_surveys(&self.pool, batch).await?;
        if written > 0 {
            Self::bump(&self.surveys_version);
        }
        Ok(written)
    }

    /// # Errors
    ///
    /// Propagates [`DbError`] from the underlying read.
    pub async fn get_survey(&self, survey_id: &str) -> Result<Option<Survey>, DbError> {
        surveys::get_survey(&self.pool, survey_id).await
    }

    /// # Errors
    ///
    /// Propagates [`DbError`] from the underlying read.
    pub async fn surveys(&self) -> Result<Vec<Survey>, DbError> {
        surveys::list_surveys(&self.pool).await
    }

    /// # Errors
    ///
    /// Propagates [`DbError`] from the underlying read.
    pub async fn surveys_in_bounds(&self, bounds: &BoundingBox) -> Result<Vec<Survey>, DbError> {
        surveys::list_surveys_in_bounds(&self.pool, bounds).await
    }

    /// # Errors
    ///
    /// Propagates [`DbError`] from the underlying write.
    pub async fn delete_survey(&self, survey_id: &str) -> Result<bool, DbError> {
        let removed = surveys::delete_survey(&self.pool, survey_id).await?;
        if removed {
            Self::bump(&self.surveys_version);
        }
        Ok(removed)
    }

    /// # Errors
    ///
    /// Propagates [`DbError`] from the underlying write.
    pub async fn delete_all_surveys(&self) -> Result<u64, DbError> {
        let removed = surveys::delete_all_surveys(&self.pool).await?;
        Self::bump(&self.surveys_version);
        Ok(removed)
    }

    /// # Errors
    ///
    /// Propagates [`DbError`] from the underlying read.
    pub async fn count_surveys(&self) -> Result<i64, DbError> {
        surveys::count_surveys(&self.pool).await
    }

    /// Live view of every cached survey, most recently synced first.
    pub fn watch_surveys(&self) -> BoxStream<'static, Result<Vec<Survey>, DbError>> {
        let pool = self.pool.clone();
        live_query(self.surveys_version.subscribe(), move || {
            let pool = pool.clone();
            async move { surveys::list_surveys(&pool).await }
        })
    }

    // -----------------------------------------------------------------------
    // Nearby locations
    // -----------------------------------------------------------------------

    /// # Errors
    ///
    /// Propagates [`DbError`] from the underlying write.
    pub async fn upsert_nearby_location(&self, location: &NearbyLocation) -> Result<(), DbError> {
        nearby_locations::upsert_nearby_location(&self.pool, location).await?;
        Self::bump(&self.locations_version);
        Ok(())
    }

    /// # Errors
    ///
    /// Propagates [`DbError`] from the underlying write.
    pub async fn upsert_nearby_locations(&self, batch: &[NearbyLocation]) -> Result<u64, DbError> {
        let written = nearby_locations::upsert_nearby_locations(&self.pool, batch).await?;
        if written > 0 {
            Self::bump(&self.locations_version);
        }
        Ok(written)
    }

    /// # Errors
    ///
    /// Propagates [`DbError`] from the underlying write.
    pub async fn replace_all_nearby_locations(
        &self,
        batch: &[NearbyLocation],
    ) -> Result<u64, DbError> {
        let written = nearby_locations::replace_all_nearby_locations(&self.pool, batch).await?;
        Self::bump(&self.locations_version);
        Ok(written)
    }

    /// # Errors
    ///
    /// Propagates [`DbError`] from the underlying read.
    pub async fn get_nearby_location(
        &self,
        document_id: &str,
    ) -> Result<Option<NearbyLocation>, DbError> {
        nearby_locations::get_nearby_location(&self.pool, document_id).await
    }

    /// # Errors
    ///
    /// Propagates [`DbError`] from the underlying read.
    pub async fn nearby_locations(&self) -> Result<Vec<NearbyLocation>, DbError> {
        nearby_locations::list_nearby_locations(&self.pool).await
    }

    /// # Errors
    ///
    /// Propagates [`DbError`] from the underlying read.
    pub async fn nearby_locations_in_bounds(
        &self,
        bounds: &BoundingBox,
    ) -> Result<Vec<NearbyLocation>, DbError> {
        nearby_locations::list_nearby_locations_in_bounds(&self.pool, bounds).await
    }

    /// # Errors
    ///
    /// Propagates [`DbError`] from the underlying write.
    pub async fn delete_nearby_location(&self, document_id: &str) -> Result<bool, DbError> {
        let removed = nearby_locations::delete_nearby_location(&self.pool, document_id).await?;
        if removed {
            Self::bump(&self.locations_version);
        }
        Ok(removed)
    }

    /// # Errors
    ///
    /// Propagates [`DbError`] from the underlying write.
    pub async fn delete_all_nearby_locations(&self) -> Result<u64, DbError> {
        let removed = nearby_locations::delete_all_nearby_locations(&self.pool).await?;
        Self::bump(&self.locations_version);
        Ok(removed)
    }

    /// # Errors
    ///
    /// Propagates [`DbError`] from the underlying read.
    pub async fn count_nearby_locations(&self) -> Result<i64, DbError> {
        nearby_locations::count_nearby_locations(&self.pool).await
    }

    /// Live view of every cached location, nearest first.
    pub fn watch_nearby_locations(&self) -> BoxStream<'static, Result<Vec<NearbyLocation>, DbError>> {
        let pool = self.pool.clone();
        live_query(self.locations_version.subscribe(), move || {
            let pool = pool.clone();
            async move { nearby_locations::list_nearby_locations(&pool).await }
        })
    }
}

/// Re-run `query` once immediately and then after every version change.
///
/// The stream ends once every `LocalStore` clone holding the sender is dropped.
fn live_query<T, F, Fut>(
    version: watch::Receiver<u64>,
    query: F,
) -> BoxStream<'static, Result<T, DbError>>
where
    T: Send + 'static,
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<T, DbError>> + Send + 'static,
{
    stream::unfold(
        (version, query, true),
        |(mut version, mut query, first)| async move {
            if !first && version.changed().await.is_err() {
                return None;
            }
            // Mark seen before querying so a write racing the query triggers another pass.
            version.borrow_and_update();
            let result = query().await;
            Some((result, (version, query, false)))
        },
    )
    .boxed()
}
