//! Read operations for the `nearby_locations` table.
//!
//! Every list query shares one ordering: nearest first (rows without a
//! distance last), then most recently synced.

use qzone_core::{BoundingBox, NearbyLocation};
use sqlx::SqlitePool;

use super::types::NearbyLocationRow;
use crate::DbError;

const SELECT_COLUMNS: &str = "SELECT document_id, title, description, latitude, longitude, \
                                     distance_meters, last_synced_at \
                              FROM nearby_locations";

const ORDER_BY: &str = "ORDER BY distance_meters IS NULL, distance_meters ASC, \
                                 last_synced_at DESC, document_id ASC";

/// Look up a single location by document id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_nearby_location(
    pool: &SqlitePool,
    document_id: &str,
) -> Result<Option<NearbyLocation>, DbError> {
    let row = sqlx::query_as::<_, NearbyLocationRow>(&format!(
        "{SELECT_COLUMNS} WHERE document_id = ?1"
    ))
    .bind(document_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(NearbyLocation::from))
}

/// List every cached location.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_nearby_locations(pool: &SqlitePool) -> Result<Vec<NearbyLocation>, DbError> {
    let rows = sqlx::query_as::<_, NearbyLocationRow>(&format!("{SELECT_COLUMNS} {ORDER_BY}"))
        .fetch_all(pool)
        .await?;

    Ok(rows.into_iter().map(NearbyLocation::from).collect())
}

/// List cached locations inside `bounds`; both axes are inclusive.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_nearby_locations_in_bounds(
    pool: &SqlitePool,
    bounds: &BoundingBox,
) -> Result<Vec<NearbyLocation>, DbError> {
    let rows = sqlx::query_as::<_, NearbyLocationRow>(&format!(
        "{SELECT_COLUMNS} \
         WHERE latitude BETWEEN ?1 AND ?2 \
           AND longitude BETWEEN ?3 AND ?4 \
         {ORDER_BY}"
    ))
    .bind(bounds.min_lat)
    .bind(bounds.max_lat)
    .bind(bounds.min_lng)
    .bind(bounds.max_lng)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(NearbyLocation::from).collect())
}

/// Number of cached locations.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn count_nearby_locations(pool: &SqlitePool) -> Result<i64, DbError> {
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM nearby_locations")
        .fetch_one(pool)
        .await?;
    Ok(count)
}
