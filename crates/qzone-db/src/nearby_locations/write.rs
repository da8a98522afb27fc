//! Write operations for the `nearby_locations` table.
//!
//! Upserts replace every column of an existing row; fields are never merged.

use qzone_core::NearbyLocation;
use sqlx::{SqliteConnection, SqlitePool};

use crate::DbError;

async fn upsert_on(conn: &mut SqliteConnection, location: &NearbyLocation) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO nearby_locations \
             (document_id, title, description, latitude, longitude, distance_meters, last_synced_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7) \
         ON CONFLICT (document_id) DO UPDATE SET \
             title           = excluded.title, \
             description     = excluded.description, \
             latitude        = excluded.latitude, \
             longitude       = excluded.longitude, \
             distance_meters = excluded.distance_meters, \
             last_synced_at  = excluded.last_synced_at",
    )
    .bind(&location.document_id)
    .bind(&location.title)
    .bind(&location.description)
    .bind(location.latitude)
    .bind(location.longitude)
    .bind(location.distance_meters)
    .bind(location.last_synced_at)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Insert or replace a single location.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the statement fails.
pub async fn upsert_nearby_location(
    pool: &SqlitePool,
    location: &NearbyLocation,
) -> Result<(), DbError> {
    let mut conn = pool.acquire().await?;
    upsert_on(&mut conn, location).await
}

/// Insert or replace a batch of locations in one transaction.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any statement fails; nothing is written in that case.
pub async fn upsert_nearby_locations(
    pool: &SqlitePool,
    locations: &[NearbyLocation],
) -> Result<u64, DbError> {
    if locations.is_empty() {
        return Ok(0);
    }

    let mut tx = pool.begin().await?;
    for location in locations {
        upsert_on(&mut tx, location).await?;
    }
    tx.commit().await?;

    Ok(locations.len() as u64)
}

/// Swap the whole table for `locations` atomically.
///
/// Used after a successful nearby refresh so rows from an earlier search
/// area do not linger.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any statement fails; the previous rows are kept in that case.
pub async fn replace_all_nearby_locations(
    pool: &SqlitePool,
    locations: &[NearbyLocation],
) -> Result<u64, DbError> {
    let mut tx = pool.begin().await?;
    sqlx::query("DELETE FROM nearby_locations")
        .execute(&mut *tx)
        .await?;
    for location in locations {
        upsert_on(&mut tx, location).await?;
    }
    tx.commit().await?;

    Ok(locations.len() as u64)
}

/// Delete one location. Returns `true` if a row was removed.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the statement fails.
pub async fn delete_nearby_location(pool: &SqlitePool, document_id: &str) -> Result<bool, DbError> {
    let rows_affected = sqlx::query("DELETE FROM nearby_locations WHERE document_id = ?1")
        .bind(document_id)
        .execute(pool)
        .await?
        .rows_affected();
    Ok(rows_affected > 0)
}

/// Delete every cached location, returning the number of rows removed.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the statement fails.
pub async fn delete_all_nearby_locations(pool: &SqlitePool) -> Result<u64, DbError> {
    let rows_affected = sqlx::query("DELETE FROM nearby_locations")
        .execute(pool)
        .await?
        .rows_affected();
    Ok(rows_affected)
}
