//! Row types for the `nearby_locations` table.

use chrono::{DateTime, Utc};
use qzone_core::NearbyLocation;

/// A row from the `nearby_locations` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct NearbyLocationRow {
    pub document_id: String,
    pub title: String,
    pub description: String,
    pub latitude: f64,
    pub longitude: f64,
    pub distance_meters: Option<f64>,
    pub last_synced_at: DateTime<Utc>,
}

impl From<NearbyLocationRow> for NearbyLocation {
    fn from(row: NearbyLocationRow) -> Self {
        Self {
            document_id: row.document_id,
            title: row.title,
            description: row.description,
            latitude: row.latitude,
            longitude: row.longitude,
            distance_meters: row.distance_meters,
            last_synced_at: row.last_synced_at,
        }
    }
}
