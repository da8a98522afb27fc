//! Wire types for the Qzone REST API.

use chrono::{DateTime, Utc};
use qzone_core::{Coordinate, NearbyLocation};
use serde::{Deserialize, Serialize};

/// Search precisions tried by a nearby refresh, tightest first.
pub const PRECISION_FALLBACK: [u8; 4] = [9, 8, 7, 6];

/// Body of the nearby-location search.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NearbyQuery {
    pub latitude: f64,
    pub longitude: f64,
    pub radius_km: f64,
    /// Geohash-style cell precision; higher is tighter.
    pub precision: u8,
    pub max_results: u32,
    pub include_distance: bool,
    pub sort_by_distance: bool,
}

impl NearbyQuery {
    #[must_use]
    pub fn new(center: Coordinate, radius_meters: f64, precision: u8, max_results: u32) -> Self {
        Self {
            latitude: center.latitude,
            longitude: center.longitude,
            radius_km: radius_meters / 1_000.0,
            precision,
            max_results,
            include_distance: true,
            sort_by_distance: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NearbyLocationDto {
    pub document_id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    /// Meters from the query center, when `includeDistance` was requested.
    #[serde(default)]
    pub distance: Option<f64>,
}

impl NearbyLocationDto {
    #[must_use]
    pub fn into_location(self, synced_at: DateTime<Utc>) -> NearbyLocation {
        NearbyLocation {
            document_id: self.document_id,
            title: self.title,
            description: self.description.unwrap_or_default(),
            latitude: self.latitude,
            longitude: self.longitude,
            distance_meters: self.distance,
            last_synced_at: synced_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NearbyResponse {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Vec<NearbyLocationDto>,
}

impl NearbyResponse {
    /// A successful response carrying at least one record.
    #[must_use]
    pub fn has_results(&self) -> bool {
        self.success && !self.data.is_empty()
    }
}

/// Body shared by the unauthenticated sign-in endpoints.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct ThirdPartyTokenBody<'a> {
    pub token: &'a str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nearby_query_serializes_camel_case_and_km() {
        let query = NearbyQuery::new(Coordinate::new(31.2, 121.4), 2_500.0, 9, 50);
        let value = serde_json::to_value(&query).unwrap();
        assert_eq!(value["radiusKm"], 2.5);
        assert_eq!(value["precision"], 9);
        assert_eq!(value["maxResults"], 50);
        assert_eq!(value["includeDistance"], true);
        assert_eq!(value["sortByDistance"], true);
    }

    #[test]
    fn nearby_response_tolerates_missing_fields() {
        let response: NearbyResponse = serde_json::from_value(serde_json::json!({
            "success": false
        }))
        .unwrap();
        assert!(response.data.is_empty());
        assert!(!response.has_results());
    }

    #[test]
    fn unsuccessful_response_with_data_has_no_results() {
        let response: NearbyResponse = serde_json::from_value(serde_json::json!({
            "success": false,
            "message": "partial",
            "data": [{ "documentId": "d", "title": "t", "latitude": 0.0, "longitude": 0.0 }]
        }))
        .unwrap();
        assert!(!response.has_results());
    }

    #[test]
    fn dto_maps_to_location() {
        let dto: NearbyLocationDto = serde_json::from_value(serde_json::json!({
            "documentId": "doc-7",
            "title": "Cafe",
            "description": null,
            "latitude": 31.0,
            "longitude": 121.0,
            "distance": 42.5
        }))
        .unwrap();
        let now = Utc::now();
        let location = dto.into_location(now);
        assert_eq!(location.document_id, "doc-7");
        assert_eq!(location.description, "");
        assert_eq!(location.distance_meters, Some(42.5));
        assert_eq!(location.last_synced_at, now);
    }
}
