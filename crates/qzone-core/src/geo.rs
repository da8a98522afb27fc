//! Coordinate geometry helpers.
//!
//! Great-circle distance, the WGS-84 / GCJ-02 datum shift used by map tiles
//! inside mainland China, and the rectangular pre-filter used for cached
//! nearby lookups. Everything here is pure and allocation-free.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

/// Mean Earth radius used by the Haversine formula.
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Approximate length of one degree of latitude. Also applied to longitude.
pub const METERS_PER_DEGREE: f64 = 111_000.0;

// Krasovsky 1940 ellipsoid, as used by the GCJ-02 transform.
const KRASOVSKY_A: f64 = 6_378_245.0;
const KRASOVSKY_EE: f64 = 0.006_693_421_622_965_943;

const CHINA_MIN_LNG: f64 = 72.004;
const CHINA_MAX_LNG: f64 = 137.8347;
const CHINA_MIN_LAT: f64 = 0.8293;
const CHINA_MAX_LAT: f64 = 55.8271;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    #[must_use]
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    #[must_use]
    pub fn origin() -> Self {
        Self::new(0.0, 0.0)
    }

    /// Haversine distance to `other`, truncated to whole meters.
    #[must_use]
    pub fn distance_to(&self, other: &Coordinate) -> i64 {
        distance_meters(
            self.latitude,
            self.longitude,
            other.latitude,
            other.longitude,
        )
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.6},{:.6}", self.latitude, self.longitude)
    }
}

/// Inclusive latitude/longitude rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl BoundingBox {
    #[must_use]
    pub fn contains(&self, point: &Coordinate) -> bool {
        point.latitude >= self.min_lat
            && point.latitude <= self.max_lat
            && point.longitude >= self.min_lng
            && point.longitude <= self.max_lng
    }
}

/// Great-circle distance between two points in meters, truncated toward zero.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn distance_meters(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> i64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lng = (lng2 - lng1).to_radians();
    let half_lat = (d_lat / 2.0).sin();
    let half_lng = (d_lng / 2.0).sin();
    let a = half_lat * half_lat
        + lat1.to_radians().cos() * lat2.to_radians().cos() * half_lng * half_lng;
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    (EARTH_RADIUS_METERS * c) as i64
}

/// Square around `center` reaching `radius_meters` in each cardinal direction.
///
/// Degrees are derived from a flat 111 km per degree on both axes; the
/// longitude span is not widened toward the poles.
#[must_use]
pub fn bounding_box(center: Coordinate, radius_meters: f64) -> BoundingBox {
    let delta = radius_meters.max(0.0) / METERS_PER_DEGREE;
    BoundingBox {
        min_lat: center.latitude - delta,
        max_lat: center.latitude + delta,
        min_lng: center.longitude - delta,
        max_lng: center.longitude + delta,
    }
}

/// `true` when the point lies outside the rectangle where GCJ-02 applies.
#[must_use]
pub fn is_outside_china(lat: f64, lng: f64) -> bool {
    !(CHINA_MIN_LNG..=CHINA_MAX_LNG).contains(&lng)
        || !(CHINA_MIN_LAT..=CHINA_MAX_LAT).contains(&lat)
}

/// Shift a GPS (WGS-84) coordinate into the GCJ-02 datum.
#[must_use]
pub fn wgs84_to_gcj02(lat: f64, lng: f64) -> Coordinate {
    if is_outside_china(lat, lng) {
        return Coordinate::new(lat, lng);
    }
    let (d_lat, d_lng) = gcj02_offset(lat, lng);
    Coordinate::new(lat + d_lat, lng + d_lng)
}

/// Approximate inverse of [`wgs84_to_gcj02`]: `2p - forward(p)`.
///
/// Residual error is a few meters; the forward transform has no closed-form inverse.
#[must_use]
pub fn gcj02_to_wgs84(lat: f64, lng: f64) -> Coordinate {
    if is_outside_china(lat, lng) {
        return Coordinate::new(lat, lng);
    }
    let shifted = wgs84_to_gcj02(lat, lng);
    Coordinate::new(lat * 2.0 - shifted.latitude, lng * 2.0 - shifted.longitude)
}

fn gcj02_offset(lat: f64, lng: f64) -> (f64, f64) {
    let raw_lat = transform_lat(lng - 105.0, lat - 35.0);
    let raw_lng = transform_lng(lng - 105.0, lat - 35.0);

    let rad_lat = lat / 180.0 * PI;
    let sin_lat = rad_lat.sin();
    let magic = 1.0 - KRASOVSKY_EE * sin_lat * sin_lat;
    let sqrt_magic = magic.sqrt();

    let d_lat = (raw_lat * 180.0) / ((KRASOVSKY_A * (1.0 - KRASOVSKY_EE)) / (magic * sqrt_magic) * PI);
    let d_lng = (raw_lng * 180.0) / (KRASOVSKY_A / sqrt_magic * rad_lat.cos() * PI);
    (d_lat, d_lng)
}

fn transform_lat(x: f64, y: f64) -> f64 {
    let mut ret = -100.0 + 2.0 * x + 3.0 * y + 0.2 * y * y + 0.1 * x * y + 0.2 * x.abs().sqrt();
    ret += (20.0 * (6.0 * x * PI).sin() + 20.0 * (2.0 * x * PI).sin()) * 2.0 / 3.0;
    ret += (20.0 * (y * PI).sin() + 40.0 * (y / 3.0 * PI).sin()) * 2.0 / 3.0;
    ret += (160.0 * (y / 12.0 * PI).sin() + 320.0 * (y * PI / 30.0).sin()) * 2.0 / 3.0;
    ret
}

fn transform_lng(x: f64, y: f64) -> f64 {
    let mut ret = 300.0 + x + 2.0 * y + 0.1 * x * x + 0.1 * x * y + 0.1 * x.abs().sqrt();
    ret += (20.0 * (6.0 * x * PI).sin() + 20.0 * (2.0 * x * PI).sin()) * 2.0 / 3.0;
    ret += (20.0 * (x * PI).sin() + 40.0 * (x / 3.0 * PI).sin()) * 2.0 / 3.0;
    ret += (150.0 * (x / 12.0 * PI).sin() + 300.0 * (x / 30.0 * PI).sin()) * 2.0 / 3.0;
    ret
}
