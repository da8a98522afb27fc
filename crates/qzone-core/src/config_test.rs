use std::collections::HashMap;
use std::env::VarError;

use super::*;

fn lookup_from_map<'a>(
    map: &'a HashMap<&'a str, &'a str>,
) -> impl Fn(&str) -> Result<String, VarError> + 'a {
    move |key| {
        map.get(key)
            .map(|v| (*v).to_string())
            .ok_or(VarError::NotPresent)
    }
}

/// Returns a map with all required env vars populated with valid defaults.
fn full_env<'a>() -> HashMap<&'a str, &'a str> {
    let mut m = HashMap::new();
    m.insert("QZONE_API_BASE_URL", "https://api.qzone.test/");
    m
}

#[test]
fn parse_environment_known_values() {
    assert_eq!(
        parse_environment("development").unwrap(),
        Environment::Development
    );
    assert_eq!(parse_environment("test").unwrap(), Environment::Test);
    assert_eq!(
        parse_environment("production").unwrap(),
        Environment::Production
    );
}

#[test]
fn parse_environment_unknown_fails() {
    let err = parse_environment("staging").unwrap_err();
    assert!(matches!(err, ConfigError::InvalidEnvVar { ref var, .. } if var == "QZONE_ENV"));
}

#[test]
fn build_app_config_fails_without_api_base_url() {
    let map: HashMap<&str, &str> = HashMap::new();
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::MissingEnvVar(ref v)) if v == "QZONE_API_BASE_URL"),
        "expected MissingEnvVar(QZONE_API_BASE_URL), got: {result:?}"
    );
}

#[test]
fn build_app_config_rejects_non_http_base_url() {
    let mut map = full_env();
    map.insert("QZONE_API_BASE_URL", "ftp://api.qzone.test");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "QZONE_API_BASE_URL"),
        "expected InvalidEnvVar(QZONE_API_BASE_URL), got: {result:?}"
    );
}

#[test]
fn build_app_config_succeeds_with_defaults() {
    let map = full_env();
    let result = build_app_config(lookup_from_map(&map));
    assert!(result.is_ok(), "expected Ok, got: {result:?}");
    let cfg = result.unwrap();
    assert_eq!(cfg.api_base_url, "https://api.qzone.test");
    assert_eq!(cfg.database_url, "sqlite://qzone.db?mode=rwc");
    assert_eq!(cfg.env, Environment::Development);
    assert_eq!(cfg.log_level, "info");
    assert_eq!(cfg.catalog_path.to_str(), Some("./config/catalog.yaml"));
    assert_eq!(cfg.db_max_connections, 5);
    assert_eq!(cfg.db_min_connections, 1);
    assert_eq!(cfg.db_acquire_timeout_secs, 10);
    assert_eq!(cfg.http_timeout_secs, 30);
    assert_eq!(cfg.user_agent, "qzone/0.1 (survey-client)");
    assert_eq!(cfg.nearby_max_results, 50);
    assert!((cfg.default_radius_meters - 5000.0).abs() < f64::EPSILON);
    assert_eq!(cfg.location_fix_timeout_secs, 10);
    assert_eq!(cfg.location_update_interval_secs, 30);
    assert!(cfg.device_location.is_none());
}

#[test]
fn build_app_config_reads_device_location_pair() {
    let mut map = full_env();
    map.insert("QZONE_DEVICE_LATITUDE", "31.2304");
    map.insert("QZONE_DEVICE_LONGITUDE", "121.4737");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    let loc = cfg.device_location.expect("device location should be set");
    assert!((loc.latitude - 31.2304).abs() < 1e-9);
    assert!((loc.longitude - 121.4737).abs() < 1e-9);
}

#[test]
fn build_app_config_rejects_half_device_location() {
    let mut map = full_env();
    map.insert("QZONE_DEVICE_LATITUDE", "31.2304");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::MissingEnvVar(ref v)) if v == "QZONE_DEVICE_LONGITUDE"),
        "expected MissingEnvVar(QZONE_DEVICE_LONGITUDE), got: {result:?}"
    );
}

#[test]
fn build_app_config_rejects_invalid_max_results() {
    let mut map = full_env();
    map.insert("QZONE_NEARBY_MAX_RESULTS", "lots");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "QZONE_NEARBY_MAX_RESULTS"),
        "expected InvalidEnvVar(QZONE_NEARBY_MAX_RESULTS), got: {result:?}"
    );
}

#[test]
fn build_app_config_rejects_non_positive_radius() {
    let mut map = full_env();
    map.insert("QZONE_DEFAULT_RADIUS_METERS", "0");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "QZONE_DEFAULT_RADIUS_METERS"),
        "expected InvalidEnvVar(QZONE_DEFAULT_RADIUS_METERS), got: {result:?}"
    );
}

#[test]
fn build_app_config_rejects_zero_update_interval() {
    let mut map = full_env();
    map.insert("QZONE_LOCATION_UPDATE_INTERVAL_SECS", "0");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "QZONE_LOCATION_UPDATE_INTERVAL_SECS"),
        "expected InvalidEnvVar(QZONE_LOCATION_UPDATE_INTERVAL_SECS), got: {result:?}"
    );
}

#[test]
fn app_config_debug_redacts_database_url() {
    let mut map = full_env();
    map.insert("DATABASE_URL", "sqlite:///secret/path.db");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    let rendered = format!("{cfg:?}");
    assert!(!rendered.contains("/secret/path.db"));
    assert!(rendered.contains("[redacted]"));
}
