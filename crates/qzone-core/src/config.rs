use crate::app_config::{AppConfig, Environment};
use crate::geo::Coordinate;
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Parsing is decoupled from the process environment so tests can drive it
/// with a plain `HashMap`.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::path::PathBuf;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_f64 = |var: &str, raw: &str| -> Result<f64, ConfigError> {
        let value = raw
            .trim()
            .parse::<f64>()
            .map_err(|e| invalid(var, e.to_string()))?;
        if value.is_finite() {
            Ok(value)
        } else {
            Err(invalid(var, "must be a finite number".to_string()))
        }
    };

    let api_base_url = require("QZONE_API_BASE_URL")?;
    if !(api_base_url.starts_with("http://") || api_base_url.starts_with("https://")) {
        return Err(invalid(
            "QZONE_API_BASE_URL",
            format!("\"{api_base_url}\" is not an http(s) URL"),
        ));
    }
    let api_base_url = api_base_url.trim_end_matches('/').to_string();

    let database_url = or_default("DATABASE_URL", "sqlite://qzone.db?mode=rwc");
    let env = parse_environment(&or_default("QZONE_ENV", "development"))?;
    let log_level = or_default("QZONE_LOG_LEVEL", "info");
    let catalog_path = PathBuf::from(or_default("QZONE_CATALOG_PATH", "./config/catalog.yaml"));

    let db_max_connections = parse_u32("QZONE_DB_MAX_CONNECTIONS", "5")?;
    let db_min_connections = parse_u32("QZONE_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("QZONE_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let http_timeout_secs = parse_u64("QZONE_HTTP_TIMEOUT_SECS", "30")?;
    let user_agent = or_default("QZONE_USER_AGENT", "qzone/0.1 (survey-client)");
    let nearby_max_results = parse_u32("QZONE_NEARBY_MAX_RESULTS", "50")?;

    let default_radius_meters = parse_f64(
        "QZONE_DEFAULT_RADIUS_METERS",
        &or_default("QZONE_DEFAULT_RADIUS_METERS", "5000"),
    )?;
    if default_radius_meters <= 0.0 {
        return Err(invalid(
            "QZONE_DEFAULT_RADIUS_METERS",
            "must be greater than zero".to_string(),
        ));
    }

    let location_fix_timeout_secs = parse_u64("QZONE_LOCATION_FIX_TIMEOUT_SECS", "10")?;
    let location_update_interval_secs = parse_u64("QZONE_LOCATION_UPDATE_INTERVAL_SECS", "30")?;
    if location_update_interval_secs == 0 {
        return Err(invalid(
            "QZONE_LOCATION_UPDATE_INTERVAL_SECS",
            "must be at least 1 second".to_string(),
        ));
    }

    let device_location = match (
        lookup("QZONE_DEVICE_LATITUDE").ok(),
        lookup("QZONE_DEVICE_LONGITUDE").ok(),
    ) {
        (Some(lat), Some(lng)) => Some(Coordinate::new(
            parse_f64("QZONE_DEVICE_LATITUDE", &lat)?,
            parse_f64("QZONE_DEVICE_LONGITUDE", &lng)?,
        )),
        (None, None) => None,
        (Some(_), None) => {
            return Err(ConfigError::MissingEnvVar(
                "QZONE_DEVICE_LONGITUDE".to_string(),
            ))
        }
        (None, Some(_)) => {
            return Err(ConfigError::MissingEnvVar(
                "QZONE_DEVICE_LATITUDE".to_string(),
            ))
        }
    };

    Ok(AppConfig {
        api_base_url,
        database_url,
        env,
        log_level,
        catalog_path,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        http_timeout_secs,
        user_agent,
        nearby_max_results,
        default_radius_meters,
        location_fix_timeout_secs,
        location_update_interval_secs,
        device_location,
    })
}

fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "QZONE_ENV".to_string(),
            reason: format!("unknown environment \"{other}\""),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
