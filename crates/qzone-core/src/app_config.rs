use std::path::PathBuf;

use crate::geo::Coordinate;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub api_base_url: String,
    pub database_url: String,
    pub env: Environment,
    pub log_level: String,
    pub catalog_path: PathBuf,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub http_timeout_secs: u64,
    pub user_agent: String,
    pub nearby_max_results: u32,
    pub default_radius_meters: f64,
    pub location_fix_timeout_secs: u64,
    pub location_update_interval_secs: u64,
    /// Static device position used when no platform location source is wired in.
    pub device_location: Option<Coordinate>,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_base_url", &self.api_base_url)
            .field("database_url", &"[redacted]")
            .field("env", &self.env)
            .field("log_level", &self.log_level)
            .field("catalog_path", &self.catalog_path)
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("http_timeout_secs", &self.http_timeout_secs)
            .field("user_agent", &self.user_agent)
            .field("nearby_max_results", &self.nearby_max_results)
            .field("default_radius_meters", &self.default_radius_meters)
            .field(
                "location_fix_timeout_secs",
                &self.location_fix_timeout_secs,
            )
            .field(
                "location_update_interval_secs",
                &self.location_update_interval_secs,
            )
            .field("device_location", &self.device_location.map(|_| "[redacted]"))
            .finish()
    }
}
