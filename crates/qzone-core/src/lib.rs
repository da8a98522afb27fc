pub mod app_config;
pub mod catalog;
pub mod config;
pub mod geo;
pub mod models;

use thiserror::Error;

pub use app_config::{AppConfig, Environment};
pub use catalog::{load_catalog, Catalog};
pub use config::{load_app_config, load_app_config_from_env};
pub use geo::{
    bounding_box, distance_meters, gcj02_to_wgs84, is_outside_china, wgs84_to_gcj02, BoundingBox,
    Coordinate,
};
pub use models::{
    CompletedSurvey, NearbyLocation, QuestionType, Redemption, Reward, Survey, SurveyOption,
    SurveyQuestion, SurveyStatus, UserProfile,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read catalog file {path}: {source}")]
    CatalogFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse catalog file: {0}")]
    CatalogFileParse(#[source] serde_yaml::Error),

    #[error("catalog validation failed: {0}")]
    Validation(String),
}

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid survey status: {0}")]
    InvalidSurveyStatus(String),

    #[error("invalid question type: {0}")]
    InvalidQuestionType(String),
}
