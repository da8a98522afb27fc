pub mod auth;
pub mod client;
pub mod error;
pub mod types;

pub use auth::{TokenHolder, TokenPair};
pub use client::ApiClient;
pub use error::ApiError;
pub use types::{NearbyLocationDto, NearbyQuery, NearbyResponse, PRECISION_FALLBACK};
