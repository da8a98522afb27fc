//! Repositories and the location provider that sit between the API client,
//! the local store, and whatever front end consumes them.

pub mod error;
pub mod location;
pub mod repository;
pub mod rewards;
pub mod user;

pub use error::SyncError;
pub use location::{
    FixedLocationSource, Geocoder, LocationFix, LocationProvider, LocationResult, LocationSource,
    LocationUpdates, PlatformError,
};
pub use repository::{NearbyRefresh, SurveyRepository};
pub use rewards::RewardRepository;
pub use user::UserRepository;
