//! Database operations for the `nearby_locations` table.

mod read;
mod types;
mod write;

pub use read::{
    count_nearby_locations, get_nearby_location, list_nearby_locations,
    list_nearby_locations_in_bounds,
};
pub use types::NearbyLocationRow;
pub use write::{
    delete_all_nearby_locations, delete_nearby_location, replace_all_nearby_locations,
    upsert_nearby_location, upsert_nearby_locations,
};
