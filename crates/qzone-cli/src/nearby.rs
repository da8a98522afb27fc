//! Nearby-location and device-tracking commands.

use futures::StreamExt;
use qzone_core::{Coordinate, NearbyLocation};
use qzone_sync::{LocationResult, NearbyRefresh};

use crate::app::App;

pub(crate) async fn run_nearby(
    app: &App,
    center: Option<Coordinate>,
    radius: Option<f64>,
    offline: bool,
) -> anyhow::Result<()> {
    let radius = radius.unwrap_or(app.config.default_radius_meters);
    if radius <= 0.0 {
        anyhow::bail!("radius must be positive, got {radius}");
    }

    if offline {
        let center = match center {
            Some(c) => c,
            None => app
                .location
                .get_last_location()
                .await
                .coordinate()
                .unwrap_or_else(Coordinate::origin),
        };
        let cached = app.surveys.load_cached_nearby(center, radius).await;
        println!("{} cached location(s) within {radius} m of {center}", cached.len());
        print_locations(&cached);
        return Ok(());
    }

    let outcome = match center {
        Some(c) => app.surveys.refresh_nearby(Some(c), radius).await,
        None => app.surveys.refresh_nearby_from_device(radius).await,
    };
    match outcome {
        NearbyRefresh::Found { precision, count } => {
            println!("{count} location(s) found at precision {precision}");
            print_locations(&app.surveys.current_nearby());
        }
        NearbyRefresh::Exhausted => println!("no nearby locations found"),
    }
    Ok(())
}

pub(crate) async fn run_track(app: &App, fixes: usize) -> anyhow::Result<()> {
    match app.location.get_current_location().await {
        LocationResult::Success(fix) => println!("current: {}", fix.coordinate),
        LocationResult::PermissionDenied => anyhow::bail!("location permission denied"),
        LocationResult::LocationDisabled => anyhow::bail!("location services are disabled"),
        LocationResult::Error(message) => anyhow::bail!("location unavailable: {message}"),
    }

    let mut updates = app.location.location_updates().take(fixes);
    while let Some(fix) = updates.next().await {
        let place = app.location.reverse_geocode(fix.coordinate).await;
        println!(
            "{}  {}{}",
            fix.recorded_at.format("%H:%M:%S"),
            fix.coordinate,
            place.map(|p| format!("  ({p})")).unwrap_or_default()
        );
    }
    Ok(())
}

fn print_locations(locations: &[NearbyLocation]) {
    for location in locations {
        let distance = location
            .distance_meters
            .map_or_else(|| "?".to_string(), |d| format!("{d:.0} m"));
        println!(
            "{:>8}  {}  [{}]",
            distance, location.title, location.document_id
        );
    }
}
