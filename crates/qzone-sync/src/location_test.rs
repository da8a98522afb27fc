use futures::StreamExt;

use super::*;

fn shanghai() -> Coordinate {
    Coordinate::new(31.2304, 121.4737)
}

/// Source whose answers are scripted per test. `current: None` never resolves.
struct ScriptedSource {
    last: Result<Option<LocationFix>, PlatformError>,
    current: Option<Result<Option<LocationFix>, PlatformError>>,
}

impl LocationSource for ScriptedSource {
    fn has_permission(&self) -> bool {
        true
    }

    fn is_enabled(&self) -> bool {
        true
    }

    fn last_known(&self) -> BoxFuture<'_, Result<Option<LocationFix>, PlatformError>> {
        futures::future::ready(self.last.clone()).boxed()
    }

    fn current_fix(&self) -> BoxFuture<'_, Result<Option<LocationFix>, PlatformError>> {
        match &self.current {
            Some(result) => futures::future::ready(result.clone()).boxed(),
            None => futures::future::pending().boxed(),
        }
    }

    fn start_updates(
        &self,
        _interval: Duration,
    ) -> Result<mpsc::Receiver<LocationFix>, PlatformError> {
        Err(PlatformError::Service("updates unsupported".to_string()))
    }

    fn stop_updates(&self) {}
}

struct FailingGeocoder;

impl Geocoder for FailingGeocoder {
    fn reverse_geocode(
        &self,
        _coordinate: Coordinate,
    ) -> BoxFuture<'_, Result<Option<String>, PlatformError>> {
        futures::future::ready(Err(PlatformError::Service("offline".to_string()))).boxed()
    }
}

struct NamingGeocoder;

impl Geocoder for NamingGeocoder {
    fn reverse_geocode(
        &self,
        _coordinate: Coordinate,
    ) -> BoxFuture<'_, Result<Option<String>, PlatformError>> {
        futures::future::ready(Ok(Some("Huangpu, Shanghai".to_string()))).boxed()
    }
}

fn provider(source: impl LocationSource + 'static) -> LocationProvider {
    LocationProvider::new(Arc::new(source)).with_fix_timeout(Duration::from_millis(50))
}

#[tokio::test]
async fn missing_permission_is_reported_before_anything_else() {
    let provider = provider(FixedLocationSource::new(Some(shanghai())).without_permission());
    assert_eq!(provider.get_last_location().await, LocationResult::PermissionDenied);
    assert_eq!(provider.get_current_location().await, LocationResult::PermissionDenied);
}

#[tokio::test]
async fn disabled_service_is_reported() {
    let provider = provider(FixedLocationSource::new(Some(shanghai())).disabled());
    assert_eq!(provider.get_current_location().await, LocationResult::LocationDisabled);
}

#[tokio::test]
async fn fixed_source_yields_its_coordinate() {
    let provider = provider(FixedLocationSource::new(Some(shanghai())));
    assert_eq!(provider.get_last_location().await.coordinate(), Some(shanghai()));
}

#[tokio::test]
async fn last_location_falls_back_to_a_fresh_fix() {
    let provider = provider(ScriptedSource {
        last: Ok(None),
        current: Some(Ok(Some(LocationFix::new(shanghai())))),
    });
    assert_eq!(provider.get_last_location().await.coordinate(), Some(shanghai()));
}

#[tokio::test]
async fn security_failure_maps_to_permission_denied() {
    let provider = provider(ScriptedSource {
        last: Ok(None),
        current: Some(Err(PlatformError::Security("revoked".to_string()))),
    });
    assert_eq!(provider.get_current_location().await, LocationResult::PermissionDenied);
}

#[tokio::test]
async fn service_failure_maps_to_error() {
    let provider = provider(ScriptedSource {
        last: Err(PlatformError::Service("gps chip asleep".to_string())),
        current: None,
    });
    assert_eq!(
        provider.get_last_location().await,
        LocationResult::Error("gps chip asleep".to_string())
    );
}

#[tokio::test]
async fn hanging_fix_times_out_as_error() {
    let provider = provider(ScriptedSource {
        last: Ok(None),
        current: None,
    });
    let result = provider.get_current_location().await;
    assert!(
        matches!(result, LocationResult::Error(ref msg) if msg.contains("timed out")),
        "expected timeout error, got: {result:?}"
    );
}

#[tokio::test]
async fn no_fix_is_an_error() {
    let provider = provider(FixedLocationSource::new(None));
    assert!(matches!(
        provider.get_current_location().await,
        LocationResult::Error(_)
    ));
}

#[tokio::test]
async fn updates_emit_fixes_and_stop_on_drop() {
    let source = Arc::new(FixedLocationSource::new(Some(shanghai())));
    let provider = LocationProvider::new(source.clone())
        .with_update_interval(Duration::from_millis(10));

    let mut updates = provider.location_updates();
    assert!(updates.is_active());

    let first = updates.next().await.unwrap();
    let second = updates.next().await.unwrap();
    assert_eq!(first.coordinate, shanghai());
    assert_eq!(second.coordinate, shanghai());
    assert!(source.is_updating());

    drop(updates);
    assert!(!source.is_updating());
}

#[tokio::test]
async fn updates_end_immediately_without_permission() {
    let provider = provider(FixedLocationSource::new(Some(shanghai())).without_permission());
    let mut updates = provider.location_updates();
    assert!(!updates.is_active());
    assert!(updates.next().await.is_none());
}

#[tokio::test]
async fn refused_subscription_yields_empty_stream() {
    let provider = provider(ScriptedSource {
        last: Ok(None),
        current: None,
    });
    let mut updates = provider.location_updates();
    assert!(updates.next().await.is_none());
}

#[tokio::test]
async fn reverse_geocode_without_geocoder_is_none() {
    let provider = provider(FixedLocationSource::new(Some(shanghai())));
    assert_eq!(provider.reverse_geocode(shanghai()).await, None);
}

#[tokio::test]
async fn reverse_geocode_failure_is_none() {
    let provider =
        provider(FixedLocationSource::new(Some(shanghai()))).with_geocoder(Arc::new(FailingGeocoder));
    assert_eq!(provider.reverse_geocode(shanghai()).await, None);
}

#[tokio::test]
async fn reverse_geocode_returns_place_name() {
    let provider =
        provider(FixedLocationSource::new(Some(shanghai()))).with_geocoder(Arc::new(NamingGeocoder));
    assert_eq!(
        provider.reverse_geocode(shanghai()).await.as_deref(),
        Some("Huangpu, Shanghai")
    );
}
