//! Device location behind a platform-neutral source trait.
//!
//! `LocationProvider` turns a [`LocationSource`] into the four outcomes the
//! rest of the client understands ([`LocationResult`]) and owns the timeout
//! for a fresh fix. Continuous updates are handed out as a stream that
//! stops the platform subscription when dropped.

use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll};
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, FutureExt};
use futures::Stream;
use qzone_core::{AppConfig, Coordinate};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

const DEFAULT_FIX_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_UPDATE_INTERVAL: Duration = Duration::from_secs(30);
const UPDATE_CHANNEL_CAPACITY: usize = 8;

#[derive(Debug, Clone, PartialEq)]
pub struct LocationFix {
    pub coordinate: Coordinate,
    pub accuracy_meters: Option<f64>,
    pub recorded_at: DateTime<Utc>,
}

impl LocationFix {
    #[must_use]
    pub fn new(coordinate: Coordinate) -> Self {
        Self {
            coordinate,
            accuracy_meters: None,
            recorded_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LocationResult {
    PermissionDenied,
    LocationDisabled,
    Success(LocationFix),
    Error(String),
}

impl LocationResult {
    #[must_use]
    pub fn fix(&self) -> Option<&LocationFix> {
        match self {
            LocationResult::Success(fix) => Some(fix),
            _ => None,
        }
    }

    #[must_use]
    pub fn coordinate(&self) -> Option<Coordinate> {
        self.fix().map(|f| f.coordinate)
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlatformError {
    /// Permission was revoked between the check and the request.
    #[error("location access denied: {0}")]
    Security(String),

    #[error("location service failure: {0}")]
    Service(String),
}

/// Platform location services.
pub trait LocationSource: Send + Sync {
    fn has_permission(&self) -> bool;

    fn is_enabled(&self) -> bool;

    /// Cached fix, if the platform has one.
    fn last_known(&self) -> BoxFuture<'_, Result<Option<LocationFix>, PlatformError>>;

    /// Request one fresh high-accuracy fix. May never resolve.
    fn current_fix(&self) -> BoxFuture<'_, Result<Option<LocationFix>, PlatformError>>;

    /// Begin periodic updates delivered on the returned channel.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError`] if the subscription cannot be started.
    fn start_updates(
        &self,
        interval: Duration,
    ) -> Result<mpsc::Receiver<LocationFix>, PlatformError>;

    fn stop_updates(&self);
}

/// Coordinate to place-name lookup.
pub trait Geocoder: Send + Sync {
    fn reverse_geocode(
        &self,
        coordinate: Coordinate,
    ) -> BoxFuture<'_, Result<Option<String>, PlatformError>>;
}

#[derive(Clone)]
pub struct LocationProvider {
    source: Arc<dyn LocationSource>,
    geocoder: Option<Arc<dyn Geocoder>>,
    fix_timeout: Duration,
    update_interval: Duration,
}

impl LocationProvider {
    #[must_use]
    pub fn new(source: Arc<dyn LocationSource>) -> Self {
        Self {
            source,
            geocoder: None,
            fix_timeout: DEFAULT_FIX_TIMEOUT,
            update_interval: DEFAULT_UPDATE_INTERVAL,
        }
    }

    #[must_use]
    pub fn from_app_config(source: Arc<dyn LocationSource>, config: &AppConfig) -> Self {
        Self::new(source)
            .with_fix_timeout(Duration::from_secs(config.location_fix_timeout_secs))
            .with_update_interval(Duration::from_secs(config.location_update_interval_secs))
    }

    #[must_use]
    pub fn with_geocoder(mut self, geocoder: Arc<dyn Geocoder>) -> Self {
        self.geocoder = Some(geocoder);
        self
    }

    #[must_use]
    pub fn with_fix_timeout(mut self, timeout: Duration) -> Self {
        self.fix_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_update_interval(mut self, interval: Duration) -> Self {
        self.update_interval = interval;
        self
    }

    fn precheck(&self) -> Option<LocationResult> {
        if !self.source.has_permission() {
            return Some(LocationResult::PermissionDenied);
        }
        if !self.source.is_enabled() {
            return Some(LocationResult::LocationDisabled);
        }
        None
    }

    /// Last known position, or a fresh fix when the platform has none cached.
    pub async fn get_last_location(&self) -> LocationResult {
        if let Some(blocked) = self.precheck() {
            return blocked;
        }
        match self.source.last_known().await {
            Ok(Some(fix)) => LocationResult::Success(fix),
            Ok(None) => self.get_current_location().await,
            Err(e) => platform_failure(&e),
        }
    }

    /// One fresh fix, bounded by the configured wait.
    pub async fn get_current_location(&self) -> LocationResult {
        if let Some(blocked) = self.precheck() {
            return blocked;
        }
        match tokio::time::timeout(self.fix_timeout, self.source.current_fix()).await {
            Ok(Ok(Some(fix))) => LocationResult::Success(fix),
            Ok(Ok(None)) => LocationResult::Error("no location fix available".to_string()),
            Ok(Err(e)) => platform_failure(&e),
            Err(_) => {
                tracing::warn!(
                    timeout_secs = self.fix_timeout.as_secs_f64(),
                    "timed out waiting for a location fix"
                );
                LocationResult::Error("timed out waiting for a location fix".to_string())
            }
        }
    }

    /// Periodic fixes until the returned stream is dropped.
    ///
    /// Without permission, or if the platform refuses the subscription, the
    /// stream ends immediately.
    #[must_use]
    pub fn location_updates(&self) -> LocationUpdates {
        if !self.source.has_permission() {
            tracing::debug!("location permission missing; update stream is empty");
            return LocationUpdates { active: None };
        }
        match self.source.start_updates(self.update_interval) {
            Ok(receiver) => LocationUpdates {
                active: Some(ActiveUpdates {
                    source: Arc::clone(&self.source),
                    receiver,
                }),
            },
            Err(e) => {
                tracing::warn!(error = %e, "failed to start location updates");
                LocationUpdates { active: None }
            }
        }
    }

    /// Place name for `coordinate`; `None` when no geocoder is wired in or the lookup fails.
    pub async fn reverse_geocode(&self, coordinate: Coordinate) -> Option<String> {
        let geocoder = self.geocoder.as_ref()?;
        match geocoder.reverse_geocode(coordinate).await {
            Ok(name) => name,
            Err(e) => {
                tracing::warn!(%coordinate, error = %e, "reverse geocoding failed");
                None
            }
        }
    }
}

fn platform_failure(error: &PlatformError) -> LocationResult {
    match error {
        PlatformError::Security(_) => LocationResult::PermissionDenied,
        PlatformError::Service(message) => LocationResult::Error(message.clone()),
    }
}

struct ActiveUpdates {
    source: Arc<dyn LocationSource>,
    receiver: mpsc::Receiver<LocationFix>,
}

/// Stream of periodic fixes. Dropping it stops the platform subscription.
pub struct LocationUpdates {
    active: Option<ActiveUpdates>,
}

impl LocationUpdates {
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }
}

impl Stream for LocationUpdates {
    type Item = LocationFix;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        match self.active.as_mut() {
            Some(active) => active.receiver.poll_recv(cx),
            None => Poll::Ready(None),
        }
    }
}

impl Drop for LocationUpdates {
    fn drop(&mut self) {
        if let Some(active) = self.active.take() {
            active.source.stop_updates();
        }
    }
}

/// A location source pinned to a configured coordinate.
///
/// Stands in for platform services in the CLI and in tests.
pub struct FixedLocationSource {
    position: Option<Coordinate>,
    permission: bool,
    enabled: bool,
    updates: Mutex<Option<JoinHandle<()>>>,
}

impl FixedLocationSource {
    #[must_use]
    pub fn new(position: Option<Coordinate>) -> Self {
        Self {
            position,
            permission: true,
            enabled: true,
            updates: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn without_permission(mut self) -> Self {
        self.permission = false;
        self
    }

    #[must_use]
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// A periodic update task is currently running.
    #[must_use]
    pub fn is_updating(&self) -> bool {
        self.updates
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    fn fix(&self) -> Option<LocationFix> {
        self.position.map(LocationFix::new)
    }
}

impl LocationSource for FixedLocationSource {
    fn has_permission(&self) -> bool {
        self.permission
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn last_known(&self) -> BoxFuture<'_, Result<Option<LocationFix>, PlatformError>> {
        futures::future::ready(Ok(self.fix())).boxed()
    }

    fn current_fix(&self) -> BoxFuture<'_, Result<Option<LocationFix>, PlatformError>> {
        futures::future::ready(Ok(self.fix())).boxed()
    }

    fn start_updates(
        &self,
        interval: Duration,
    ) -> Result<mpsc::Receiver<LocationFix>, PlatformError> {
        let position = self
            .position
            .ok_or_else(|| PlatformError::Service("no fixed position configured".to_string()))?;
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| PlatformError::Service(e.to_string()))?;

        let (tx, rx) = mpsc::channel(UPDATE_CHANNEL_CAPACITY);
        let handle = runtime.spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                if tx.send(LocationFix::new(position)).await.is_err() {
                    break;
                }
            }
        });

        let mut slot = self.updates.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = slot.replace(handle) {
            previous.abort();
        }
        Ok(rx)
    }

    fn stop_updates(&self) {
        if let Some(handle) = self
            .updates
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            handle.abort();
        }
    }
}

#[cfg(test)]
#[path = "location_test.rs"]
mod tests;
