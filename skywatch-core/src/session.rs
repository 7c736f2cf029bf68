use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use parking_lot::Mutex;
use tokio::sync::watch;

use crate::{
    geo::GeoStatus,
    model::{FavoriteCandidate, ForecastSeries, Location, SavedLocation, WeatherSnapshot},
    provider::{ClientError, WeatherProvider},
    store::SavedLocationStore,
};

/// Display message for any failed weather/forecast fetch. The underlying
/// error is logged, never surfaced.
pub const FETCH_ERROR: &str = "Failed to fetch weather data. Please try again.";

/// Display message when the device position cannot be resolved to a place.
pub const GEOLOCATION_ERROR: &str = "Failed to get your location. Please try searching instead.";

/// Lifecycle of the one logical request the session tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    /// No location chosen yet.
    #[default]
    Idle,
    /// Fetch in flight.
    Loading,
    /// Data present, no error.
    Ready,
    /// Error present; stale payloads are retained.
    Failed,
}

/// Observable session state, published over a watch channel.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SessionState {
    pub phase: Phase,
    pub location: Option<Location>,
    pub weather: Option<WeatherSnapshot>,
    pub forecast: Option<ForecastSeries>,
    pub error: Option<String>,
}

impl SessionState {
    pub fn is_loading(&self) -> bool {
        self.phase == Phase::Loading
    }
}

/// Orchestrates location selection, the parallel weather + forecast fetch,
/// loading/error transitions, and the history/favorites side effects.
///
/// Consumers read through [`snapshot`](Self::snapshot) or subscribe to the
/// watch channel; no fetch failure ever propagates out as an `Err`.
#[derive(Debug)]
pub struct WeatherSession {
    provider: Arc<dyn WeatherProvider>,
    store: Mutex<SavedLocationStore>,
    state: watch::Sender<SessionState>,
    // Monotonic tag for set_location calls; results from a superseded
    // request are discarded instead of racing a newer one.
    seq: AtomicU64,
}

impl WeatherSession {
    pub fn new(provider: Arc<dyn WeatherProvider>, store: SavedLocationStore) -> Self {
        let (state, _) = watch::channel(SessionState::default());
        Self {
            provider,
            store: Mutex::new(store),
            state,
            seq: AtomicU64::new(0),
        }
    }

    /// Clone of the current session state.
    pub fn snapshot(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Receiver that observes every state transition.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Look up places by name. Nothing is recorded into history until one
    /// of the results is passed to [`set_location`](Self::set_location).
    pub async fn search_locations(&self, query: &str) -> Result<Vec<Location>, ClientError> {
        self.provider.search_locations(query).await
    }

    /// Select a location: record it into history, fetch current conditions
    /// and the forecast in parallel, and publish the outcome.
    ///
    /// The history side effect is unconditional; it happens even when the
    /// fetches fail. Both fetches must succeed for `Ready`; either failure
    /// collapses to [`FETCH_ERROR`].
    pub async fn set_location(&self, location: Location) {
        let seq = self.seq.fetch_add(1, Ordering::SeqCst) + 1;

        if let Err(e) = self.store.lock().add_to_history(&location) {
            tracing::warn!(error = %e, "failed to persist history entry");
        }

        let (lat, lon) = (location.lat, location.lon);
        self.state.send_modify(|s| {
            s.location = Some(location);
            s.phase = Phase::Loading;
            s.error = None;
        });

        let (weather, forecast) = tokio::join!(
            self.provider.current_weather(lat, lon),
            self.provider.forecast(lat, lon),
        );

        if self.seq.load(Ordering::SeqCst) != seq {
            tracing::debug!(seq, "dropping results of superseded location request");
            return;
        }

        match (weather, forecast) {
            (Ok(weather), Ok(forecast)) => {
                self.state.send_modify(|s| {
                    s.weather = Some(weather);
                    s.forecast = Some(forecast);
                    s.phase = Phase::Ready;
                });
            }
            (weather, forecast) => {
                if let Err(e) = &weather {
                    tracing::error!(error = %e, "current weather fetch failed");
                }
                if let Err(e) = &forecast {
                    tracing::error!(error = %e, "forecast fetch failed");
                }
                self.state.send_modify(|s| {
                    s.phase = Phase::Failed;
                    s.error = Some(FETCH_ERROR.to_string());
                });
            }
        }
    }

    /// Resolve the device position to a place and select it.
    ///
    /// A failed geolocation source surfaces its message verbatim without
    /// touching the network. An empty reverse-geocode result or a geocoding
    /// failure becomes [`GEOLOCATION_ERROR`]; weather data is left as-is.
    pub async fn use_current_location(&self, geo: &GeoStatus) {
        match geo {
            GeoStatus::Loading => {}
            GeoStatus::Failed(message) => {
                let message = message.clone();
                self.state.send_modify(|s| {
                    s.phase = Phase::Failed;
                    s.error = Some(message);
                });
            }
            GeoStatus::Ready { lat, lon } => {
                self.state.send_modify(|s| {
                    s.phase = Phase::Loading;
                    s.error = None;
                });

                match self.provider.reverse_geocode(*lat, *lon).await {
                    Ok(mut places) if !places.is_empty() => {
                        self.set_location(places.remove(0)).await;
                    }
                    Ok(_) => {
                        tracing::warn!(lat, lon, "reverse geocode returned no places");
                        self.fail_geolocation();
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "reverse geocode failed");
                        self.fail_geolocation();
                    }
                }
            }
        }
    }

    /// Auto-trigger: once the geolocation source settles without error and
    /// no location has been chosen yet, select the device position.
    /// Idempotent after `location` is set.
    pub async fn on_geolocation_update(&self, geo: &GeoStatus) {
        if geo.is_loading() || matches!(geo, GeoStatus::Failed(_)) {
            return;
        }
        if self.state.borrow().location.is_some() {
            return;
        }
        self.use_current_location(geo).await;
    }

    fn fail_geolocation(&self) {
        self.state.send_modify(|s| {
            s.phase = Phase::Failed;
            s.error = Some(GEOLOCATION_ERROR.to_string());
        });
    }

    // ---- history / favorites pass-through ----

    pub fn history(&self) -> Vec<SavedLocation> {
        self.store.lock().history().to_vec()
    }

    pub fn favorites(&self) -> Vec<SavedLocation> {
        self.store.lock().favorites().to_vec()
    }

    pub fn clear_history(&self) {
        if let Err(e) = self.store.lock().clear_history() {
            tracing::warn!(error = %e, "failed to persist cleared history");
        }
    }

    pub fn is_favorite(&self, lat: f64, lon: f64) -> bool {
        self.store.lock().is_favorite(lat, lon)
    }

    pub fn add_favorite(&self, candidate: FavoriteCandidate) {
        if let Err(e) = self.store.lock().add_to_favorites(candidate) {
            tracing::warn!(error = %e, "failed to persist favorite");
        }
    }

    pub fn remove_favorite(&self, id: &str) {
        if let Err(e) = self.store.lock().remove_from_favorites(id) {
            tracing::warn!(error = %e, "failed to persist favorite removal");
        }
    }

    /// Flip the favorite status of the current location. Returns the new
    /// status, or `None` when no location is selected.
    pub fn toggle_current_favorite(&self) -> Option<bool> {
        let location = self.state.borrow().location.clone()?;
        let mut store = self.store.lock();

        if store.is_favorite(location.lat, location.lon) {
            let id = store
                .favorites()
                .iter()
                .find(|fav| fav.location.same_spot(location.lat, location.lon))
                .map(|fav| fav.id.clone());
            if let Some(id) = id {
                if let Err(e) = store.remove_from_favorites(&id) {
                    tracing::warn!(error = %e, "failed to persist favorite removal");
                }
            }
            Some(false)
        } else {
            if let Err(e) = store.add_to_favorites(location.into()) {
                tracing::warn!(error = %e, "failed to persist favorite");
            }
            Some(true)
        }
    }
}
