//! Core library for the `skywatch` weather dashboard.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - The OpenWeather geocoding/weather client
//! - The durable history & favorites store
//! - The weather session state manager the presentation layer observes
//!
//! It is used by `skywatch-cli`, but can also be reused by other front ends.

pub mod config;
pub mod geo;
pub mod model;
pub mod provider;
pub mod session;
pub mod store;

pub use config::Config;
pub use geo::GeoStatus;
pub use model::{
    FavoriteCandidate, ForecastEntry, ForecastSeries, Location, SavedLocation, WeatherSnapshot,
};
pub use provider::{ClientError, WeatherProvider, provider_from_config};
pub use session::{FETCH_ERROR, GEOLOCATION_ERROR, Phase, SessionState, WeatherSession};
pub use store::SavedLocationStore;
