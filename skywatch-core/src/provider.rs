use crate::{
    Config,
    model::{ForecastSeries, Location, WeatherSnapshot},
    provider::openweather::OpenWeatherClient,
};
use async_trait::async_trait;
use std::{fmt::Debug, sync::Arc};
use thiserror::Error;

pub mod openweather;

/// Errors surfaced by the weather/geocoding client.
///
/// There is no structured API error code: a non-success response collapses
/// to the status plus a truncated body, so callers cannot tell "not found"
/// from "rate limited".
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("API returned status {status}: {body}")]
    Api {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// The four stateless request operations the dashboard needs. Each is a
/// single request/response round trip: no retry, no timeout, no caching.
#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    /// Free-text place search, up to 5 matches. A trimmed query shorter
    /// than 2 characters returns an empty list without touching the network.
    async fn search_locations(&self, query: &str) -> Result<Vec<Location>, ClientError>;

    /// Best-match place for a coordinate, 0 or 1 results.
    async fn reverse_geocode(&self, lat: f64, lon: f64) -> Result<Vec<Location>, ClientError>;

    /// Current conditions at a coordinate, metric units.
    async fn current_weather(&self, lat: f64, lon: f64) -> Result<WeatherSnapshot, ClientError>;

    /// Multi-day 3-hour-step forecast at a coordinate, metric units.
    async fn forecast(&self, lat: f64, lon: f64) -> Result<ForecastSeries, ClientError>;
}

/// Construct the OpenWeather client from config. The key is passed through
/// as-is; an absent key means requests fail when they are issued.
pub fn provider_from_config(config: &Config) -> Arc<dyn WeatherProvider> {
    Arc::new(OpenWeatherClient::new(config.resolved_api_key()))
}
