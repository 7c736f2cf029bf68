use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;

use crate::model::{Condition, ForecastEntry, ForecastSeries, Location, WeatherSnapshot};

use super::{ClientError, WeatherProvider};

const API_BASE: &str = "https://api.openweathermap.org";

const GEO_DIRECT_PATH: &str = "/geo/1.0/direct";
const GEO_REVERSE_PATH: &str = "/geo/1.0/reverse";
const CURRENT_PATH: &str = "/data/2.5/weather";
const FORECAST_PATH: &str = "/data/2.5/forecast";

/// Queries shorter than this (after trimming) are answered with an empty
/// result list without issuing a request.
const MIN_QUERY_LEN: usize = 2;

const SEARCH_LIMIT: &str = "5";
const REVERSE_LIMIT: &str = "1";

#[derive(Debug, Clone)]
pub struct OpenWeatherClient {
    api_key: String,
    base_url: String,
    http: Client,
}

impl OpenWeatherClient {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            base_url: API_BASE.to_string(),
            http: Client::new(),
        }
    }

    #[cfg(test)]
    pub fn new_with_base_url(api_key: String, base_url: &str) -> Self {
        Self {
            api_key,
            base_url: base_url.to_string(),
            http: Client::new(),
        }
    }

    /// One GET round trip: send, check status, hand back the raw body.
    /// Reading the body as text first keeps non-JSON error pages readable
    /// in the surfaced message.
    async fn request(&self, path: &str, query: &[(&str, &str)]) -> Result<String, ClientError> {
        let url = format!("{}{}", self.base_url, path);

        let res = self.http.get(&url).query(query).send().await?;

        let status = res.status();
        let body = res.text().await?;

        if !status.is_success() {
            return Err(ClientError::Api {
                status,
                body: truncate_body(&body),
            });
        }

        Ok(body)
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherClient {
    async fn search_locations(&self, query: &str) -> Result<Vec<Location>, ClientError> {
        let trimmed = query.trim();
        if trimmed.chars().count() < MIN_QUERY_LEN {
            return Ok(Vec::new());
        }

        let body = self
            .request(
                GEO_DIRECT_PATH,
                &[
                    ("q", trimmed),
                    ("limit", SEARCH_LIMIT),
                    ("appid", self.api_key.as_str()),
                ],
            )
            .await?;

        let parsed: Vec<OwGeoEntry> = serde_json::from_str(&body)?;
        Ok(parsed.into_iter().map(Location::from).collect())
    }

    async fn reverse_geocode(&self, lat: f64, lon: f64) -> Result<Vec<Location>, ClientError> {
        let body = self
            .request(
                GEO_REVERSE_PATH,
                &[
                    ("lat", lat.to_string().as_str()),
                    ("lon", lon.to_string().as_str()),
                    ("limit", REVERSE_LIMIT),
                    ("appid", self.api_key.as_str()),
                ],
            )
            .await?;

        let parsed: Vec<OwGeoEntry> = serde_json::from_str(&body)?;
        Ok(parsed.into_iter().map(Location::from).collect())
    }

    async fn current_weather(&self, lat: f64, lon: f64) -> Result<WeatherSnapshot, ClientError> {
        let body = self
            .request(
                CURRENT_PATH,
                &[
                    ("lat", lat.to_string().as_str()),
                    ("lon", lon.to_string().as_str()),
                    ("units", "metric"),
                    ("appid", self.api_key.as_str()),
                ],
            )
            .await?;

        let parsed: OwCurrentResponse = serde_json::from_str(&body)?;

        Ok(WeatherSnapshot {
            place: parsed.name,
            country: parsed.sys.country.unwrap_or_default(),
            lat: parsed.coord.lat,
            lon: parsed.coord.lon,
            temperature_c: parsed.main.temp,
            feels_like_c: parsed.main.feels_like,
            humidity_pct: parsed.main.humidity,
            wind_speed_mps: parsed.wind.speed,
            visibility_m: parsed.visibility,
            conditions: map_conditions(parsed.weather),
            sunrise: unix_to_utc(parsed.sys.sunrise),
            sunset: unix_to_utc(parsed.sys.sunset),
            timezone_offset_secs: parsed.timezone,
            observed_at: unix_to_utc(parsed.dt),
        })
    }

    async fn forecast(&self, lat: f64, lon: f64) -> Result<ForecastSeries, ClientError> {
        let body = self
            .request(
                FORECAST_PATH,
                &[
                    ("lat", lat.to_string().as_str()),
                    ("lon", lon.to_string().as_str()),
                    ("units", "metric"),
                    ("appid", self.api_key.as_str()),
                ],
            )
            .await?;

        let parsed: OwForecastResponse = serde_json::from_str(&body)?;

        let entries = parsed
            .list
            .into_iter()
            .map(|e| ForecastEntry {
                at: unix_to_utc(e.dt),
                temperature_c: e.main.temp,
                feels_like_c: e.main.feels_like,
                humidity_pct: e.main.humidity,
                wind_speed_mps: e.wind.speed,
                conditions: map_conditions(e.weather),
            })
            .collect();

        Ok(ForecastSeries {
            city: parsed.city.name,
            country: parsed.city.country,
            timezone_offset_secs: parsed.city.timezone,
            entries,
        })
    }
}

#[derive(Debug, Deserialize)]
struct OwGeoEntry {
    name: String,
    country: String,
    state: Option<String>,
    lat: f64,
    lon: f64,
}

impl From<OwGeoEntry> for Location {
    fn from(e: OwGeoEntry) -> Self {
        Location {
            name: e.name,
            country: e.country,
            state: e.state,
            lat: e.lat,
            lon: e.lon,
        }
    }
}

#[derive(Debug, Deserialize)]
struct OwCoord {
    lat: f64,
    lon: f64,
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
    feels_like: f64,
    humidity: u8,
}

#[derive(Debug, Deserialize)]
struct OwCondition {
    id: i64,
    main: String,
    description: String,
    icon: String,
}

#[derive(Debug, Deserialize)]
struct OwWind {
    speed: f64,
}

#[derive(Debug, Deserialize)]
struct OwSys {
    country: Option<String>,
    sunrise: i64,
    sunset: i64,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    coord: OwCoord,
    weather: Vec<OwCondition>,
    main: OwMain,
    visibility: Option<u32>,
    wind: OwWind,
    sys: OwSys,
    timezone: i32,
    dt: i64,
    name: String,
}

#[derive(Debug, Deserialize)]
struct OwCity {
    name: String,
    country: String,
    timezone: i32,
}

#[derive(Debug, Deserialize)]
struct OwForecastEntry {
    dt: i64,
    main: OwMain,
    weather: Vec<OwCondition>,
    wind: OwWind,
}

#[derive(Debug, Deserialize)]
struct OwForecastResponse {
    city: OwCity,
    list: Vec<OwForecastEntry>,
}

fn map_conditions(conditions: Vec<OwCondition>) -> Vec<Condition> {
    conditions
        .into_iter()
        .map(|c| Condition {
            code: c.id,
            summary: c.main,
            description: c.description,
            icon: c.icon,
        })
        .collect()
}

fn unix_to_utc(ts: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(ts, 0).unwrap_or_else(Utc::now)
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() > MAX {
        let mut cut = MAX;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        format!("{}...", &body[..cut])
    } else {
        body.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn current_payload() -> serde_json::Value {
        json!({
            "coord": {"lat": 48.85, "lon": 2.35},
            "weather": [{"id": 500, "main": "Rain", "description": "light rain", "icon": "10d"}],
            "main": {"temp": 17.3, "feels_like": 16.9, "humidity": 72},
            "visibility": 10000,
            "wind": {"speed": 4.1},
            "sys": {"country": "FR", "sunrise": 1_700_000_000, "sunset": 1_700_030_000},
            "timezone": 3600,
            "dt": 1_700_010_000,
            "name": "Paris"
        })
    }

    #[tokio::test]
    async fn short_query_returns_empty_without_a_request() {
        // Deliberately unroutable base: any request would fail loudly.
        let client = OpenWeatherClient::new_with_base_url("KEY".into(), "http://127.0.0.1:1");

        let hits = client.search_locations(" p ").await.expect("no call made");
        assert!(hits.is_empty());

        let hits = client.search_locations("").await.expect("no call made");
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn search_parses_matches() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/geo/1.0/direct"))
            .and(query_param("q", "Paris"))
            .and(query_param("limit", "5"))
            .and(query_param("appid", "KEY"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"name": "Paris", "country": "FR", "lat": 48.85, "lon": 2.35},
                {"name": "Paris", "country": "US", "state": "Texas", "lat": 33.66, "lon": -95.55}
            ])))
            .mount(&server)
            .await;

        let client = OpenWeatherClient::new_with_base_url("KEY".into(), &server.uri());
        let hits = client.search_locations("  Paris  ").await.expect("search");

        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].country, "FR");
        assert_eq!(hits[1].state.as_deref(), Some("Texas"));
    }

    #[tokio::test]
    async fn reverse_geocode_parses_single_match() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/geo/1.0/reverse"))
            .and(query_param("limit", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"name": "Paris", "country": "FR", "lat": 48.85, "lon": 2.35}
            ])))
            .mount(&server)
            .await;

        let client = OpenWeatherClient::new_with_base_url("KEY".into(), &server.uri());
        let hits = client.reverse_geocode(48.85, 2.35).await.expect("reverse");

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "Paris");
    }

    #[tokio::test]
    async fn current_weather_maps_payload() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/data/2.5/weather"))
            .and(query_param("units", "metric"))
            .respond_with(ResponseTemplate::new(200).set_body_json(current_payload()))
            .mount(&server)
            .await;

        let client = OpenWeatherClient::new_with_base_url("KEY".into(), &server.uri());
        let snap = client.current_weather(48.85, 2.35).await.expect("current");

        assert_eq!(snap.place, "Paris");
        assert_eq!(snap.country, "FR");
        assert_eq!(snap.temperature_c, 17.3);
        assert_eq!(snap.humidity_pct, 72);
        assert_eq!(snap.visibility_m, Some(10_000));
        assert_eq!(snap.conditions.len(), 1);
        assert_eq!(snap.conditions[0].code, 500);
        assert_eq!(snap.timezone_offset_secs, 3600);
        assert_eq!(snap.observed_at.timestamp(), 1_700_010_000);
    }

    #[tokio::test]
    async fn forecast_maps_entries_in_order() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/data/2.5/forecast"))
            .and(query_param("units", "metric"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "city": {"name": "Paris", "country": "FR", "timezone": 3600},
                "list": [
                    {
                        "dt": 1_700_010_000,
                        "main": {"temp": 17.0, "feels_like": 16.5, "humidity": 70},
                        "weather": [{"id": 800, "main": "Clear", "description": "clear sky", "icon": "01d"}],
                        "wind": {"speed": 3.0}
                    },
                    {
                        "dt": 1_700_020_800,
                        "main": {"temp": 15.2, "feels_like": 14.8, "humidity": 76},
                        "weather": [{"id": 801, "main": "Clouds", "description": "few clouds", "icon": "02n"}],
                        "wind": {"speed": 2.4}
                    }
                ]
            })))
            .mount(&server)
            .await;

        let client = OpenWeatherClient::new_with_base_url("KEY".into(), &server.uri());
        let series = client.forecast(48.85, 2.35).await.expect("forecast");

        assert_eq!(series.city, "Paris");
        assert_eq!(series.timezone_offset_secs, 3600);
        assert_eq!(series.entries.len(), 2);
        assert!(series.entries[0].at < series.entries[1].at);
        assert_eq!(series.entries[1].humidity_pct, 76);
    }

    #[tokio::test]
    async fn non_success_status_surfaces_api_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/data/2.5/weather"))
            .respond_with(
                ResponseTemplate::new(401)
                    .set_body_json(json!({"cod": 401, "message": "Invalid API key"})),
            )
            .mount(&server)
            .await;

        let client = OpenWeatherClient::new_with_base_url(String::new(), &server.uri());
        let err = client.current_weather(48.85, 2.35).await.unwrap_err();

        match err {
            ClientError::Api { status, body } => {
                assert_eq!(status.as_u16(), 401);
                assert!(body.contains("Invalid API key"));
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn long_error_bodies_are_truncated() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/geo/1.0/direct"))
            .respond_with(ResponseTemplate::new(500).set_body_string("x".repeat(500)))
            .mount(&server)
            .await;

        let client = OpenWeatherClient::new_with_base_url("KEY".into(), &server.uri());
        let err = client.search_locations("Paris").await.unwrap_err();

        match err {
            ClientError::Api { body, .. } => {
                assert!(body.len() <= 203); // 200 chars + "..."
                assert!(body.ends_with("..."));
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn multibyte_error_bodies_are_truncated_on_a_char_boundary() {
        let server = MockServer::start().await;

        // 100 euro signs = 300 bytes; byte 200 falls inside a character.
        Mock::given(method("GET"))
            .and(path("/geo/1.0/direct"))
            .respond_with(ResponseTemplate::new(500).set_body_string("€".repeat(100)))
            .mount(&server)
            .await;

        let client = OpenWeatherClient::new_with_base_url("KEY".into(), &server.uri());
        let err = client.search_locations("Paris").await.unwrap_err();

        match err {
            ClientError::Api { body, .. } => {
                assert!(body.ends_with("..."));
                let kept = body.trim_end_matches("...");
                assert_eq!(kept.chars().count(), 66); // 198 bytes, last full char
                assert!(kept.chars().all(|c| c == '€'));
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }
}
