use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A place as returned by the geocoding API.
///
/// Identity for dedup purposes is the `(lat, lon)` pair at full f64
/// precision; no rounding tolerance is applied anywhere.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub name: String,
    pub country: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    pub lat: f64,
    pub lon: f64,
}

impl Location {
    /// Exact-equality coordinate match.
    pub fn same_spot(&self, lat: f64, lon: f64) -> bool {
        self.lat == lat && self.lon == lon
    }

    /// Display label, e.g. "Paris, FR" or "Portland, Oregon, US".
    pub fn label(&self) -> String {
        match &self.state {
            Some(state) => format!("{}, {}, {}", self.name, state, self.country),
            None => format!("{}, {}", self.name, self.country),
        }
    }
}

/// A location enriched with a generated identity and capture timestamp,
/// as stored in history and favorites.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedLocation {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub location: Location,
}

impl SavedLocation {
    /// Mint a saved entry with a fresh id and the current instant.
    pub fn mint(location: Location) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            location,
        }
    }
}

/// Input to the favorites list: either a plain location or an entry that
/// already carries an identity (drawn from history).
#[derive(Debug, Clone)]
pub enum FavoriteCandidate {
    Unsaved(Location),
    Saved(SavedLocation),
}

impl From<Location> for FavoriteCandidate {
    fn from(location: Location) -> Self {
        Self::Unsaved(location)
    }
}

impl From<SavedLocation> for FavoriteCandidate {
    fn from(saved: SavedLocation) -> Self {
        Self::Saved(saved)
    }
}

/// One weather condition entry (code + text + icon id).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub code: i64,
    pub summary: String,
    pub description: String,
    pub icon: String,
}

/// Immutable result of a current-conditions fetch, metric units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub place: String,
    pub country: String,
    pub lat: f64,
    pub lon: f64,
    pub temperature_c: f64,
    pub feels_like_c: f64,
    pub humidity_pct: u8,
    pub wind_speed_mps: f64,
    pub visibility_m: Option<u32>,
    pub conditions: Vec<Condition>,
    pub sunrise: DateTime<Utc>,
    pub sunset: DateTime<Utc>,
    pub timezone_offset_secs: i32,
    pub observed_at: DateTime<Utc>,
}

/// One 3-hour forecast step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastEntry {
    pub at: DateTime<Utc>,
    pub temperature_c: f64,
    pub feels_like_c: f64,
    pub humidity_pct: u8,
    pub wind_speed_mps: f64,
    pub conditions: Vec<Condition>,
}

/// Ordered multi-day forecast plus the originating city's timezone offset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastSeries {
    pub city: String,
    pub country: String,
    pub timezone_offset_secs: i32,
    pub entries: Vec<ForecastEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paris() -> Location {
        Location {
            name: "Paris".to_string(),
            country: "FR".to_string(),
            state: None,
            lat: 48.85,
            lon: 2.35,
        }
    }

    #[test]
    fn same_spot_is_exact() {
        let loc = paris();
        assert!(loc.same_spot(48.85, 2.35));
        // No tolerance: the tiniest drift is a different place.
        assert!(!loc.same_spot(48.850_000_001, 2.35));
    }

    #[test]
    fn label_includes_state_when_present() {
        let mut loc = paris();
        assert_eq!(loc.label(), "Paris, FR");

        loc.state = Some("Île-de-France".to_string());
        assert_eq!(loc.label(), "Paris, Île-de-France, FR");
    }

    #[test]
    fn minted_saved_locations_get_unique_ids() {
        let a = SavedLocation::mint(paris());
        let b = SavedLocation::mint(paris());
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn saved_location_serializes_flat() {
        let saved = SavedLocation::mint(paris());
        let value = serde_json::to_value(&saved).expect("serialize");

        // The location fields sit at the top level next to id/timestamp,
        // matching the stored list layout.
        assert_eq!(value["name"], "Paris");
        assert_eq!(value["lat"], 48.85);
        assert!(value["id"].is_string());
        assert!(value.get("location").is_none());
    }
}
