use anyhow::{Context, bail};
use chrono::FixedOffset;
use clap::{Parser, Subcommand};
use skywatch_core::{
    Config, GeoStatus, Phase, SavedLocationStore, SessionState, WeatherSession,
    provider_from_config,
};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "skywatch", version, about = "Weather dashboard CLI")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store the OpenWeather API key.
    Configure,

    /// Search for a place by name.
    Search {
        /// Free-text query, e.g. "Paris".
        query: String,
    },

    /// Show current conditions and the forecast for a place.
    Show {
        /// Place name; the best search match is used.
        place: Option<String>,

        /// Use explicit device coordinates instead, e.g. --coords 48.85,2.35
        #[arg(long, conflicts_with = "place")]
        coords: Option<String>,
    },

    /// List recently viewed places.
    History {
        /// Empty the history list.
        #[arg(long)]
        clear: bool,
    },

    /// List favorite places.
    Favorites,

    /// Add a place to favorites.
    Favorite {
        /// Place name; the best search match is saved.
        place: String,
    },

    /// Remove a favorite by its id (see `favorites`).
    Unfavorite { id: String },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Configure => configure(),
            Command::Search { query } => search(&query).await,
            Command::Show { place, coords } => show(place.as_deref(), coords.as_deref()).await,
            Command::History { clear } => history(clear),
            Command::Favorites => favorites(),
            Command::Favorite { place } => favorite(&place).await,
            Command::Unfavorite { id } => unfavorite(&id),
        }
    }
}

fn open_session(config: &Config) -> anyhow::Result<WeatherSession> {
    let provider = provider_from_config(config);
    let store = SavedLocationStore::open(Config::data_dir()?, config.history_limit)?;
    Ok(WeatherSession::new(provider, store))
}

fn configure() -> anyhow::Result<()> {
    let mut config = Config::load()?;

    let key = inquire::Text::new("OpenWeather API key:")
        .prompt()
        .context("Failed to read API key")?;

    config.api_key = Some(key.trim().to_string());
    config.save()?;

    println!("Saved. Config file: {}", Config::config_file_path()?.display());
    Ok(())
}

async fn search(query: &str) -> anyhow::Result<()> {
    let config = Config::load()?;
    let session = open_session(&config)?;

    let matches = session.search_locations(query).await?;
    if matches.is_empty() {
        println!("No places found for '{query}'.");
        return Ok(());
    }

    for loc in &matches {
        println!("{}  ({:.4}, {:.4})", loc.label(), loc.lat, loc.lon);
    }
    Ok(())
}

async fn show(place: Option<&str>, coords: Option<&str>) -> anyhow::Result<()> {
    let config = Config::load()?;
    let session = open_session(&config)?;

    match (place, coords) {
        (_, Some(coords)) => {
            let (lat, lon) = parse_coords(coords)?;
            session
                .use_current_location(&GeoStatus::Ready { lat, lon })
                .await;
        }
        (Some(place), None) => {
            let mut matches = session.search_locations(place).await?;
            if matches.is_empty() {
                bail!("No places found for '{place}'.");
            }
            session.set_location(matches.remove(0)).await;
        }
        (None, None) => bail!("Provide a place name or --coords."),
    }

    print_state(&session.snapshot(), &session);
    Ok(())
}

fn history(clear: bool) -> anyhow::Result<()> {
    let config = Config::load()?;
    let session = open_session(&config)?;

    if clear {
        session.clear_history();
        println!("History cleared.");
        return Ok(());
    }

    let entries = session.history();
    if entries.is_empty() {
        println!("No history yet.");
        return Ok(());
    }

    for entry in &entries {
        println!(
            "{}  {}",
            entry.timestamp.format("%Y-%m-%d %H:%M"),
            entry.location.label()
        );
    }
    Ok(())
}

fn favorites() -> anyhow::Result<()> {
    let config = Config::load()?;
    let session = open_session(&config)?;

    let entries = session.favorites();
    if entries.is_empty() {
        println!("No favorites yet.");
        return Ok(());
    }

    for entry in &entries {
        println!("{}  {}", entry.id, entry.location.label());
    }
    Ok(())
}

async fn favorite(place: &str) -> anyhow::Result<()> {
    let config = Config::load()?;
    let session = open_session(&config)?;

    let mut matches = session.search_locations(place).await?;
    if matches.is_empty() {
        bail!("No places found for '{place}'.");
    }

    let loc = matches.remove(0);
    let label = loc.label();
    session.add_favorite(loc.into());
    println!("Added {label} to favorites.");
    Ok(())
}

fn unfavorite(id: &str) -> anyhow::Result<()> {
    let config = Config::load()?;
    let session = open_session(&config)?;

    session.remove_favorite(id);
    println!("Removed {id} (if it existed).");
    Ok(())
}

fn parse_coords(coords: &str) -> anyhow::Result<(f64, f64)> {
    let (lat, lon) = coords
        .split_once(',')
        .context("Expected --coords as lat,lon")?;

    let lat: f64 = lat.trim().parse().context("Invalid latitude")?;
    let lon: f64 = lon.trim().parse().context("Invalid longitude")?;
    Ok((lat, lon))
}

fn print_state(state: &SessionState, session: &WeatherSession) {
    if state.phase == Phase::Failed {
        if let Some(error) = &state.error {
            println!("{error}");
        }
        return;
    }

    let Some(weather) = &state.weather else {
        println!("No weather data available.");
        return;
    };

    let star = state
        .location
        .as_ref()
        .is_some_and(|loc| session.is_favorite(loc.lat, loc.lon));

    println!(
        "{}{}, {}",
        if star { "★ " } else { "" },
        weather.place,
        weather.country
    );
    println!(
        "  {:.1}°C (feels like {:.1}°C)  {}",
        weather.temperature_c,
        weather.feels_like_c,
        weather
            .conditions
            .first()
            .map(|c| c.description.as_str())
            .unwrap_or("unknown")
    );
    println!(
        "  humidity {}%  wind {:.1} m/s{}",
        weather.humidity_pct,
        weather.wind_speed_mps,
        weather
            .visibility_m
            .map(|v| format!("  visibility {:.1} km", f64::from(v) / 1000.0))
            .unwrap_or_default()
    );

    if let Some(offset) = FixedOffset::east_opt(weather.timezone_offset_secs) {
        println!(
            "  sunrise {}  sunset {}",
            weather.sunrise.with_timezone(&offset).format("%H:%M"),
            weather.sunset.with_timezone(&offset).format("%H:%M")
        );
    }

    let Some(forecast) = &state.forecast else {
        return;
    };
    let Some(offset) = FixedOffset::east_opt(forecast.timezone_offset_secs) else {
        return;
    };

    println!("\nForecast:");
    for entry in forecast.entries.iter().take(8) {
        println!(
            "  {}  {:>5.1}°C  {}",
            entry.at.with_timezone(&offset).format("%a %H:%M"),
            entry.temperature_c,
            entry
                .conditions
                .first()
                .map(|c| c.description.as_str())
                .unwrap_or("unknown")
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_coords_accepts_lat_lon_pair() {
        let (lat, lon) = parse_coords("48.85, 2.35").expect("parse");
        assert_eq!(lat, 48.85);
        assert_eq!(lon, 2.35);
    }

    #[test]
    fn parse_coords_rejects_garbage() {
        assert!(parse_coords("48.85").is_err());
        assert!(parse_coords("north,south").is_err());
    }
}
