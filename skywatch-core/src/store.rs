use anyhow::{Context, Result};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::model::{FavoriteCandidate, Location, SavedLocation};

/// Storage key (file stem) for the search history list.
pub const HISTORY_KEY: &str = "weather_search_history";
/// Storage key (file stem) for the favorites list.
pub const FAVORITES_KEY: &str = "weather_favorites";

/// Durable store for the two saved-location lists.
///
/// Both lists are loaded once at open and held in memory; every mutation
/// rewrites the affected list in full (last-writer-wins, no partial
/// updates). History is bounded and deduplicated by coordinate; favorites
/// are unbounded and deduplicated by id or coordinate depending on the
/// candidate shape.
#[derive(Debug)]
pub struct SavedLocationStore {
    dir: PathBuf,
    history_limit: usize,
    history: Vec<SavedLocation>,
    favorites: Vec<SavedLocation>,
}

impl SavedLocationStore {
    /// Open the store rooted at `dir`, creating the directory as needed.
    /// A missing or unreadable list starts empty rather than failing.
    pub fn open(dir: impl Into<PathBuf>, history_limit: usize) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create data directory: {}", dir.display()))?;

        let history = load_list(&dir, HISTORY_KEY);
        let favorites = load_list(&dir, FAVORITES_KEY);

        Ok(Self {
            dir,
            history_limit,
            history,
            favorites,
        })
    }

    /// Record a location at the front of the history.
    ///
    /// Any prior entry at the same coordinate is dropped first, then the
    /// list is truncated to the configured limit. Recording is independent
    /// of whether the weather fetch for the location later succeeds.
    pub fn add_to_history(&mut self, location: &Location) -> Result<SavedLocation> {
        let saved = SavedLocation::mint(location.clone());

        self.history
            .retain(|item| !item.location.same_spot(location.lat, location.lon));
        self.history.insert(0, saved.clone());
        self.history.truncate(self.history_limit);

        self.persist(HISTORY_KEY, &self.history)?;
        Ok(saved)
    }

    pub fn clear_history(&mut self) -> Result<()> {
        self.history.clear();
        self.persist(HISTORY_KEY, &self.history)
    }

    /// Add an entry to favorites. Duplicates (by id for `Saved`, by
    /// coordinate for `Unsaved`) are a no-op, not a move-to-front.
    pub fn add_to_favorites(&mut self, candidate: FavoriteCandidate) -> Result<()> {
        let entry = match candidate {
            FavoriteCandidate::Saved(saved) => {
                if self.favorites.iter().any(|fav| fav.id == saved.id) {
                    return Ok(());
                }
                saved
            }
            FavoriteCandidate::Unsaved(location) => {
                if self.is_favorite(location.lat, location.lon) {
                    return Ok(());
                }
                SavedLocation::mint(location)
            }
        };

        self.favorites.insert(0, entry);
        self.persist(FAVORITES_KEY, &self.favorites)
    }

    /// Remove the favorite with the given id; absent ids are a no-op.
    pub fn remove_from_favorites(&mut self, id: &str) -> Result<()> {
        let before = self.favorites.len();
        self.favorites.retain(|fav| fav.id != id);

        if self.favorites.len() == before {
            return Ok(());
        }
        self.persist(FAVORITES_KEY, &self.favorites)
    }

    /// Exact-equality coordinate match against the favorites list.
    pub fn is_favorite(&self, lat: f64, lon: f64) -> bool {
        self.favorites.iter().any(|fav| fav.location.same_spot(lat, lon))
    }

    pub fn history(&self) -> &[SavedLocation] {
        &self.history
    }

    pub fn favorites(&self) -> &[SavedLocation] {
        &self.favorites
    }

    fn persist(&self, key: &str, list: &[SavedLocation]) -> Result<()> {
        let path = key_path(&self.dir, key);
        let json = serde_json::to_string(list)
            .with_context(|| format!("Failed to serialize {key} list"))?;

        fs::write(&path, json)
            .with_context(|| format!("Failed to write {}", path.display()))
    }
}

fn key_path(dir: &Path, key: &str) -> PathBuf {
    dir.join(format!("{key}.json"))
}

/// Read a stored list. Absence or a parse failure both mean "start empty";
/// the latter is logged since it loses user data.
fn load_list(dir: &Path, key: &str) -> Vec<SavedLocation> {
    let path = key_path(dir, key);
    if !path.exists() {
        return Vec::new();
    }

    let contents = match fs::read_to_string(&path) {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!(key, error = %e, "failed to read stored list, starting empty");
            return Vec::new();
        }
    };

    match serde_json::from_str(&contents) {
        Ok(list) => list,
        Err(e) => {
            tracing::warn!(key, error = %e, "stored list is corrupt, starting empty");
            Vec::new()
        }
    }
}
