//! Persisted audio preferences
//!
//! Stored as JSON under a single key. Anything unreadable falls back to
//! defaults; saving never fails the caller.

use crate::patterns::Genre;
use blockblast_settings::KeyValueStore;
use serde::{Deserialize, Serialize};

/// Key the preferences live under
pub const SETTINGS_KEY: &str = "blockBlastAudio";

/// What the player chose to hear
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioSettings {
    pub sfx_enabled: bool,
    pub music_enabled: bool,
    pub genre: Genre,
}

// Lenient shape of the stored record: missing or null fields take their default
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredSettings {
    #[serde(default)]
    sfx_enabled: Option<bool>,
    #[serde(default)]
    music_enabled: Option<bool>,
    #[serde(default)]
    genre: Option<String>,
}

impl AudioSettings {
    /// Read settings from `store`, falling back to defaults
    pub fn load(store: &dyn KeyValueStore) -> Self {
        match store.get(SETTINGS_KEY) {
            Ok(Some(json)) => Self::parse(&json).unwrap_or_else(|| {
                tracing::warn!("Stored audio settings are malformed, using defaults");
                Self::default()
            }),
            Ok(None) => Self::default(),
            Err(e) => {
                tracing::warn!("Failed to read audio settings: {}", e);
                Self::default()
            }
        }
    }

    /// Decode a stored record; `None` if it isn't a settings object
    pub fn parse(json: &str) -> Option<Self> {
        let stored: StoredSettings = serde_json::from_str(json).ok()?;
        let genre = match stored.genre.as_deref() {
            Some(name) => name.parse().unwrap_or_else(|_| {
                tracing::warn!(genre = name, "Unknown stored genre, using default");
                Genre::default()
            }),
            None => Genre::default(),
        };

        Some(Self {
            sfx_enabled: stored.sfx_enabled.unwrap_or(false),
            music_enabled: stored.music_enabled.unwrap_or(false),
            genre,
        })
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Write settings to `store`; failures are logged
    pub fn save(&self, store: &mut dyn KeyValueStore) {
        let json = match self.to_json() {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!("Failed to encode audio settings: {}", e);
                return;
            }
        };
        if let Err(e) = store.set(SETTINGS_KEY, &json) {
            tracing::warn!("Failed to save audio settings: {}", e);
        }
    }
}
