//! Engine tuning file
//!
//! Timing and level constants for the audio engine, overridable per machine
//! because timer resolution and callback jitter differ between platforms.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Audio engine tuning values
///
/// Every field is optional; unset fields keep the engine's built-in default.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct TuningConfig {
    /// How far ahead of the clock the music scheduler queues notes
    pub schedule_ahead_ms: Option<u64>,
    /// Scheduler wake-up period
    pub tick_ms: Option<u64>,
    /// Delay between starting music and its first beat
    pub lead_in_ms: Option<u64>,
    pub master_level: Option<f32>,
    pub sfx_level: Option<f32>,
    pub music_level: Option<f32>,
    /// Time constant of the sound effect bus fade
    pub sfx_fade_ms: Option<u64>,
    /// Time constant of the music bus fade
    pub music_fade_ms: Option<u64>,
}

impl TuningConfig {
    /// Load tuning from the default location
    ///
    /// Returns default tuning if file doesn't exist or can't be read.
    pub fn load() -> Self {
        let path = Self::config_path();
        match Self::load_from(&path) {
            Ok(config) => config,
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "no tuning file, using defaults");
                Self::default()
            }
        }
    }

    /// Load tuning from a specific path
    pub fn load_from(path: &Path) -> io::Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(Self::parse(&content))
    }

    /// Get the default tuning file path
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("blockblast")
            .join("audio.conf")
    }

    /// Parse tuning from simple key=value format
    fn parse(content: &str) -> Self {
        let mut config = Self::default();

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let key = key.trim();
            let value = value.trim();

            match key {
                "schedule_ahead_ms" => config.schedule_ahead_ms = parse_value(key, value),
                "tick_ms" => config.tick_ms = parse_value(key, value),
                "lead_in_ms" => config.lead_in_ms = parse_value(key, value),
                "master_level" => config.master_level = parse_level(key, value),
                "sfx_level" => config.sfx_level = parse_level(key, value),
                "music_level" => config.music_level = parse_level(key, value),
                "sfx_fade_ms" => config.sfx_fade_ms = parse_value(key, value),
                "music_fade_ms" => config.music_fade_ms = parse_value(key, value),
                _ => tracing::debug!(key, "ignoring unknown tuning key"),
            }
        }

        config
    }
}

fn parse_value<T: std::str::FromStr>(key: &str, value: &str) -> Option<T> {
    match value.parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!(key, value, "invalid tuning value, keeping default");
            None
        }
    }
}

/// Gain levels must be finite and non-negative; `f32` parsing accepts "NaN" and "inf"
fn parse_level(key: &str, value: &str) -> Option<f32> {
    let level: f32 = parse_value(key, value)?;
    if level.is_finite() && level >= 0.0 {
        Some(level)
    } else {
        tracing::warn!(key, value, "invalid tuning value, keeping default");
        None
    }
}
