//! Engine configuration
//!
//! Built-in defaults match the game's tuning; a `TuningConfig` file can
//! override any of them.

use blockblast_settings::TuningConfig;
use std::time::Duration;

/// Look-ahead scheduler timing
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SchedulerConfig {
    /// Seconds ahead of the clock that notes are queued
    pub schedule_ahead: f64,
    /// Real-time period between scheduler ticks
    pub tick_interval: Duration,
    /// Seconds between `start` and the first beat
    pub lead_in: f64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            schedule_ahead: 0.1,
            tick_interval: Duration::from_millis(25),
            lead_in: 0.1,
        }
    }
}

/// Nominal levels and fade time constants
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MixerConfig {
    pub master_level: f32,
    /// Sound effect bus level when enabled
    pub sfx_level: f32,
    /// Music bus level when enabled
    pub music_level: f32,
    /// Seconds
    pub sfx_fade: f64,
    /// Seconds; also the delay before the scheduler stops when music is disabled
    pub music_fade: f64,
}

impl Default for MixerConfig {
    fn default() -> Self {
        Self {
            master_level: 0.7,
            sfx_level: 0.5,
            music_level: 0.3,
            sfx_fade: 0.1,
            music_fade: 0.3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AudioConfig {
    pub scheduler: SchedulerConfig,
    pub mixer: MixerConfig,
}

impl AudioConfig {
    /// Defaults with any values set in `tuning` applied on top
    pub fn from_tuning(tuning: &TuningConfig) -> Self {
        let mut config = Self::default();
        let secs = |ms: u64| ms as f64 / 1000.0;

        if let Some(ms) = tuning.schedule_ahead_ms {
            config.scheduler.schedule_ahead = secs(ms);
        }
        if let Some(ms) = tuning.tick_ms {
            config.scheduler.tick_interval = Duration::from_millis(ms.max(1));
        }
        if let Some(ms) = tuning.lead_in_ms {
            config.scheduler.lead_in = secs(ms);
        }
        if let Some(level) = finite_level("master_level", tuning.master_level) {
            config.mixer.master_level = level;
        }
        if let Some(level) = finite_level("sfx_level", tuning.sfx_level) {
            config.mixer.sfx_level = level;
        }
        if let Some(level) = finite_level("music_level", tuning.music_level) {
            config.mixer.music_level = level;
        }
        if let Some(ms) = tuning.sfx_fade_ms {
            config.mixer.sfx_fade = secs(ms);
        }
        if let Some(ms) = tuning.music_fade_ms {
            config.mixer.music_fade = secs(ms);
        }
        config
    }
}

fn finite_level(key: &str, level: Option<f32>) -> Option<f32> {
    let level = level?;
    if level.is_finite() && level >= 0.0 {
        Some(level)
    } else {
        tracing::warn!(key, level, "invalid tuning value, keeping default");
        None
    }
}
