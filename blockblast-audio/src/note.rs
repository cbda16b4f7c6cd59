//! Note value objects passed from the composers to the render engine
//!
//! A `ScheduledNote` is fire-and-forget: once submitted it is owned by the
//! engine, plays at its absolute start time and is dropped when it ends.

use crate::effects::FilterType;
use std::f64::consts::TAU;
use std::sync::Arc;

/// Oscillator shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Waveform {
    #[default]
    Sine,
    Square,
    Sawtooth,
    Triangle,
}

impl Waveform {
    /// Sample the waveform at `phase` in [0, 1)
    #[inline]
    pub fn sample(self, phase: f64) -> f32 {
        let value = match self {
            Waveform::Sine => (TAU * phase).sin(),
            Waveform::Square => {
                if phase < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            Waveform::Sawtooth => 2.0 * phase - 1.0,
            Waveform::Triangle => 1.0 - 4.0 * (phase - 0.5).abs(),
        };
        value as f32
    }
}

/// Pitch over the lifetime of a note
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FrequencyPlan {
    Constant(f32),
    /// Exponential glide from `from` to `to` over `over` seconds, then holds `to`
    Sweep { from: f32, to: f32, over: f64 },
}

impl FrequencyPlan {
    /// Frequency in Hz `t` seconds after the note starts
    #[inline]
    pub fn at(&self, t: f64) -> f32 {
        match *self {
            FrequencyPlan::Constant(hz) => hz,
            FrequencyPlan::Sweep { from, to, over } => {
                if t >= over || over <= 0.0 {
                    to
                } else if t <= 0.0 {
                    from
                } else {
                    let progress = (t / over) as f32;
                    from * (to / from).powf(progress)
                }
            }
        }
    }

    /// Frequency at the start of the note
    pub fn initial(&self) -> f32 {
        self.at(0.0)
    }
}

/// Volume over time, scaled by the note's volume
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Envelope {
    /// Instant attack, exponential decay to `floor` over `decay` seconds, then hold `floor`
    Percussive { floor: f32, decay: f64 },
    /// Full volume for `hold` seconds, then exponential decay to `floor` at `decay_end`
    HoldDecay { hold: f64, floor: f32, decay_end: f64 },
    /// Linear attack, sustain, linear release reaching silence at `length`
    Pad { attack: f64, release: f64, length: f64 },
}

impl Envelope {
    /// Gain `t` seconds after the note starts
    pub fn gain_at(&self, t: f64, peak: f32) -> f32 {
        if peak <= 0.0 || t < 0.0 {
            return 0.0;
        }

        match *self {
            Envelope::Percussive { floor, decay } => exp_ramp(peak, floor, t / decay),
            Envelope::HoldDecay {
                hold,
                floor,
                decay_end,
            } => {
                if t < hold {
                    peak
                } else {
                    exp_ramp(peak, floor, (t - hold) / (decay_end - hold))
                }
            }
            Envelope::Pad {
                attack,
                release,
                length,
            } => {
                let release_start = length - release;
                if t < attack {
                    peak * (t / attack) as f32
                } else if t < release_start {
                    peak
                } else if t < length {
                    peak * ((length - t) / release) as f32
                } else {
                    0.0
                }
            }
        }
    }
}

/// Exponential interpolation from `from` to `to`; `progress` past 1 holds `to`
#[inline]
fn exp_ramp(from: f32, to: f32, progress: f64) -> f32 {
    if progress.is_nan() || progress >= 1.0 {
        return to;
    }
    from * (to / from).powf(progress.max(0.0) as f32)
}

/// Per-voice filter settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterSpec {
    pub filter_type: FilterType,
    pub cutoff: f32,
    /// Linear Q factor
    pub q: f32,
}

/// What a voice plays
#[derive(Debug, Clone, PartialEq)]
pub enum Source {
    Oscillator {
        waveform: Waveform,
        frequency: FrequencyPlan,
    },
    /// One-shot sample buffer at the device rate
    Noise(Arc<[f32]>),
}

/// Mixing point a voice is routed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bus {
    Sfx,
    Music,
}

/// A single voice request with absolute timing
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledNote {
    /// Absolute clock time in seconds
    pub start_time: f64,
    /// Seconds until the voice is stopped
    pub duration: f64,
    pub source: Source,
    /// Envelope peak
    pub volume: f32,
    pub envelope: Envelope,
    pub filter: Option<FilterSpec>,
    pub bus: Bus,
}

impl ScheduledNote {
    /// Floor the simple percussive envelope decays to
    pub const DECAY_FLOOR: f32 = 0.01;

    /// Constant-pitch oscillator with instant attack and exponential decay over its duration
    pub fn tone(
        frequency: f32,
        start_time: f64,
        duration: f64,
        waveform: Waveform,
        volume: f32,
        bus: Bus,
    ) -> Self {
        Self {
            start_time,
            duration,
            source: Source::Oscillator {
                waveform,
                frequency: FrequencyPlan::Constant(frequency),
            },
            volume,
            envelope: Envelope::Percussive {
                floor: Self::DECAY_FLOOR,
                decay: duration,
            },
            filter: None,
            bus,
        }
    }

    /// Absolute time the voice stops
    pub fn end_time(&self) -> f64 {
        self.start_time + self.duration
    }

    /// Starting pitch, if this is an oscillator voice
    pub fn frequency(&self) -> Option<f32> {
        match &self.source {
            Source::Oscillator { frequency, .. } => Some(frequency.initial()),
            Source::Noise(_) => None,
        }
    }

    pub fn waveform(&self) -> Option<Waveform> {
        match &self.source {
            Source::Oscillator { waveform, .. } => Some(*waveform),
            Source::Noise(_) => None,
        }
    }
}
