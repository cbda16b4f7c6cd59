//! Tone synthesizer - turns note requests into engine commands
//!
//! Every call is independent and fire-and-forget. When the engine queue is
//! full or the output has gone away the request is dropped.

use crate::effects::{resonance_db, FilterType};
use crate::engine::AudioCommand;
use crate::note::{Bus, Envelope, FilterSpec, FrequencyPlan, ScheduledNote, Source, Waveform};
use crossbeam_channel::{Sender, TrySendError};
use rand::Rng;
use std::ops::Range;
use std::sync::Arc;

/// Handle for emitting voices into the render engine
#[derive(Clone)]
pub struct ToneSynth {
    commands: Sender<AudioCommand>,
    sample_rate: u32,
}

impl ToneSynth {
    pub fn new(commands: Sender<AudioCommand>, sample_rate: u32) -> Self {
        Self {
            commands,
            sample_rate,
        }
    }

    /// Rate of the device the engine renders at
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Emit an oscillator voice sounding over `time`, in absolute clock seconds
    pub fn emit(
        &self,
        waveform: Waveform,
        frequency: FrequencyPlan,
        envelope: Envelope,
        volume: f32,
        time: Range<f64>,
        bus: Bus,
    ) -> bool {
        self.submit(ScheduledNote {
            start_time: time.start,
            duration: time.end - time.start,
            source: Source::Oscillator {
                waveform,
                frequency,
            },
            volume,
            envelope,
            filter: None,
            bus,
        })
    }

    /// Hand a prepared note to the engine; returns false if it was dropped
    pub fn submit(&self, note: ScheduledNote) -> bool {
        match self.commands.try_send(AudioCommand::Play(note)) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                tracing::debug!("Engine queue full, dropping note");
                false
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }

    /// One-shot buffer of uniform noise in [-1, 1), sized for the device rate
    pub fn noise_buffer(&self, duration: f64) -> Arc<[f32]> {
        let len = (duration.max(0.0) * self.sample_rate as f64).round() as usize;
        let mut rng = rand::thread_rng();
        (0..len).map(|_| rng.gen_range(-1.0f32..1.0)).collect()
    }

    /// High-passed noise burst with a fast exponential decay
    pub fn noise_note(
        &self,
        start_time: f64,
        duration: f64,
        cutoff: f32,
        volume: f32,
        bus: Bus,
    ) -> ScheduledNote {
        ScheduledNote {
            start_time,
            duration,
            source: Source::Noise(self.noise_buffer(duration)),
            volume,
            envelope: Envelope::Percussive {
                floor: 0.001,
                decay: duration,
            },
            filter: Some(FilterSpec {
                filter_type: FilterType::HighPass,
                cutoff,
                q: resonance_db(1.0),
            }),
            bus,
        }
    }

    /// Emit a noise burst (hi-hat)
    pub fn noise_burst(
        &self,
        start_time: f64,
        duration: f64,
        cutoff: f32,
        volume: f32,
        bus: Bus,
    ) -> bool {
        self.submit(self.noise_note(start_time, duration, cutoff, volume, bus))
    }
}
