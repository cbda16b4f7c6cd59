//! Audio engine for Block Blast - synthesis, sound effects, music, mixer
//!
//! Everything is generated procedurally:
//! - Synth: oscillator and noise voices with pitch sweeps and envelopes
//! - Sfx: one micro-composition per game event
//! - Patterns: four looping genres, one note set per sixteenth-note beat
//! - Sequencer/Scheduler: look-ahead queueing against the audio clock
//! - Mixer: master, sfx and music buses with smoothed gain changes
//! - Manager: the facade the game holds on to

mod clock;
mod config;
mod device;
mod effects;
mod engine;
mod manager;
mod mixer;
mod note;
mod patterns;
mod scheduler;
mod sequencer;
mod settings;
mod sfx;
mod synth;

pub use clock::{Clock, DeviceClock, ManualClock};
pub use config::{AudioConfig, MixerConfig, SchedulerConfig};
pub use device::{AudioBackend, AudioError, CpalBackend, OpenedOutput};
pub use effects::{resonance_db, Filter, FilterType};
pub use engine::{AudioCommand, EngineState};
pub use manager::AudioManager;
pub use mixer::{MixerGraph, SmoothedGain};
pub use note::{Bus, Envelope, FilterSpec, FrequencyPlan, ScheduledNote, Source, Waveform};
pub use patterns::{notes_for, Genre, Instrument, NoteSpec, ParseGenreError, Role, LOOP_LENGTH};
pub use scheduler::MusicScheduler;
pub use sequencer::{Sequencer, SequencerState};
pub use settings::{AudioSettings, SETTINGS_KEY};
pub use sfx::{compose, GameEvent};
pub use synth::ToneSynth;
