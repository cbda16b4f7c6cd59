//! Genre pattern bank
//!
//! Each genre is a fixed composition over a 64-step loop of sixteenth notes.
//! `notes_for` is pure: the same genre and beat always give the same notes.

use crate::effects::{resonance_db, FilterType};
use crate::note::{Bus, Envelope, FilterSpec, FrequencyPlan, ScheduledNote, Source, Waveform};
use crate::synth::ToneSynth;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Beats in one loop (4 bars of 16 steps)
pub const LOOP_LENGTH: usize = 64;

/// Music style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Genre {
    #[default]
    Chiptune,
    Ambient,
    Techno,
    Lofi,
}

impl Genre {
    pub const ALL: [Genre; 4] = [Genre::Chiptune, Genre::Ambient, Genre::Techno, Genre::Lofi];

    pub fn tempo_bpm(self) -> u32 {
        match self {
            Genre::Chiptune => 140,
            Genre::Ambient => 60,
            Genre::Techno => 128,
            Genre::Lofi => 85,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Genre::Chiptune => "chiptune",
            Genre::Ambient => "ambient",
            Genre::Techno => "techno",
            Genre::Lofi => "lofi",
        }
    }
}

impl fmt::Display for Genre {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown genre: {0}")]
pub struct ParseGenreError(pub String);

impl FromStr for Genre {
    type Err = ParseGenreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Genre::ALL
            .into_iter()
            .find(|g| g.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseGenreError(s.to_string()))
    }
}

/// Musical function of a note within a pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Bass,
    Melody,
    Chord,
    Pad,
    Flourish,
    Kick,
    Hat,
}

/// Sound a pattern note is rendered with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instrument {
    Square,
    Triangle,
    /// Sawtooth through a resonant low-pass
    Saw,
    /// Slow sine swell
    Pad,
    /// Sine pitch drop
    Kick,
    /// High-passed noise
    HiHat,
}

/// One note of a pattern, relative to its beat
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoteSpec {
    pub role: Role,
    pub instrument: Instrument,
    /// Hz; unused by the hi-hat
    pub frequency: f32,
    /// Seconds after the beat
    pub offset: f64,
    pub duration: f64,
    pub volume: f32,
}

impl NoteSpec {
    fn new(role: Role, instrument: Instrument, frequency: f32, duration: f64, volume: f32) -> Self {
        Self {
            role,
            instrument,
            frequency,
            offset: 0.0,
            duration,
            volume,
        }
    }

    fn at_offset(mut self, offset: f64) -> Self {
        self.offset = offset;
        self
    }

    /// Build the music-bus voice for a beat scheduled at `beat_time`
    pub fn to_scheduled(&self, beat_time: f64, synth: &ToneSynth) -> ScheduledNote {
        let start = beat_time + self.offset;
        match self.instrument {
            Instrument::Square => ScheduledNote::tone(
                self.frequency,
                start,
                self.duration,
                Waveform::Square,
                self.volume,
                Bus::Music,
            ),
            Instrument::Triangle => ScheduledNote::tone(
                self.frequency,
                start,
                self.duration,
                Waveform::Triangle,
                self.volume,
                Bus::Music,
            ),
            Instrument::Saw => {
                let mut note = ScheduledNote::tone(
                    self.frequency,
                    start,
                    self.duration,
                    Waveform::Sawtooth,
                    self.volume,
                    Bus::Music,
                );
                note.filter = Some(FilterSpec {
                    filter_type: FilterType::LowPass,
                    cutoff: SAW_CUTOFF,
                    q: resonance_db(SAW_RESONANCE_DB),
                });
                note
            }
            Instrument::Pad => ScheduledNote {
                start_time: start,
                duration: self.duration + PAD_TAIL,
                source: Source::Oscillator {
                    waveform: Waveform::Sine,
                    frequency: FrequencyPlan::Constant(self.frequency),
                },
                volume: self.volume,
                envelope: Envelope::Pad {
                    attack: PAD_SWELL,
                    release: PAD_SWELL,
                    length: self.duration,
                },
                filter: None,
                bus: Bus::Music,
            },
            Instrument::Kick => ScheduledNote {
                start_time: start,
                duration: self.duration,
                source: Source::Oscillator {
                    waveform: Waveform::Sine,
                    frequency: FrequencyPlan::Sweep {
                        from: self.frequency,
                        to: KICK_END_HZ,
                        over: KICK_SWEEP,
                    },
                },
                volume: self.volume,
                envelope: Envelope::Percussive {
                    floor: ScheduledNote::DECAY_FLOOR,
                    decay: self.duration,
                },
                filter: None,
                bus: Bus::Music,
            },
            Instrument::HiHat => {
                synth.noise_note(start, self.duration, HAT_CUTOFF, self.volume, Bus::Music)
            }
        }
    }
}

const SAW_CUTOFF: f32 = 800.0;
const SAW_RESONANCE_DB: f32 = 5.0;
/// Linear attack and release of the pad
const PAD_SWELL: f64 = 0.5;
/// Pads keep running briefly after their envelope closes
const PAD_TAIL: f64 = 0.1;
const KICK_START_HZ: f32 = 150.0;
const KICK_END_HZ: f32 = 50.0;
const KICK_SWEEP: f64 = 0.1;
const HAT_CUTOFF: f32 = 7000.0;

const CHIPTUNE_BASS: [f32; 8] = [65.41, 65.41, 87.31, 87.31, 73.42, 73.42, 82.41, 82.41];
const CHIPTUNE_MELODY: [f32; 8] = [523.25, 587.33, 659.25, 783.99, 659.25, 587.33, 523.25, 493.88];
const CHIPTUNE_FLOURISH: [f32; 3] = [523.25, 659.25, 783.99];

// C, D, E, F major
const AMBIENT_CHORDS: [[f32; 3]; 4] = [
    [261.63, 329.63, 392.0],
    [293.66, 369.99, 440.0],
    [329.63, 415.30, 493.88],
    [349.23, 440.0, 523.25],
];
const AMBIENT_DETUNE: f32 = 1.002;

const TECHNO_BASS: [f32; 8] = [55.0, 55.0, 55.0, 55.0, 73.42, 73.42, 82.41, 82.41];

// Dm7, G7, Cmaj7, Am7
const LOFI_CHORDS: [[f32; 4]; 4] = [
    [293.66, 349.23, 440.0, 523.25],
    [392.0, 493.88, 587.33, 698.46],
    [261.63, 329.63, 392.0, 493.88],
    [440.0, 523.25, 659.25, 783.99],
];
const LOFI_BASS: [f32; 4] = [65.41, 73.42, 82.41, 87.31];

/// Notes to play on `beat` (taken modulo the loop length)
pub fn notes_for(genre: Genre, beat: usize) -> Vec<NoteSpec> {
    let beat = beat % LOOP_LENGTH;
    let mut notes = Vec::new();
    match genre {
        Genre::Chiptune => chiptune(beat, &mut notes),
        Genre::Ambient => ambient(beat, &mut notes),
        Genre::Techno => techno(beat, &mut notes),
        Genre::Lofi => lofi(beat, &mut notes),
    }
    notes
}

fn chiptune(beat: usize, notes: &mut Vec<NoteSpec>) {
    if beat % 4 == 0 {
        let hz = CHIPTUNE_BASS[(beat / 8) % CHIPTUNE_BASS.len()];
        notes.push(NoteSpec::new(Role::Bass, Instrument::Square, hz, 0.15, 0.25));
    }

    if matches!(beat % 8, 0 | 3 | 6) {
        let hz = CHIPTUNE_MELODY[(beat / 2) % CHIPTUNE_MELODY.len()];
        notes.push(NoteSpec::new(Role::Melody, Instrument::Triangle, hz, 0.1, 0.15));
    }

    if beat % 16 == 0 {
        for (i, &hz) in CHIPTUNE_FLOURISH.iter().enumerate() {
            notes.push(
                NoteSpec::new(Role::Flourish, Instrument::Square, hz, 0.05, 0.1)
                    .at_offset(i as f64 * 0.05),
            );
        }
    }
}

fn ambient(beat: usize, notes: &mut Vec<NoteSpec>) {
    if beat % 16 != 0 {
        return;
    }
    for &hz in &AMBIENT_CHORDS[(beat / 16) % AMBIENT_CHORDS.len()] {
        notes.push(NoteSpec::new(Role::Pad, Instrument::Pad, hz, 2.0, 0.08));
        notes.push(NoteSpec::new(
            Role::Pad,
            Instrument::Pad,
            hz * AMBIENT_DETUNE,
            2.0,
            0.06,
        ));
    }
}

fn techno(beat: usize, notes: &mut Vec<NoteSpec>) {
    if beat % 4 == 0 {
        notes.push(NoteSpec::new(
            Role::Kick,
            Instrument::Kick,
            KICK_START_HZ,
            0.15,
            0.4,
        ));
    }

    if beat % 2 == 0 {
        // Off-beat hats accented
        let volume = if beat % 4 == 2 { 0.08 } else { 0.04 };
        notes.push(NoteSpec::new(Role::Hat, Instrument::HiHat, 0.0, 0.05, volume));

        let hz = TECHNO_BASS[(beat / 2) % TECHNO_BASS.len()];
        notes.push(NoteSpec::new(Role::Bass, Instrument::Saw, hz, 0.1, 0.2));
    }
}

fn lofi(beat: usize, notes: &mut Vec<NoteSpec>) {
    if matches!(beat % 16, 0 | 6 | 10) {
        for &hz in &LOFI_CHORDS[(beat / 16) % LOFI_CHORDS.len()] {
            notes.push(NoteSpec::new(Role::Chord, Instrument::Triangle, hz, 0.4, 0.06));
        }
    }

    if beat % 4 == 0 {
        let hz = LOFI_BASS[(beat / 4) % LOFI_BASS.len()];
        notes.push(NoteSpec::new(Role::Bass, Instrument::Triangle, hz, 0.25, 0.15));
    }
}
