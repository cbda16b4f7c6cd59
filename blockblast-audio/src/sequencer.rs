//! Look-ahead music sequencer
//!
//! Each tick tops up a queue of absolutely timed notes so that everything
//! inside the scheduling window is already handed to the engine. Tick jitter
//! never moves a note; only the audio clock decides when it sounds.

use crate::config::SchedulerConfig;
use crate::patterns::{notes_for, Genre, NoteSpec, LOOP_LENGTH};
use crate::synth::ToneSynth;

/// Snapshot of the sequencer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SequencerState {
    pub is_playing: bool,
    pub genre: Genre,
    pub tempo_bpm: u32,
    /// Next beat to schedule, in [0, LOOP_LENGTH)
    pub beat_index: usize,
    /// Clock time of `beat_index`
    pub next_note_time: f64,
}

impl Default for SequencerState {
    fn default() -> Self {
        let genre = Genre::default();
        Self {
            is_playing: false,
            genre,
            tempo_bpm: genre.tempo_bpm(),
            beat_index: 0,
            next_note_time: 0.0,
        }
    }
}

/// Stopped/playing state machine driving the genre patterns
#[derive(Debug, Clone)]
pub struct Sequencer {
    config: SchedulerConfig,
    state: SequencerState,
    /// Clock time at which a pending delayed stop takes effect
    stop_deadline: Option<f64>,
}

impl Sequencer {
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            config,
            state: SequencerState::default(),
            stop_deadline: None,
        }
    }

    pub fn state(&self) -> SequencerState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state.is_playing
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn stop_deadline(&self) -> Option<f64> {
        self.stop_deadline
    }

    /// Start from beat 0 a short lead-in after `now`, restarting if already playing
    pub fn start(&mut self, genre: Genre, now: f64) {
        if self.state.is_playing {
            self.stop();
        }
        self.state = SequencerState {
            is_playing: true,
            genre,
            tempo_bpm: genre.tempo_bpm(),
            beat_index: 0,
            next_note_time: now + self.config.lead_in,
        };
        self.stop_deadline = None;
    }

    /// Stop scheduling; already queued notes play out
    pub fn stop(&mut self) {
        self.state = SequencerState {
            genre: self.state.genre,
            tempo_bpm: self.state.tempo_bpm,
            ..SequencerState::default()
        };
        self.stop_deadline = None;
    }

    /// Switch pattern and tempo without touching the beat cursor
    pub fn change_genre(&mut self, genre: Genre) {
        self.state.genre = genre;
        self.state.tempo_bpm = genre.tempo_bpm();
    }

    /// Stop on the first tick at or after clock time `deadline`
    pub fn stop_at(&mut self, deadline: f64) {
        if self.state.is_playing {
            self.stop_deadline = Some(deadline);
        }
    }

    /// Seconds per sixteenth note at the current tempo
    pub fn step_duration(&self) -> f64 {
        60.0 / self.state.tempo_bpm as f64 / 4.0
    }

    /// Schedule every beat that falls inside the window, passing each to `schedule`
    ///
    /// Returns the number of beats scheduled.
    pub fn tick_with<F>(&mut self, now: f64, mut schedule: F) -> usize
    where
        F: FnMut(usize, f64, &[NoteSpec]),
    {
        if !self.state.is_playing {
            return 0;
        }
        if self.stop_deadline.is_some_and(|deadline| now >= deadline) {
            tracing::debug!(now, "Delayed music stop reached");
            self.stop();
            return 0;
        }

        let horizon = now + self.config.schedule_ahead;
        let mut scheduled = 0;
        while self.state.next_note_time < horizon {
            let beat = self.state.beat_index;
            let notes = notes_for(self.state.genre, beat);
            schedule(beat, self.state.next_note_time, &notes);

            self.state.next_note_time += self.step_duration();
            self.state.beat_index = (beat + 1) % LOOP_LENGTH;
            scheduled += 1;
        }
        scheduled
    }

    /// Schedule due beats through the synthesizer
    pub fn tick(&mut self, now: f64, synth: &ToneSynth) -> usize {
        self.tick_with(now, |_, time, notes| {
            for spec in notes {
                synth.submit(spec.to_scheduled(time, synth));
            }
        })
    }
}
