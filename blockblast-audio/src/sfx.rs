//! Sound effect library
//!
//! Every game event maps to a fixed micro-composition. `compose` is pure and
//! returns the notes with absolute times; `play` hands them to the synth.

use crate::note::{Bus, Envelope, FrequencyPlan, ScheduledNote, Source, Waveform};
use crate::synth::ToneSynth;

/// Discrete game events that make a sound
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameEvent {
    Move,
    Rotate,
    HardDrop,
    Lock,
    /// Rows cleared at once
    LineClear(u32),
    LevelUp,
    GameOver,
    GameStart,
}

impl GameEvent {
    /// Look up an event by its game-side name; `count` is only read by `lineClear`
    pub fn from_name(name: &str, count: Option<u32>) -> Option<Self> {
        let event = match name {
            "move" => GameEvent::Move,
            "rotate" => GameEvent::Rotate,
            "hardDrop" => GameEvent::HardDrop,
            "lock" => GameEvent::Lock,
            "lineClear" => GameEvent::LineClear(count.unwrap_or(1)),
            "levelUp" => GameEvent::LevelUp,
            "gameOver" => GameEvent::GameOver,
            "gameStart" => GameEvent::GameStart,
            _ => return None,
        };
        Some(event)
    }

    pub fn name(self) -> &'static str {
        match self {
            GameEvent::Move => "move",
            GameEvent::Rotate => "rotate",
            GameEvent::HardDrop => "hardDrop",
            GameEvent::Lock => "lock",
            GameEvent::LineClear(_) => "lineClear",
            GameEvent::LevelUp => "levelUp",
            GameEvent::GameOver => "gameOver",
            GameEvent::GameStart => "gameStart",
        }
    }
}

// C5 E5 G5
const CLEAR_ARPEGGIO: [f32; 3] = [523.25, 659.25, 783.99];
const CLEAR_TRIPLE: [[f32; 3]; 2] = [[523.25, 659.25, 783.99], [587.33, 739.99, 880.0]];
const CLEAR_FANFARE: [[f32; 4]; 3] = [
    [523.25, 659.25, 783.99, 1046.5],
    [587.33, 739.99, 880.0, 1174.66],
    [659.25, 783.99, 987.77, 1318.51],
];
// C5 up to A5
const LEVEL_UP_SCALE: [f32; 5] = [523.25, 587.33, 659.25, 783.99, 880.0];
// C minor
const GAME_OVER_CHORD: [f32; 3] = [261.63, 311.13, 392.0];
const GAME_START_NOTES: [f32; 4] = [261.63, 329.63, 392.0, 523.25];

fn note(freq: f32, start: f64, duration: f64, waveform: Waveform, volume: f32) -> ScheduledNote {
    ScheduledNote::tone(freq, start, duration, waveform, volume, Bus::Sfx)
}

/// Notes sharing one volume between them
fn chord(
    out: &mut Vec<ScheduledNote>,
    freqs: &[f32],
    start: f64,
    duration: f64,
    waveform: Waveform,
    volume: f32,
) {
    let share = volume / freqs.len() as f32;
    out.extend(
        freqs
            .iter()
            .map(|&hz| note(hz, start, duration, waveform, share)),
    );
}

/// Build the notes for `event` starting at clock time `at`
pub fn compose(event: GameEvent, at: f64) -> Vec<ScheduledNote> {
    let mut notes = Vec::new();

    match event {
        GameEvent::Move => notes.push(note(400.0, at, 0.05, Waveform::Sine, 0.3)),

        GameEvent::Rotate => {
            notes.push(note(300.0, at, 0.06, Waveform::Triangle, 0.4));
            notes.push(note(600.0, at, 0.06, Waveform::Sine, 0.4));
        }

        GameEvent::HardDrop => {
            // Descending sweep, then an impact thud
            notes.push(ScheduledNote {
                start_time: at,
                duration: 0.15,
                source: Source::Oscillator {
                    waveform: Waveform::Square,
                    frequency: FrequencyPlan::Sweep {
                        from: 800.0,
                        to: 200.0,
                        over: 0.15,
                    },
                },
                volume: 0.3,
                envelope: Envelope::Percussive {
                    floor: ScheduledNote::DECAY_FLOOR,
                    decay: 0.15,
                },
                filter: None,
                bus: Bus::Sfx,
            });
            notes.push(note(100.0, at + 0.12, 0.13, Waveform::Sine, 0.5));
        }

        GameEvent::Lock => {
            let envelope = Envelope::HoldDecay {
                hold: 0.04,
                floor: ScheduledNote::DECAY_FLOOR,
                decay_end: 0.12,
            };
            for (hz, waveform) in [(150.0, Waveform::Sawtooth), (300.0, Waveform::Triangle)] {
                let mut thunk = note(hz, at, 0.12, waveform, 0.3);
                thunk.envelope = envelope;
                notes.push(thunk);
            }
        }

        GameEvent::LineClear(count) => match count.max(1) {
            1 => {
                for (i, &hz) in CLEAR_ARPEGGIO.iter().enumerate() {
                    notes.push(note(hz, at + i as f64 * 0.08, 0.08, Waveform::Sine, 0.4));
                }
            }
            2 => {
                // Faster, doubled an octave up
                for (i, &hz) in CLEAR_ARPEGGIO.iter().enumerate() {
                    let start = at + i as f64 * 0.05;
                    notes.push(note(hz, start, 0.06, Waveform::Sine, 0.4));
                    notes.push(note(hz * 2.0, start, 0.06, Waveform::Sine, 0.2));
                }
            }
            3 => {
                for (i, freqs) in CLEAR_TRIPLE.iter().enumerate() {
                    let start = at + i as f64 * 0.15;
                    chord(&mut notes, freqs, start, 0.15, Waveform::Square, 0.3);
                }
            }
            _ => {
                let timing = [(0.0, 0.2, 0.25), (0.2, 0.2, 0.25), (0.4, 0.3, 0.3)];
                for (freqs, (offset, duration, volume)) in CLEAR_FANFARE.iter().zip(timing) {
                    chord(
                        &mut notes,
                        freqs,
                        at + offset,
                        duration,
                        Waveform::Sawtooth,
                        volume,
                    );
                }
            }
        },

        GameEvent::LevelUp => {
            for (i, &hz) in LEVEL_UP_SCALE.iter().enumerate() {
                notes.push(note(hz, at + i as f64 * 0.1, 0.15, Waveform::Triangle, 0.4));
            }
        }

        GameEvent::GameOver => {
            // Each voice slides down an octave; upper voices ring longer
            for (i, &hz) in GAME_OVER_CHORD.iter().enumerate() {
                notes.push(ScheduledNote {
                    start_time: at,
                    duration: 0.8,
                    source: Source::Oscillator {
                        waveform: Waveform::Sine,
                        frequency: FrequencyPlan::Sweep {
                            from: hz,
                            to: hz * 0.5,
                            over: 0.8,
                        },
                    },
                    volume: 0.4,
                    envelope: Envelope::Percussive {
                        floor: ScheduledNote::DECAY_FLOOR,
                        decay: 0.6 + i as f64 * 0.1,
                    },
                    filter: None,
                    bus: Bus::Sfx,
                });
            }
        }

        GameEvent::GameStart => {
            for (i, &hz) in GAME_START_NOTES.iter().enumerate() {
                notes.push(note(hz, at + i as f64 * 0.06, 0.1, Waveform::Triangle, 0.35));
            }
        }
    }

    notes
}

/// Play `event` now; returns the number of notes handed to the engine
pub fn play(synth: &ToneSynth, event: GameEvent, now: f64) -> usize {
    compose(event, now)
        .into_iter()
        .map(|note| synth.submit(note))
        .filter(|sent| *sent)
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roots_at(notes: &[ScheduledNote], time: f64) -> Vec<f32> {
        notes
            .iter()
            .filter(|n| (n.start_time - time).abs() < 1e-9)
            .filter_map(|n| n.frequency())
            .collect()
    }

    #[test]
    fn test_line_clear_escalation() {
        assert_eq!(compose(GameEvent::LineClear(1), 0.0).len(), 3);
        assert_eq!(compose(GameEvent::LineClear(2), 0.0).len(), 6);
        assert_eq!(compose(GameEvent::LineClear(3), 0.0).len(), 6);
        assert_eq!(compose(GameEvent::LineClear(4), 0.0).len(), 12);
        assert_eq!(compose(GameEvent::LineClear(7), 0.0).len(), 12);
        assert_eq!(compose(GameEvent::LineClear(0), 0.0).len(), 3);
    }

    #[test]
    fn test_tetris_fanfare_timing() {
        let t = 10.0;
        let notes = compose(GameEvent::LineClear(4), t);

        assert_eq!(roots_at(&notes, t), vec![523.25, 659.25, 783.99, 1046.5]);
        assert_eq!(roots_at(&notes, t + 0.2), vec![587.33, 739.99, 880.0, 1174.66]);
        assert_eq!(roots_at(&notes, t + 0.4), vec![659.25, 783.99, 987.77, 1318.51]);

        assert!(notes.iter().all(|n| n.waveform() == Some(Waveform::Sawtooth)));
        // Volume split across the chord
        assert!((notes[0].volume - 0.0625).abs() < 1e-6);
        assert!((notes[11].volume - 0.075).abs() < 1e-6);
        assert!((notes[11].duration - 0.3).abs() < 1e-9);
    }

    #[test]
    fn test_single_clear_arpeggio() {
        let notes = compose(GameEvent::LineClear(1), 1.0);
        let starts: Vec<f64> = notes.iter().map(|n| n.start_time).collect();
        assert!((starts[1] - 1.08).abs() < 1e-9);
        assert!((starts[2] - 1.16).abs() < 1e-9);
        assert_eq!(notes[2].frequency(), Some(783.99));
    }

    #[test]
    fn test_double_clear_octaves() {
        let notes = compose(GameEvent::LineClear(2), 0.0);
        assert_eq!(notes[1].frequency(), Some(1046.5));
        assert_eq!(notes[1].volume, 0.2);
        assert!((notes[2].start_time - 0.05).abs() < 1e-9);
    }

    #[test]
    fn test_hard_drop_thud_follows_sweep() {
        let notes = compose(GameEvent::HardDrop, 2.0);
        assert_eq!(notes.len(), 2);
        assert_eq!(notes[0].frequency(), Some(800.0));
        assert!((notes[1].start_time - 2.12).abs() < 1e-9);
        assert!((notes[1].end_time() - 2.25).abs() < 1e-9);
    }

    #[test]
    fn test_lock_holds_before_decay() {
        let notes = compose(GameEvent::Lock, 0.0);
        assert_eq!(notes.len(), 2);
        for n in &notes {
            assert_eq!(n.envelope.gain_at(0.03, n.volume), 0.3);
        }
    }

    #[test]
    fn test_game_over_slides_down() {
        let notes = compose(GameEvent::GameOver, 0.0);
        assert_eq!(notes.len(), 3);
        for n in &notes {
            let Source::Oscillator { frequency, .. } = &n.source else {
                panic!("Expected oscillator");
            };
            assert!((frequency.at(0.8) - frequency.initial() * 0.5).abs() < 1e-3);
        }
        assert_eq!(
            notes[2].envelope,
            Envelope::Percussive {
                floor: 0.01,
                decay: 0.8
            }
        );
    }

    #[test]
    fn test_every_effect_on_sfx_bus() {
        let events = [
            GameEvent::Move,
            GameEvent::Rotate,
            GameEvent::HardDrop,
            GameEvent::Lock,
            GameEvent::LineClear(3),
            GameEvent::LevelUp,
            GameEvent::GameOver,
            GameEvent::GameStart,
        ];
        for event in events {
            let notes = compose(event, 0.0);
            assert!(!notes.is_empty(), "{event:?} is silent");
            assert!(notes.iter().all(|n| n.bus == Bus::Sfx));
            assert!(notes.iter().all(|n| n.start_time >= 0.0));
        }
    }

    #[test]
    fn test_event_names() {
        assert_eq!(GameEvent::from_name("lineClear", Some(4)), Some(GameEvent::LineClear(4)));
        assert_eq!(GameEvent::from_name("lineClear", None), Some(GameEvent::LineClear(1)));
        assert_eq!(GameEvent::from_name("hardDrop", None), Some(GameEvent::HardDrop));
        assert_eq!(GameEvent::from_name("explode", None), None);
        assert_eq!(GameEvent::LevelUp.name(), "levelUp");
    }

    #[test]
    fn test_play_submits_all_notes() {
        let (tx, rx) = crossbeam_channel::bounded(64);
        let synth = ToneSynth::new(tx, 48000);
        assert_eq!(play(&synth, GameEvent::LevelUp, 0.5), 5);
        assert_eq!(rx.len(), 5);
    }
}
