//! Audio engine - renders scheduled voices through the mixer
//!
//! `EngineState` lives inside the output callback. It drains commands at the
//! start of every block, renders each voice at its absolute start frame and
//! publishes the number of rendered frames as the audio clock.

use crate::effects::Filter;
use crate::mixer::MixerGraph;
use crate::note::{Bus, ScheduledNote, Source};
use crossbeam_channel::Receiver;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Commands sent to the audio engine
#[derive(Debug, Clone)]
pub enum AudioCommand {
    /// Queue a voice for playback at its start time
    Play(ScheduledNote),
    /// Glide a bus toward `level` with the given time constant in seconds
    SetBusLevel {
        bus: Bus,
        level: f32,
        time_constant: f64,
    },
    SetMasterLevel(f32),
}

/// Voices reserved up front so typical bursts don't allocate in the callback
const INITIAL_VOICE_CAPACITY: usize = 256;

/// One sounding (or about to sound) note
struct Voice {
    note: ScheduledNote,
    start_frame: u64,
    end_frame: u64,
    /// Oscillator phase in [0, 1)
    phase: f64,
    filter: Option<Filter>,
}

impl Voice {
    fn new(note: ScheduledNote, sample_rate: u32) -> Self {
        let sr = sample_rate as f64;
        let start_frame = (note.start_time.max(0.0) * sr).round() as u64;
        let end_frame = match &note.source {
            Source::Noise(buffer) => start_frame + buffer.len() as u64,
            Source::Oscillator { .. } => (note.end_time().max(0.0) * sr).round() as u64,
        };
        let filter = note
            .filter
            .as_ref()
            .map(|spec| Filter::from_spec(spec, sample_rate as f32));

        Self {
            note,
            start_frame,
            end_frame,
            phase: 0.0,
            filter,
        }
    }

    /// Render the voice at an absolute frame; silent outside its lifetime
    #[inline]
    fn render(&mut self, frame: u64, sample_rate: f64) -> f32 {
        if frame < self.start_frame || frame >= self.end_frame {
            return 0.0;
        }
        let offset = frame - self.start_frame;
        let elapsed = offset as f64 / sample_rate;

        let raw = match &self.note.source {
            Source::Oscillator {
                waveform,
                frequency,
            } => {
                let sample = waveform.sample(self.phase);
                self.phase = (self.phase + frequency.at(elapsed) as f64 / sample_rate).fract();
                sample
            }
            Source::Noise(buffer) => buffer.get(offset as usize).copied().unwrap_or(0.0),
        };

        let filtered = match self.filter.as_mut() {
            Some(filter) => filter.process_sample(raw),
            None => raw,
        };

        filtered * self.note.envelope.gain_at(elapsed, self.note.volume)
    }
}

/// Audio engine state (held in the output callback)
pub struct EngineState {
    sample_rate: u32,
    /// Absolute index of the next frame to render
    frame: u64,
    voices: Vec<Voice>,
    mixer: MixerGraph,
    /// Shared with `DeviceClock`
    frames_out: Arc<AtomicU64>,
}

impl EngineState {
    pub fn new(sample_rate: u32, frames_out: Arc<AtomicU64>) -> Self {
        let frame = frames_out.load(Ordering::Acquire);
        Self {
            sample_rate,
            frame,
            voices: Vec::with_capacity(INITIAL_VOICE_CAPACITY),
            mixer: MixerGraph::new(sample_rate),
            frames_out,
        }
    }

    /// Process a command
    pub fn handle_command(&mut self, cmd: AudioCommand) {
        match cmd {
            AudioCommand::Play(note) => self.voices.push(Voice::new(note, self.sample_rate)),
            AudioCommand::SetBusLevel {
                bus,
                level,
                time_constant,
            } => self.mixer.set_bus_level(bus, level, time_constant),
            AudioCommand::SetMasterLevel(level) => self.mixer.set_master_level(level),
        }
    }

    /// Apply every queued command without blocking
    pub fn drain(&mut self, commands: &Receiver<AudioCommand>) {
        while let Ok(cmd) = commands.try_recv() {
            self.handle_command(cmd);
        }
    }

    /// Render interleaved output with `channels` channels; every channel gets the same signal
    pub fn process(&mut self, output: &mut [f32], channels: usize) {
        let channels = channels.max(1);
        let sample_rate = self.sample_rate as f64;

        for frame in output.chunks_mut(channels) {
            let mut sfx = 0.0f32;
            let mut music = 0.0f32;
            for voice in &mut self.voices {
                let sample = voice.render(self.frame, sample_rate);
                match voice.note.bus {
                    Bus::Sfx => sfx += sample,
                    Bus::Music => music += sample,
                }
            }

            frame.fill(self.mixer.mix(sfx, music));
            self.frame += 1;
        }

        let now = self.frame;
        self.voices.retain(|voice| voice.end_frame > now);
        self.frames_out.store(now, Ordering::Release);
    }

    /// Seconds rendered so far
    pub fn current_time(&self) -> f64 {
        self.frame as f64 / self.sample_rate as f64
    }

    /// Voices queued or sounding
    pub fn active_voices(&self) -> usize {
        self.voices.len()
    }

    pub fn mixer(&self) -> &MixerGraph {
        &self.mixer
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::note::Waveform;

    const SR: u32 = 48000;

    fn engine() -> (EngineState, Arc<AtomicU64>) {
        let frames = Arc::new(AtomicU64::new(0));
        let mut engine = EngineState::new(SR, frames.clone());
        engine.handle_command(AudioCommand::SetMasterLevel(1.0));
        engine.handle_command(AudioCommand::SetBusLevel {
            bus: Bus::Sfx,
            level: 1.0,
            time_constant: 0.0,
        });
        engine.handle_command(AudioCommand::SetBusLevel {
            bus: Bus::Music,
            level: 1.0,
            time_constant: 0.0,
        });
        (engine, frames)
    }

    fn peak(buffer: &[f32]) -> f32 {
        buffer.iter().fold(0.0f32, |m, s| m.max(s.abs()))
    }

    #[test]
    fn test_silent_without_voices() {
        let (mut engine, _) = engine();
        let mut out = vec![1.0f32; 512];
        engine.process(&mut out, 2);
        assert_eq!(peak(&out), 0.0);
    }

    #[test]
    fn test_note_sounds_and_expires() {
        let (mut engine, _) = engine();
        let note = ScheduledNote::tone(440.0, 0.0, 0.05, Waveform::Sine, 0.3, Bus::Sfx);
        engine.handle_command(AudioCommand::Play(note));

        let mut out = vec![0.0f32; 1200];
        engine.process(&mut out, 1);
        assert!(peak(&out) > 0.1);
        assert_eq!(engine.active_voices(), 1);

        // 0.05 s = 2400 frames; render past the end
        let mut out = vec![0.0f32; 2400];
        engine.process(&mut out, 1);
        assert_eq!(engine.active_voices(), 0);
    }

    #[test]
    fn test_future_note_waits_for_start() {
        let (mut engine, _) = engine();
        let note = ScheduledNote::tone(440.0, 0.5, 0.1, Waveform::Square, 0.3, Bus::Music);
        engine.handle_command(AudioCommand::Play(note));

        let mut out = vec![0.0f32; 4800];
        engine.process(&mut out, 1);
        assert_eq!(peak(&out), 0.0);
        assert_eq!(engine.active_voices(), 1);

        let mut out = vec![0.0f32; 24000];
        engine.process(&mut out, 1);
        assert!(peak(&out) > 0.1);
    }

    #[test]
    fn test_muted_bus_is_silent() {
        let (mut engine, _) = engine();
        engine.handle_command(AudioCommand::SetBusLevel {
            bus: Bus::Sfx,
            level: 0.0,
            time_constant: 0.0,
        });
        let note = ScheduledNote::tone(300.0, 0.0, 0.1, Waveform::Triangle, 0.4, Bus::Sfx);
        engine.handle_command(AudioCommand::Play(note));

        let mut out = vec![0.0f32; 2048];
        engine.process(&mut out, 2);
        assert_eq!(peak(&out), 0.0);
    }

    #[test]
    fn test_noise_voice_length() {
        let (mut engine, _) = engine();
        let buffer: Arc<[f32]> = vec![0.5f32; 480].into();
        let note = ScheduledNote {
            start_time: 0.0,
            duration: 0.01,
            source: Source::Noise(buffer),
            volume: 1.0,
            envelope: crate::note::Envelope::Percussive {
                floor: 0.001,
                decay: 0.01,
            },
            filter: None,
            bus: Bus::Music,
        };
        engine.handle_command(AudioCommand::Play(note));

        let mut out = vec![0.0f32; 480];
        engine.process(&mut out, 1);
        assert!(out[0] > 0.4);
        assert_eq!(engine.active_voices(), 0);
    }

    #[test]
    fn test_clock_is_published() {
        let (mut engine, frames) = engine();
        let mut out = vec![0.0f32; 960];
        engine.process(&mut out, 2);

        assert_eq!(frames.load(Ordering::Acquire), 480);
        assert!((engine.current_time() - 0.01).abs() < 1e-12);
    }

    #[test]
    fn test_drain_applies_commands() {
        let (mut engine, _) = engine();
        let (tx, rx) = crossbeam_channel::bounded(8);
        tx.send(AudioCommand::Play(ScheduledNote::tone(
            200.0,
            0.0,
            0.1,
            Waveform::Sine,
            0.2,
            Bus::Sfx,
        )))
        .unwrap();
        tx.send(AudioCommand::SetBusLevel {
            bus: Bus::Music,
            level: 0.0,
            time_constant: 0.3,
        })
        .unwrap();

        engine.drain(&rx);
        assert_eq!(engine.active_voices(), 1);
        assert_eq!(engine.mixer().bus_target(Bus::Music), 0.0);
        assert_eq!(engine.mixer().bus_level(Bus::Music), 1.0);
    }
}
