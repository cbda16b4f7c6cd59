//! Audio facade
//!
//! `AudioManager` is the one object the game talks to. It is constructed
//! explicitly, owns the settings and the output, and degrades to a silent
//! no-op whenever the device can't be opened.

use crate::clock::Clock;
use crate::config::AudioConfig;
use crate::device::{AudioBackend, AudioError, CpalBackend};
use crate::engine::AudioCommand;
use crate::note::Bus;
use crate::patterns::Genre;
use crate::scheduler::MusicScheduler;
use crate::sequencer::SequencerState;
use crate::settings::AudioSettings;
use crate::sfx::{self, GameEvent};
use crate::synth::ToneSynth;
use blockblast_settings::KeyValueStore;
use crossbeam_channel::Sender;
use std::sync::Arc;

/// Capacity of the engine command queue
const COMMAND_CAPACITY: usize = 1024;

/// Everything that exists once the device is open
struct ActiveOutput {
    // Dropped first so the scheduler stops before the stream does
    scheduler: MusicScheduler,
    synth: ToneSynth,
    commands: Sender<AudioCommand>,
    clock: Arc<dyn Clock>,
    _stream: Option<cpal::Stream>,
}

impl ActiveOutput {
    fn set_bus_level(&self, bus: Bus, level: f32, time_constant: f64) {
        let cmd = AudioCommand::SetBusLevel {
            bus,
            level,
            time_constant,
        };
        send_level(&self.commands, cmd);
    }
}

/// Queue a level change; if the queue is full or closed the engine keeps its current level
fn send_level(commands: &Sender<AudioCommand>, cmd: AudioCommand) {
    if let Err(e) = commands.try_send(cmd) {
        tracing::debug!(command = ?e.into_inner(), "Engine queue unavailable, level change dropped");
    }
}

/// Game-facing audio service
pub struct AudioManager {
    store: Box<dyn KeyValueStore>,
    config: AudioConfig,
    settings: AudioSettings,
    backend: Box<dyn AudioBackend>,
    output: Option<ActiveOutput>,
}

impl AudioManager {
    /// Manager for the default output device; settings are read from `store`
    pub fn new(store: Box<dyn KeyValueStore>, config: AudioConfig) -> Self {
        Self::with_backend(store, config, Box::new(CpalBackend))
    }

    pub fn with_backend(
        store: Box<dyn KeyValueStore>,
        config: AudioConfig,
        backend: Box<dyn AudioBackend>,
    ) -> Self {
        let settings = AudioSettings::load(store.as_ref());
        tracing::debug!(?settings, "Audio settings loaded");
        Self {
            store,
            config,
            settings,
            backend,
            output: None,
        }
    }

    /// Open the output device if it isn't open yet
    ///
    /// Safe to call on every user gesture. On failure the manager stays
    /// silent and the next call tries again. Returns whether audio is live.
    pub fn initialize_on_first_user_gesture(&mut self) -> bool {
        if self.output.is_some() {
            return true;
        }
        match self.open_output() {
            Ok(output) => {
                self.output = Some(output);
                true
            }
            Err(e) => {
                tracing::warn!("Audio unavailable, continuing silently: {}", e);
                false
            }
        }
    }

    fn open_output(&mut self) -> Result<ActiveOutput, AudioError> {
        let (tx, rx) = crossbeam_channel::bounded(COMMAND_CAPACITY);
        let opened = self.backend.open(rx)?;
        let mixer = self.config.mixer;

        // Initial levels apply immediately
        send_level(&tx, AudioCommand::SetMasterLevel(mixer.master_level));
        let sfx_level = if self.settings.sfx_enabled {
            mixer.sfx_level
        } else {
            0.0
        };
        let music_level = if self.settings.music_enabled {
            mixer.music_level
        } else {
            0.0
        };
        for (bus, level) in [(Bus::Sfx, sfx_level), (Bus::Music, music_level)] {
            send_level(
                &tx,
                AudioCommand::SetBusLevel {
                    bus,
                    level,
                    time_constant: 0.0,
                },
            );
        }

        let synth = ToneSynth::new(tx.clone(), opened.sample_rate);
        let scheduler = MusicScheduler::spawn(
            self.config.scheduler,
            Arc::clone(&opened.clock),
            synth.clone(),
        )?;
        if self.settings.music_enabled {
            scheduler.start(self.settings.genre);
        }

        tracing::info!(sample_rate = opened.sample_rate, "Audio initialized");

        Ok(ActiveOutput {
            scheduler,
            synth,
            commands: tx,
            clock: opened.clock,
            _stream: opened.stream,
        })
    }

    pub fn is_initialized(&self) -> bool {
        self.output.is_some()
    }

    /// Play a game event's sound; returns the number of notes queued
    pub fn play(&self, event: GameEvent) -> usize {
        if !self.settings.sfx_enabled {
            return 0;
        }
        match &self.output {
            Some(output) => sfx::play(&output.synth, event, output.clock.now()),
            None => 0,
        }
    }

    /// Play an event by its game-side name; unknown names are ignored
    pub fn play_named(&self, name: &str, count: Option<u32>) -> usize {
        match GameEvent::from_name(name, count) {
            Some(event) => self.play(event),
            None => {
                tracing::debug!(name, "Unknown sound event");
                0
            }
        }
    }

    /// Flip sound effects on or off; returns the new state
    pub fn toggle_sfx(&mut self) -> bool {
        self.initialize_on_first_user_gesture();
        self.settings.sfx_enabled = !self.settings.sfx_enabled;

        let mixer = self.config.mixer;
        if let Some(output) = &self.output {
            let level = if self.settings.sfx_enabled {
                mixer.sfx_level
            } else {
                0.0
            };
            output.set_bus_level(Bus::Sfx, level, mixer.sfx_fade);
        }

        self.save();
        self.settings.sfx_enabled
    }

    /// Flip music on or off; returns the new state
    ///
    /// Turning music off fades the bus out and stops the scheduler once the
    /// fade time has passed on the audio clock.
    pub fn toggle_music(&mut self) -> bool {
        self.initialize_on_first_user_gesture();
        self.settings.music_enabled = !self.settings.music_enabled;

        let mixer = self.config.mixer;
        if let Some(output) = &self.output {
            if self.settings.music_enabled {
                output.set_bus_level(Bus::Music, mixer.music_level, mixer.music_fade);
                output.scheduler.start(self.settings.genre);
            } else {
                output.set_bus_level(Bus::Music, 0.0, mixer.music_fade);
                output
                    .scheduler
                    .stop_at(output.clock.now() + mixer.music_fade);
            }
        }

        self.save();
        self.settings.music_enabled
    }

    /// Pick the music style; takes effect on the next beat if music is playing
    pub fn set_genre(&mut self, genre: Genre) {
        self.settings.genre = genre;
        if self.settings.music_enabled {
            if let Some(output) = &self.output {
                output.scheduler.change_genre(genre);
            }
        }
        self.save();
    }

    /// Stop the music immediately; already queued notes play out
    pub fn stop_music(&self) {
        if let Some(output) = &self.output {
            output.scheduler.stop();
        }
    }

    /// Restart the music from its first beat, if music is enabled
    pub fn start_music(&self) {
        if !self.settings.music_enabled {
            return;
        }
        if let Some(output) = &self.output {
            output.scheduler.start(self.settings.genre);
        }
    }

    pub fn sfx_enabled(&self) -> bool {
        self.settings.sfx_enabled
    }

    pub fn music_enabled(&self) -> bool {
        self.settings.music_enabled
    }

    pub fn genre(&self) -> Genre {
        self.settings.genre
    }

    pub fn settings(&self) -> AudioSettings {
        self.settings
    }

    /// Sequencer snapshot, once audio is initialized
    pub fn sequencer_state(&self) -> Option<SequencerState> {
        self.output.as_ref().map(|output| output.scheduler.state())
    }

    fn save(&mut self) {
        self.settings.save(self.store.as_mut());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::SchedulerConfig;
    use crate::device::OpenedOutput;
    use crate::settings::SETTINGS_KEY;
    use blockblast_settings::{MemoryStore, StoreError};
    use crossbeam_channel::Receiver;
    use parking_lot::Mutex;
    use std::thread;
    use std::time::{Duration, Instant};

    /// Output with no hardware; the test keeps the command receiver
    struct HeadlessBackend {
        clock: Arc<ManualClock>,
        commands: Arc<Mutex<Option<Receiver<AudioCommand>>>>,
    }

    impl AudioBackend for HeadlessBackend {
        fn open(&mut self, commands: Receiver<AudioCommand>) -> Result<OpenedOutput, AudioError> {
            *self.commands.lock() = Some(commands);
            Ok(OpenedOutput {
                clock: self.clock.clone(),
                sample_rate: 48000,
                stream: None,
            })
        }
    }

    struct FailingBackend {
        attempts: Arc<Mutex<usize>>,
    }

    impl AudioBackend for FailingBackend {
        fn open(&mut self, _commands: Receiver<AudioCommand>) -> Result<OpenedOutput, AudioError> {
            *self.attempts.lock() += 1;
            Err(AudioError::NoDevice)
        }
    }

    /// Output whose engine is gone before the first command arrives
    struct ClosedBackend;

    impl AudioBackend for ClosedBackend {
        fn open(&mut self, commands: Receiver<AudioCommand>) -> Result<OpenedOutput, AudioError> {
            drop(commands);
            Ok(OpenedOutput {
                clock: Arc::new(ManualClock::new(0.0)),
                sample_rate: 48000,
                stream: None,
            })
        }
    }

    /// Store the test can inspect after handing it to the manager
    #[derive(Clone, Default)]
    struct SharedStore(Arc<Mutex<MemoryStore>>);

    impl KeyValueStore for SharedStore {
        fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
            self.0.lock().get(key)
        }

        fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
            self.0.lock().set(key, value)
        }
    }

    struct Harness {
        manager: AudioManager,
        clock: Arc<ManualClock>,
        commands: Arc<Mutex<Option<Receiver<AudioCommand>>>>,
        store: SharedStore,
    }

    impl Harness {
        fn new(stored: Option<&str>) -> Self {
            let mut store = SharedStore::default();
            if let Some(json) = stored {
                store.set(SETTINGS_KEY, json).unwrap();
            }
            let clock = Arc::new(ManualClock::new(0.0));
            let commands = Arc::new(Mutex::new(None));
            let backend = HeadlessBackend {
                clock: clock.clone(),
                commands: commands.clone(),
            };
            let config = AudioConfig {
                scheduler: SchedulerConfig {
                    tick_interval: Duration::from_millis(1),
                    ..SchedulerConfig::default()
                },
                ..AudioConfig::default()
            };
            let manager =
                AudioManager::with_backend(Box::new(store.clone()), config, Box::new(backend));
            Self {
                manager,
                clock,
                commands,
                store,
            }
        }

        fn drain(&self) -> Vec<AudioCommand> {
            match self.commands.lock().as_ref() {
                Some(rx) => rx.try_iter().collect(),
                None => Vec::new(),
            }
        }

        fn stored(&self) -> AudioSettings {
            AudioSettings::load(&self.store)
        }
    }

    fn wait_for(mut cond: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(2);
        while Instant::now() < deadline {
            if cond() {
                return true;
            }
            thread::sleep(Duration::from_millis(1));
        }
        cond()
    }

    fn bus_levels(commands: &[AudioCommand]) -> Vec<(Bus, f32, f64)> {
        commands
            .iter()
            .filter_map(|cmd| match cmd {
                AudioCommand::SetBusLevel {
                    bus,
                    level,
                    time_constant,
                } => Some((*bus, *level, *time_constant)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_settings_loaded_at_construction() {
        let h = Harness::new(Some(r#"{"sfxEnabled":true,"musicEnabled":false,"genre":"techno"}"#));
        assert!(h.manager.sfx_enabled());
        assert!(!h.manager.music_enabled());
        assert_eq!(h.manager.genre(), Genre::Techno);
        assert!(!h.manager.is_initialized());
        assert!(h.manager.sequencer_state().is_none());
    }

    #[test]
    fn test_play_before_init_is_noop() {
        let h = Harness::new(Some(r#"{"sfxEnabled":true}"#));
        assert_eq!(h.manager.play(GameEvent::Move), 0);
        assert!(h.drain().is_empty());
    }

    #[test]
    fn test_initial_levels_applied_immediately() {
        let mut h = Harness::new(Some(r#"{"sfxEnabled":true,"musicEnabled":false}"#));
        assert!(h.manager.initialize_on_first_user_gesture());
        assert!(h.manager.initialize_on_first_user_gesture());

        let commands = h.drain();
        assert!(matches!(commands[0], AudioCommand::SetMasterLevel(level) if level == 0.7));
        assert_eq!(
            bus_levels(&commands),
            vec![(Bus::Sfx, 0.5, 0.0), (Bus::Music, 0.0, 0.0)]
        );
        assert!(!h.manager.sequencer_state().unwrap().is_playing);
    }

    #[test]
    fn test_sfx_toggle_round_trip_persists() {
        let mut h = Harness::new(None);
        let original = h.manager.sfx_enabled();

        assert_eq!(h.manager.toggle_sfx(), !original);
        assert_eq!(h.stored().sfx_enabled, !original);
        assert_eq!(h.manager.toggle_sfx(), original);
        assert_eq!(h.stored().sfx_enabled, original);

        h.manager.toggle_sfx();
        h.manager.toggle_sfx();
        assert_eq!(h.manager.sfx_enabled(), original);
        assert_eq!(h.stored().sfx_enabled, original);
    }

    #[test]
    fn test_sfx_toggle_fades_bus() {
        let mut h = Harness::new(None);
        assert!(h.manager.toggle_sfx());

        let levels = bus_levels(&h.drain());
        assert_eq!(levels.last(), Some(&(Bus::Sfx, 0.5, 0.1)));
    }

    #[test]
    fn test_play_respects_sfx_flag() {
        let mut h = Harness::new(None);
        h.manager.initialize_on_first_user_gesture();
        h.drain();
        assert_eq!(h.manager.play(GameEvent::LineClear(4)), 0);

        h.manager.toggle_sfx();
        h.drain();
        h.clock.set(3.0);
        assert_eq!(h.manager.play(GameEvent::LineClear(4)), 12);
        assert_eq!(h.manager.play_named("lineClear", Some(2)), 6);
        assert_eq!(h.manager.play_named("teleport", None), 0);

        let notes: Vec<_> = h
            .drain()
            .into_iter()
            .filter_map(|cmd| match cmd {
                AudioCommand::Play(note) => Some(note),
                _ => None,
            })
            .collect();
        assert_eq!(notes.len(), 18);
        assert!(notes.iter().all(|n| n.start_time >= 3.0 && n.bus == Bus::Sfx));
    }

    #[test]
    fn test_music_off_stops_after_fade() {
        let mut h = Harness::new(None);
        assert!(h.manager.toggle_music());
        assert!(wait_for(|| h
            .manager
            .sequencer_state()
            .is_some_and(|s| s.is_playing)));

        h.clock.set(1.0);
        assert!(!h.manager.toggle_music());
        assert!(!h.stored().music_enabled);
        let levels = bus_levels(&h.drain());
        assert_eq!(levels.last(), Some(&(Bus::Music, 0.0, 0.3)));

        // Fade still running: scheduler keeps going
        h.clock.set(1.2);
        thread::sleep(Duration::from_millis(20));
        assert!(h.manager.sequencer_state().unwrap().is_playing);

        h.clock.set(1.3);
        assert!(wait_for(|| !h.manager.sequencer_state().unwrap().is_playing));
    }

    #[test]
    fn test_music_enabled_at_init_starts_playing() {
        let mut h = Harness::new(Some(r#"{"musicEnabled":true,"genre":"ambient"}"#));
        h.manager.initialize_on_first_user_gesture();
        assert!(wait_for(|| h
            .manager
            .sequencer_state()
            .is_some_and(|s| s.is_playing && s.genre == Genre::Ambient)));

        h.manager.set_genre(Genre::Lofi);
        assert!(wait_for(|| h.manager.sequencer_state().unwrap().tempo_bpm == 85));
        assert_eq!(h.stored().genre, Genre::Lofi);
    }

    #[test]
    fn test_stop_then_start_music() {
        let mut h = Harness::new(Some(r#"{"musicEnabled":true}"#));
        h.manager.initialize_on_first_user_gesture();
        h.clock.set(2.0);
        assert!(wait_for(|| h.manager.sequencer_state().unwrap().beat_index > 0));

        h.manager.stop_music();
        h.manager.start_music();
        assert!(wait_for(|| {
            let s = h.manager.sequencer_state().unwrap();
            s.is_playing && s.beat_index == 0
        }));
    }

    #[test]
    fn test_start_music_requires_enabled() {
        let mut h = Harness::new(None);
        h.manager.initialize_on_first_user_gesture();
        h.manager.start_music();
        thread::sleep(Duration::from_millis(20));
        assert!(!h.manager.sequencer_state().unwrap().is_playing);
    }

    #[test]
    fn test_device_failure_is_silent() {
        let attempts = Arc::new(Mutex::new(0));
        let store = SharedStore::default();
        let mut manager = AudioManager::with_backend(
            Box::new(store.clone()),
            AudioConfig::default(),
            Box::new(FailingBackend {
                attempts: attempts.clone(),
            }),
        );

        assert!(!manager.initialize_on_first_user_gesture());
        assert!(manager.toggle_sfx());
        assert!(manager.toggle_music());
        manager.set_genre(Genre::Techno);
        manager.start_music();
        manager.stop_music();
        assert_eq!(manager.play(GameEvent::GameOver), 0);
        assert!(!manager.is_initialized());

        // Each entry point retried the device
        assert_eq!(*attempts.lock(), 3);

        let stored = AudioSettings::load(&store);
        assert!(stored.sfx_enabled && stored.music_enabled);
        assert_eq!(stored.genre, Genre::Techno);
    }

    #[test]
    fn test_closed_engine_queue_is_tolerated() {
        let mut manager = AudioManager::with_backend(
            Box::new(MemoryStore::new()),
            AudioConfig::default(),
            Box::new(ClosedBackend),
        );

        // Initial levels and music notes are dropped without failing init
        assert!(manager.initialize_on_first_user_gesture());
        assert!(manager.sfx_enabled());
        assert_eq!(manager.play(GameEvent::LineClear(4)), 0);

        assert!(manager.toggle_music());
        assert!(!manager.toggle_music());
        assert!(manager.is_initialized());
    }
}
