//! Music scheduler actor
//!
//! One thread owns the `Sequencer`. Commands and the periodic tick arrive
//! through a single `select!`, so sequencer state is never shared; readers
//! get a snapshot published after every message.

use crate::clock::Clock;
use crate::config::SchedulerConfig;
use crate::patterns::Genre;
use crate::sequencer::{Sequencer, SequencerState};
use crate::synth::ToneSynth;
use crossbeam_channel::{never, select, tick, Receiver, Sender};
use parking_lot::Mutex;
use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

enum SchedulerCommand {
    Start(Genre),
    Stop,
    ChangeGenre(Genre),
    StopAt(f64),
    Shutdown,
}

/// Handle to the scheduler thread; dropping it stops the thread
pub struct MusicScheduler {
    commands: Sender<SchedulerCommand>,
    state: Arc<Mutex<SequencerState>>,
    handle: Option<JoinHandle<()>>,
}

impl MusicScheduler {
    pub fn spawn(
        config: SchedulerConfig,
        clock: Arc<dyn Clock>,
        synth: ToneSynth,
    ) -> io::Result<Self> {
        let (tx, rx) = crossbeam_channel::unbounded();
        let state = Arc::new(Mutex::new(SequencerState::default()));
        let snapshot = Arc::clone(&state);

        let handle = thread::Builder::new()
            .name("music-scheduler".into())
            .spawn(move || run(Sequencer::new(config), clock, synth, rx, snapshot))?;

        Ok(Self {
            commands: tx,
            state,
            handle: Some(handle),
        })
    }

    /// Start (or restart) from beat 0
    pub fn start(&self, genre: Genre) {
        self.send(SchedulerCommand::Start(genre));
    }

    pub fn stop(&self) {
        self.send(SchedulerCommand::Stop);
    }

    pub fn change_genre(&self, genre: Genre) {
        self.send(SchedulerCommand::ChangeGenre(genre));
    }

    /// Stop once the audio clock reaches `deadline`
    pub fn stop_at(&self, deadline: f64) {
        self.send(SchedulerCommand::StopAt(deadline));
    }

    /// Latest published sequencer state
    pub fn state(&self) -> SequencerState {
        *self.state.lock()
    }

    fn send(&self, cmd: SchedulerCommand) {
        if self.commands.send(cmd).is_err() {
            tracing::warn!("Music scheduler thread is gone");
        }
    }
}

impl Drop for MusicScheduler {
    fn drop(&mut self) {
        let _ = self.commands.send(SchedulerCommand::Shutdown);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn run(
    mut sequencer: Sequencer,
    clock: Arc<dyn Clock>,
    synth: ToneSynth,
    commands: Receiver<SchedulerCommand>,
    snapshot: Arc<Mutex<SequencerState>>,
) {
    let interval = sequencer.config().tick_interval;
    // Only ticks while playing
    let mut ticker: Receiver<Instant> = never();

    loop {
        let mut started = false;
        let mut shutdown = false;
        select! {
            recv(commands) -> msg => match msg {
                Ok(SchedulerCommand::Start(genre)) => {
                    sequencer.start(genre, clock.now());
                    started = true;
                    tracing::info!(%genre, "Music started");
                }
                Ok(SchedulerCommand::Stop) => {
                    sequencer.stop();
                    tracing::info!("Music stopped");
                }
                Ok(SchedulerCommand::ChangeGenre(genre)) => {
                    sequencer.change_genre(genre);
                    tracing::info!(%genre, "Genre changed");
                }
                Ok(SchedulerCommand::StopAt(deadline)) => sequencer.stop_at(deadline),
                Ok(SchedulerCommand::Shutdown) | Err(_) => shutdown = true,
            },
            recv(ticker) -> _ => {
                sequencer.tick(clock.now(), &synth);
            }
        }

        if shutdown {
            break;
        }
        if started {
            ticker = tick(interval);
        } else if !sequencer.is_playing() {
            ticker = never();
        }
        *snapshot.lock() = sequencer.state();
    }

    tracing::debug!("Music scheduler exiting");
}
