//! Block Blast audio demo
//!
//! Plays a scripted game session through the audio facade:
//! `blockblast [genre] [seconds]`

use std::thread;
use std::time::{Duration, Instant};

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use blockblast_audio::{AudioConfig, AudioManager, Genre};
use blockblast_settings::{KeyValueStore, MemoryStore, SqliteStore, TuningConfig};

/// Default session length in seconds
const DEFAULT_SECONDS: f64 = 8.0;

/// Event name, line count, pause after it in milliseconds
const SCRIPT: &[(&str, Option<u32>, u64)] = &[
    ("move", None, 180),
    ("move", None, 180),
    ("rotate", None, 220),
    ("hardDrop", None, 300),
    ("lock", None, 250),
    ("lineClear", Some(1), 500),
    ("move", None, 150),
    ("rotate", None, 150),
    ("lock", None, 250),
    ("lineClear", Some(2), 500),
    ("hardDrop", None, 300),
    ("lineClear", Some(3), 600),
    ("hardDrop", None, 300),
    ("lineClear", Some(4), 900),
    ("levelUp", None, 800),
];

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let genre = match args.next() {
        Some(name) => name.parse::<Genre>()?,
        None => Genre::default(),
    };
    let seconds = match args.next() {
        Some(s) => s
            .parse::<f64>()
            .with_context(|| format!("Invalid session length: {}", s))?,
        None => DEFAULT_SECONDS,
    };

    let config = AudioConfig::from_tuning(&TuningConfig::load());
    let store: Box<dyn KeyValueStore> = match SqliteStore::open_default() {
        Ok(store) => Box::new(store),
        Err(e) => {
            tracing::warn!("Settings store unavailable, not persisting: {}", e);
            Box::new(MemoryStore::new())
        }
    };

    let mut audio = AudioManager::new(store, config);
    let saved = audio.settings();

    if !audio.initialize_on_first_user_gesture() {
        tracing::info!("No audio output, nothing to play");
        return Ok(());
    }

    if !audio.sfx_enabled() {
        audio.toggle_sfx();
    }
    audio.set_genre(genre);
    if audio.music_enabled() {
        audio.start_music();
    } else {
        audio.toggle_music();
    }

    run_session(&mut audio, genre, Duration::from_secs_f64(seconds.max(0.0)));

    audio.play_named("gameOver", None);
    thread::sleep(Duration::from_millis(1500));
    audio.stop_music();

    // Leave the player's preferences as they were
    audio.set_genre(saved.genre);
    if audio.sfx_enabled() != saved.sfx_enabled {
        audio.toggle_sfx();
    }
    if audio.music_enabled() != saved.music_enabled {
        audio.toggle_music();
    }
    thread::sleep(Duration::from_millis(300));

    Ok(())
}

/// Loop the script until `length` has passed, moving to the next genre each time it wraps
fn run_session(audio: &mut AudioManager, first: Genre, length: Duration) {
    let start = Instant::now();
    let mut genres = Genre::ALL
        .into_iter()
        .cycle()
        .skip_while(|g| *g != first)
        .skip(1);

    audio.play_named("gameStart", None);
    thread::sleep(Duration::from_millis(600));

    'session: loop {
        for &(name, count, pause_ms) in SCRIPT {
            if start.elapsed() >= length {
                break 'session;
            }
            audio.play_named(name, count);
            thread::sleep(Duration::from_millis(pause_ms));
        }

        if let Some(next) = genres.next() {
            tracing::info!(genre = %next, "Switching genre");
            audio.set_genre(next);
        }
    }
}
