//! Per-voice DSP used by the synthesizer

mod filter;

pub use filter::{resonance_db, Filter, FilterType};
