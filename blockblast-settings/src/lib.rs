//! Settings persistence for Block Blast - key-value store and engine tuning

mod sqlite;
mod store;
mod tuning;

pub use sqlite::SqliteStore;
pub use store::{KeyValueStore, MemoryStore, StoreError};
pub use tuning::TuningConfig;
