//! Persisted TTL cache of resolved records.

pub mod clock;
pub mod entry;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use entry::CacheEntry;
pub use store::{CacheHit, CacheStatus, CacheStore};

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache I/O on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("serialize cache record: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("corrupt cache line: {0}")]
    Corrupt(String),
}
