//! Snapshot persistence.
//!
//! The driver commits one snapshot per processed block. Commits must be
//! crash-consistent: after a crash at any instant, reloading yields the
//! state of some fully committed height, never a partial block.

use std::fmt;

use crate::db::ChainState;

/// Filesystem-backed snapshot store.
pub mod fs;
/// In-memory snapshot store for tests and simulations.
pub mod mem;

pub use fs::FsSnapshotStore;
pub use mem::MemorySnapshotStore;

/// Storage-level error type.
#[derive(Debug)]
pub enum StorageError {
    /// Underlying I/O failure.
    Io(std::io::Error),
    /// Snapshot bytes could not be produced or interpreted.
    Codec(String),
    /// Stored data is internally inconsistent (e.g. a pointer naming a
    /// missing snapshot).
    Corrupt(String),
}

impl From<std::io::Error> for StorageError {
    fn from(e: std::io::Error) -> Self {
        StorageError::Io(e)
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::Io(e) => write!(f, "snapshot I/O error: {e}"),
            StorageError::Codec(msg) => write!(f, "snapshot encoding error: {msg}"),
            StorageError::Corrupt(msg) => write!(f, "corrupt snapshot store: {msg}"),
        }
    }
}

impl std::error::Error for StorageError {}

/// Abstract snapshot store used by the driver.
///
/// The interface is intentionally small: commit the new state, reload the
/// committed state on startup, and reload an older retained height when
/// rewinding through a reorg.
pub trait SnapshotStore {
    /// Atomically commits `state` as the new current snapshot.
    ///
    /// On return the snapshot must survive a crash; a failure here is
    /// fatal for the driver and must leave the previous snapshot intact.
    fn commit(&mut self, state: &ChainState) -> Result<(), StorageError>;

    /// Loads the current committed snapshot, if one exists.
    fn load_current(&self) -> Result<Option<ChainState>, StorageError>;

    /// Loads the retained snapshot at exactly `height`, if present.
    fn load_at(&self, height: u64) -> Result<Option<ChainState>, StorageError>;
}
