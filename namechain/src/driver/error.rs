use std::fmt;

use crate::source::SourceError;
use crate::storage::StorageError;

/// Fatal driver errors.
///
/// Per-operation rejection never surfaces here; anything that does is a
/// condition under which continuing would risk forking the state.
#[derive(Debug)]
pub enum DriverError {
    /// The block source returned malformed data.
    Source(SourceError),
    /// Snapshot persistence failed; the committed height was not advanced.
    Storage(StorageError),
    /// A reorganization reaches below the oldest retained snapshot; the
    /// node must reindex from the start block.
    ReorgBeyondHorizon {
        /// Deepest height that could be checked before running out of
        /// snapshots.
        height: u64,
    },
}

impl From<SourceError> for DriverError {
    fn from(e: SourceError) -> Self {
        DriverError::Source(e)
    }
}

impl From<StorageError> for DriverError {
    fn from(e: StorageError) -> Self {
        DriverError::Storage(e)
    }
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DriverError::Source(e) => write!(f, "block source error: {e}"),
            DriverError::Storage(e) => write!(f, "snapshot persistence error: {e}"),
            DriverError::ReorgBeyondHorizon { height } => write!(
                f,
                "reorganization reaches below the snapshot horizon (checked down to height {height}); full reindex required"
            ),
        }
    }
}

impl std::error::Error for DriverError {}
