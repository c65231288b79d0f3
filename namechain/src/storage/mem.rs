//! In-memory snapshot store.
//!
//! Keeps committed states in a `BTreeMap` keyed by height, with the same
//! pointer discipline as the filesystem store. Used by driver tests and
//! simulations; dropping and re-opening over the same map models a restart.

use std::collections::BTreeMap;

use super::{SnapshotStore, StorageError};
use crate::db::ChainState;

/// In-memory implementation of [`SnapshotStore`].
#[derive(Default)]
pub struct MemorySnapshotStore {
    snapshots: BTreeMap<u64, ChainState>,
    committed: Option<u64>,
    retain: u64,
}

impl MemorySnapshotStore {
    /// Creates an empty store retaining `retain` past heights.
    pub fn new(retain: u64) -> Self {
        Self {
            snapshots: BTreeMap::new(),
            committed: None,
            retain,
        }
    }

    /// Returns the number of retained snapshots.
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Returns `true` if nothing has been committed.
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn commit(&mut self, state: &ChainState) -> Result<(), StorageError> {
        self.snapshots.insert(state.height, state.clone());
        self.committed = Some(state.height);

        let keep_from = state.height.saturating_sub(self.retain);
        self.snapshots.retain(|&h, _| h >= keep_from);
        Ok(())
    }

    fn load_current(&self) -> Result<Option<ChainState>, StorageError> {
        let Some(height) = self.committed else {
            return Ok(None);
        };
        match self.snapshots.get(&height) {
            Some(state) => Ok(Some(state.clone())),
            None => Err(StorageError::Corrupt(format!(
                "committed height {height} has no snapshot"
            ))),
        }
    }

    fn load_at(&self, height: u64) -> Result<Option<ChainState>, StorageError> {
        Ok(self.snapshots.get(&height).cloned())
    }
}
