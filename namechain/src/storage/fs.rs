//! Filesystem-backed snapshot store.
//!
//! Layout under the working directory:
//!
//! ```text
//! snapshots/
//!   snapshot-000000000104.bin    bincode-2 encoded ChainState
//!   snapshot-000000000105.bin
//!   CURRENT                      ASCII height of the committed snapshot
//! ```
//!
//! A commit writes the new snapshot to a temporary file, fsyncs it,
//! renames it into place, then replaces `CURRENT` the same way. The
//! pointer swap is the commit point: a crash before it leaves the previous
//! height committed, a crash after it leaves the new one. Snapshots older
//! than the retention horizon are pruned after the swap.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use super::{SnapshotStore, StorageError};
use crate::db::ChainState;

const POINTER_FILE: &str = "CURRENT";

/// Configuration for [`FsSnapshotStore`].
#[derive(Clone, Debug)]
pub struct FsStoreConfig {
    /// Directory the snapshots live in. Created if missing.
    pub dir: PathBuf,
    /// How many past heights to retain besides the current one.
    ///
    /// This bounds how deep a reorg can be recovered from without a full
    /// reindex; it should be at least the consensus window.
    pub retain: u64,
}

/// Filesystem implementation of [`SnapshotStore`].
pub struct FsSnapshotStore {
    cfg: FsStoreConfig,
}

impl FsSnapshotStore {
    /// Opens (and if necessary creates) the snapshot directory.
    pub fn open(cfg: FsStoreConfig) -> Result<Self, StorageError> {
        fs::create_dir_all(&cfg.dir)?;
        Ok(Self { cfg })
    }

    fn snapshot_path(&self, height: u64) -> PathBuf {
        self.cfg.dir.join(format!("snapshot-{height:012}.bin"))
    }

    fn pointer_path(&self) -> PathBuf {
        self.cfg.dir.join(POINTER_FILE)
    }

    /// Writes `bytes` to `path` via a temporary file, fsync, and rename.
    fn write_atomic(&self, path: &Path, bytes: &[u8]) -> Result<(), StorageError> {
        let tmp = path.with_extension("tmp");
        {
            let mut file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&tmp)?;
            file.write_all(bytes)?;
            file.sync_all()?;
        }
        fs::rename(&tmp, path)?;
        // Persist the rename itself; non-fatal if the platform refuses to
        // open directories.
        if let Ok(dir) = File::open(&self.cfg.dir) {
            let _ = dir.sync_all();
        }
        Ok(())
    }

    fn read_pointer(&self) -> Result<Option<u64>, StorageError> {
        let path = self.pointer_path();
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let height = text
            .trim()
            .parse::<u64>()
            .map_err(|_| StorageError::Corrupt(format!("unparseable pointer file: {text:?}")))?;
        Ok(Some(height))
    }

    fn prune_below(&self, keep_from: u64) {
        let Ok(entries) = fs::read_dir(&self.cfg.dir) else {
            return;
        };
        for entry in entries.flatten() {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            let Some(height) = parse_snapshot_height(name) else {
                continue;
            };
            if height < keep_from {
                let _ = fs::remove_file(entry.path());
            }
        }
    }
}

fn parse_snapshot_height(file_name: &str) -> Option<u64> {
    file_name
        .strip_prefix("snapshot-")?
        .strip_suffix(".bin")?
        .parse()
        .ok()
}

fn decode_state(bytes: &[u8]) -> Result<ChainState, StorageError> {
    let cfg = bincode::config::standard();
    let (state, _): (ChainState, usize) = bincode::serde::decode_from_slice(bytes, cfg)
        .map_err(|e| StorageError::Codec(format!("snapshot decode failed: {e}")))?;
    Ok(state)
}

impl SnapshotStore for FsSnapshotStore {
    fn commit(&mut self, state: &ChainState) -> Result<(), StorageError> {
        let bytes = state.canonical_bytes();
        self.write_atomic(&self.snapshot_path(state.height), &bytes)?;

        // The pointer swap makes the new height the committed one.
        self.write_atomic(&self.pointer_path(), format!("{}\n", state.height).as_bytes())?;

        self.prune_below(state.height.saturating_sub(self.cfg.retain));
        Ok(())
    }

    fn load_current(&self) -> Result<Option<ChainState>, StorageError> {
        let Some(height) = self.read_pointer()? else {
            return Ok(None);
        };
        match self.load_at(height)? {
            Some(state) => Ok(Some(state)),
            None => Err(StorageError::Corrupt(format!(
                "pointer names height {height} but its snapshot is missing"
            ))),
        }
    }

    fn load_at(&self, height: u64) -> Result<Option<ChainState>, StorageError> {
        let path = self.snapshot_path(height);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let state = decode_state(&bytes)?;
        if state.height != height {
            return Err(StorageError::Corrupt(format!(
                "snapshot file for height {height} contains height {}",
                state.height
            )));
        }
        Ok(Some(state))
    }
}
