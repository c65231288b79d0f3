//! Shared handle between the driver and the query endpoint.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use crate::db::ChainState;

/// Publication point for committed state, plus the two cross-task flags.
///
/// The driver is the only writer: after persisting a block it swaps the
/// inner `Arc` in one short critical section. Readers clone the `Arc` and
/// then work lock-free on an immutable snapshot, so no request ever
/// observes a half-applied block or spans two snapshots.
pub struct StateHandle {
    committed: RwLock<Arc<ChainState>>,
    shutdown: AtomicBool,
    degraded: AtomicBool,
}

impl StateHandle {
    /// Creates a handle publishing `initial` as the committed state.
    pub fn new(initial: ChainState) -> Arc<Self> {
        Arc::new(Self {
            committed: RwLock::new(Arc::new(initial)),
            shutdown: AtomicBool::new(false),
            degraded: AtomicBool::new(false),
        })
    }

    /// Returns the current committed snapshot.
    pub fn committed(&self) -> Arc<ChainState> {
        self.committed
            .read()
            .expect("state lock poisoned")
            .clone()
    }

    /// Atomically replaces the committed snapshot.
    pub fn publish(&self, state: Arc<ChainState>) {
        *self.committed.write().expect("state lock poisoned") = state;
    }

    /// Asks the driver to stop after the in-flight block.
    ///
    /// The flag is polled between blocks and between retries; the driver
    /// never cancels mid-block.
    pub fn request_shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    /// Returns `true` once shutdown has been requested.
    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    /// Marks the handle degraded: the indexer has hit a fatal error and
    /// the published snapshot is the last good one.
    pub fn set_degraded(&self) {
        self.degraded.store(true, Ordering::SeqCst);
    }

    /// Returns `true` if the indexer has failed fatally.
    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::SeqCst)
    }
}
