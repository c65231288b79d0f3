//! The block-processing state machine.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::ChainConfig;
use crate::db::{ChainState, OpContext, Outcome, ValidationRules};
use crate::metrics::MetricsRegistry;
use crate::source::BlockSource;
use crate::storage::SnapshotStore;
use crate::types::{Address, Block, NameOperation};
use crate::{codec, source::SourceError};

use super::error::DriverError;
use super::extract::extract_operations;
use super::handle::StateHandle;

/// How often the reindex sleep re-checks the shutdown flag.
const SLEEP_SLICE: Duration = Duration::from_millis(200);

/// The virtual-chain driver.
///
/// Generic over:
///
/// - `S`: block source implementing [`BlockSource`],
/// - `P`: snapshot persistence implementing [`SnapshotStore`].
///
/// Per block it fetches, extracts candidates, validates and applies them in
/// transaction order, seals the consensus hash, persists the snapshot, and
/// publishes it through the [`StateHandle`]. All of that is strictly
/// sequential; determinism depends on it.
pub struct ChainDriver<S, P> {
    source: Arc<S>,
    store: P,
    handle: Arc<StateHandle>,
    metrics: Arc<MetricsRegistry>,
    rules: ValidationRules,
    start_block: u64,
    window: u64,
    reindex_frequency: Duration,
}

impl<S, P> ChainDriver<S, P>
where
    S: BlockSource,
    P: SnapshotStore,
{
    /// Creates a driver, resuming from the store's committed snapshot if
    /// one exists and otherwise starting from genesis.
    ///
    /// Returns the driver together with the [`StateHandle`] the endpoint
    /// should read through.
    pub fn bootstrap(
        cfg: &ChainConfig,
        source: Arc<S>,
        store: P,
        metrics: Arc<MetricsRegistry>,
    ) -> Result<(Self, Arc<StateHandle>), DriverError> {
        let initial = match store.load_current()? {
            Some(state) => {
                tracing::info!(height = state.height, "resuming from committed snapshot");
                state
            }
            None => ChainState::genesis(cfg.start_block, cfg.consensus_window),
        };
        metrics.engine.committed_height.set(initial.height as i64);

        let handle = StateHandle::new(initial);
        let driver = Self {
            source,
            store,
            handle: handle.clone(),
            metrics,
            rules: cfg.validation_rules(),
            start_block: cfg.start_block,
            window: cfg.consensus_window,
            reindex_frequency: cfg.reindex_frequency,
        };
        Ok((driver, handle))
    }

    /// Returns the handle this driver publishes through.
    pub fn handle(&self) -> Arc<StateHandle> {
        self.handle.clone()
    }

    /// Runs the driver until shutdown is requested or a fatal error occurs.
    ///
    /// Intended for a dedicated blocking task: the block source is
    /// synchronous and the loop sleeps between polls.
    pub fn run(&mut self) -> Result<(), DriverError> {
        loop {
            if self.handle.is_shutdown() {
                return Ok(());
            }
            match self.source.tip() {
                Ok(tip) => {
                    self.sync_to(tip)?;
                }
                Err(e) if e.is_retriable() => {
                    tracing::debug!("chain tip unavailable: {e}");
                }
                Err(e) => return Err(e.into()),
            }
            self.sleep_between_polls();
        }
    }

    /// Processes blocks up to `tip`, stopping early on shutdown or when
    /// the source cannot serve the next block yet.
    ///
    /// Returns the committed height afterwards.
    pub fn sync_to(&mut self, tip: u64) -> Result<u64, DriverError> {
        loop {
            let committed = self.handle.committed();
            let next = committed.height + 1;
            if next > tip || self.handle.is_shutdown() {
                return Ok(committed.height);
            }

            let block = match self.source.block_at(next) {
                Ok(block) => block,
                Err(e) if e.is_retriable() => {
                    tracing::debug!(height = next, "block not yet available: {e}");
                    return Ok(committed.height);
                }
                Err(e) => return Err(e.into()),
            };

            if let Some(last_hash) = committed.last_block_hash {
                if block.header.prev_hash != last_hash {
                    self.rewind()?;
                    // No progress means the source went away mid-rewind;
                    // leave the retry to the next poll.
                    if self.handle.committed().height >= committed.height {
                        return Ok(self.handle.committed().height);
                    }
                    continue;
                }
            }

            self.process_block(&block)?;
        }
    }

    /// Applies one block on top of the committed state and commits it.
    fn process_block(&mut self, block: &Block) -> Result<(), DriverError> {
        let started = Instant::now();
        let committed = self.handle.committed();
        let height = block.header.height;
        if height != committed.height + 1 {
            return Err(DriverError::Source(SourceError::Malformed(format!(
                "expected block {} but the source returned {height}",
                committed.height + 1
            ))));
        }

        let mut next = (*committed).clone();
        let mut sealed_ops = Vec::new();
        let mut accepted = 0u64;
        let mut rejected = 0u64;

        for candidate in extract_operations(block) {
            let ctx = OpContext {
                block_height: height,
                sender: candidate.sender,
                recipient: candidate.recipient,
                tape: &next.tape,
                rules: self.rules,
            };
            match next.db.apply(&candidate.op, &ctx) {
                Outcome::Applied => {
                    accepted += 1;
                    sealed_ops
                        .extend_from_slice(&consensus_op_bytes(&candidate.op, &candidate.sender));
                    tracing::debug!(
                        height,
                        txid = %candidate.txid.to_hex(),
                        op = candidate.op.kind(),
                        "operation accepted"
                    );
                }
                Outcome::Rejected(reason) => {
                    rejected += 1;
                    tracing::info!(
                        height,
                        txid = %candidate.txid.to_hex(),
                        op = candidate.op.kind(),
                        %reason,
                        "operation rejected"
                    );
                }
            }
        }

        let consensus = next.tape.seal(height, &sealed_ops);
        next.height = height;
        next.last_block_hash = Some(block.header.hash);

        // The commit point: if this fails the process must not advance.
        self.store.commit(&next)?;
        self.handle.publish(Arc::new(next));

        self.metrics.engine.blocks_processed.inc();
        self.metrics.engine.ops_accepted.inc_by(accepted);
        self.metrics.engine.ops_rejected.inc_by(rejected);
        self.metrics.engine.committed_height.set(height as i64);
        self.metrics
            .engine
            .block_apply_seconds
            .observe(started.elapsed().as_secs_f64());

        tracing::debug!(
            height,
            accepted,
            rejected,
            consensus = %consensus.to_hex(),
            "block committed"
        );
        Ok(())
    }

    /// Rewinds to the deepest retained snapshot that still matches the
    /// source's chain, then lets the caller resume from there.
    fn rewind(&mut self) -> Result<(), DriverError> {
        let committed = self.handle.committed();
        tracing::warn!(
            height = committed.height,
            "parent hash mismatch; rewinding to the fork point"
        );
        self.metrics.engine.reorgs.inc();

        let mut height = committed.height;
        loop {
            if height < self.start_block {
                // The fork is below the first interesting block: restart
                // from genesis.
                let genesis = ChainState::genesis(self.start_block, self.window);
                self.metrics.engine.committed_height.set(genesis.height as i64);
                self.handle.publish(Arc::new(genesis));
                return Ok(());
            }

            let Some(snapshot) = self.store.load_at(height)? else {
                return Err(DriverError::ReorgBeyondHorizon { height });
            };
            let source_block = match self.source.block_at(height) {
                Ok(block) => block,
                Err(e) if e.is_retriable() => {
                    // Leave the state as is; the next poll retries.
                    tracing::debug!(height, "source unavailable during rewind: {e}");
                    return Ok(());
                }
                Err(e) => return Err(e.into()),
            };

            if snapshot.last_block_hash == Some(source_block.header.hash) {
                tracing::info!(height, "fork point found; replaying from here");
                self.metrics.engine.committed_height.set(height as i64);
                self.handle.publish(Arc::new(snapshot));
                return Ok(());
            }
            height -= 1;
        }
    }

    /// Sleeps for the reindex interval, waking early on shutdown.
    fn sleep_between_polls(&self) {
        let deadline = Instant::now() + self.reindex_frequency;
        while !self.handle.is_shutdown() {
            let now = Instant::now();
            if now >= deadline {
                return;
            }
            std::thread::sleep(SLEEP_SLICE.min(deadline - now));
        }
    }
}

/// Canonical bytes an accepted operation contributes to the consensus hash:
/// its wire payload followed by its sender address.
fn consensus_op_bytes(op: &NameOperation, sender: &Address) -> Vec<u8> {
    let mut bytes = codec::encode_payload(op);
    bytes.extend_from_slice(sender.as_hash().as_bytes());
    bytes
}
