//! In-memory block source.
//!
//! Useful for unit tests, replay experiments, and small devnets. The chain
//! is a vector of blocks with deterministic hashes; tests can append
//! blocks, rewrite a suffix to simulate a reorg, and toggle an outage to
//! exercise the driver's retry path.

use std::sync::Mutex;

use super::{BlockSource, SourceError};
use crate::types::{Block, BlockHash, BlockHeader, BlockTx, Hash256, Txid};

/// In-memory implementation of [`BlockSource`].
pub struct MemoryBlockSource {
    inner: Mutex<Inner>,
}

struct Inner {
    /// Height of the first block in `blocks`.
    start_height: u64,
    blocks: Vec<Block>,
    broadcasts: Vec<BlockTx>,
    unavailable: bool,
    /// Bumped on every rewrite so replacement blocks hash differently.
    fork_tag: u64,
}

impl MemoryBlockSource {
    /// Creates an empty chain whose first block will be at `start_height`.
    pub fn new(start_height: u64) -> Self {
        Self {
            inner: Mutex::new(Inner {
                start_height,
                blocks: Vec::new(),
                broadcasts: Vec::new(),
                unavailable: false,
                fork_tag: 0,
            }),
        }
    }

    /// Appends a block containing `txs` and returns its header.
    pub fn push_block(&self, txs: Vec<BlockTx>) -> BlockHeader {
        let mut inner = self.inner.lock().expect("source lock poisoned");
        inner.push_block(txs)
    }

    /// Drops every block at `height` and above, then appends `tail` as the
    /// replacement suffix. Replacement blocks get fresh hashes, simulating
    /// a reorganization at `height`.
    pub fn rewrite_from(&self, height: u64, tail: Vec<Vec<BlockTx>>) {
        let mut inner = self.inner.lock().expect("source lock poisoned");
        let keep = height.saturating_sub(inner.start_height) as usize;
        inner.blocks.truncate(keep);
        inner.fork_tag += 1;
        for txs in tail {
            inner.push_block(txs);
        }
    }

    /// Makes every call fail with [`SourceError::Unavailable`] until reset.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.inner.lock().expect("source lock poisoned").unavailable = unavailable;
    }

    /// Returns the transactions submitted via [`BlockSource::broadcast`].
    pub fn broadcasts(&self) -> Vec<BlockTx> {
        self.inner
            .lock()
            .expect("source lock poisoned")
            .broadcasts
            .clone()
    }
}

impl Inner {
    fn push_block(&mut self, txs: Vec<BlockTx>) -> BlockHeader {
        let height = self.start_height + self.blocks.len() as u64;
        let prev_hash = self
            .blocks
            .last()
            .map(|b| b.header.hash)
            .unwrap_or(BlockHash(Hash256([0u8; crate::types::HASH_LEN])));

        let hash = block_hash(height, &prev_hash, self.fork_tag, &txs);
        let header = BlockHeader {
            height,
            hash,
            prev_hash,
            timestamp: 1_700_000_000 + height,
        };
        self.blocks.push(Block {
            header: header.clone(),
            txs,
        });
        header
    }
}

/// Deterministic block hash over position, parent, fork tag, and contents.
fn block_hash(height: u64, prev: &BlockHash, fork_tag: u64, txs: &[BlockTx]) -> BlockHash {
    let mut input = Vec::new();
    input.extend_from_slice(&height.to_be_bytes());
    input.extend_from_slice(prev.0.as_bytes());
    input.extend_from_slice(&fork_tag.to_be_bytes());
    for tx in txs {
        input.extend_from_slice(&tx.canonical_bytes());
    }
    BlockHash(Hash256::compute(&input))
}

impl BlockSource for MemoryBlockSource {
    fn tip(&self) -> Result<u64, SourceError> {
        let inner = self.inner.lock().expect("source lock poisoned");
        if inner.unavailable {
            return Err(SourceError::Unavailable("simulated outage".to_string()));
        }
        if inner.blocks.is_empty() {
            return Err(SourceError::Unavailable("chain is empty".to_string()));
        }
        Ok(inner.start_height + inner.blocks.len() as u64 - 1)
    }

    fn block_at(&self, height: u64) -> Result<Block, SourceError> {
        let inner = self.inner.lock().expect("source lock poisoned");
        if inner.unavailable {
            return Err(SourceError::Unavailable("simulated outage".to_string()));
        }
        let index = height
            .checked_sub(inner.start_height)
            .map(|i| i as usize)
            .filter(|&i| i < inner.blocks.len());
        match index {
            Some(i) => Ok(inner.blocks[i].clone()),
            None => Err(SourceError::Unavailable(format!(
                "no block at height {height}"
            ))),
        }
    }

    fn broadcast(&self, tx: &BlockTx) -> Result<Txid, SourceError> {
        let mut inner = self.inner.lock().expect("source lock poisoned");
        if inner.unavailable {
            return Err(SourceError::Unavailable("simulated outage".to_string()));
        }
        let txid = tx.txid();
        inner.broadcasts.push(tx.clone());
        Ok(txid)
    }
}
