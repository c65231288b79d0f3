//! Block source abstraction.
//!
//! A [`BlockSource`] is the engine's window onto the underlying
//! Bitcoin-like blockchain node: the chain tip, blocks by height, and
//! transaction broadcast. Implementations can be backed by a real node
//! over HTTP or by an in-memory chain for tests and devnets.

use std::fmt;

use crate::types::{Block, BlockTx, Txid};

/// HTTP JSON-RPC block source.
pub mod http;
/// In-memory block source for tests, simulations, and devnets.
pub mod mem;

pub use http::HttpBlockSource;
pub use mem::MemoryBlockSource;

/// Source-level error type.
///
/// The distinction matters to the driver: unavailability is retried after
/// the reindex interval, a malformed block halts processing.
#[derive(Debug)]
pub enum SourceError {
    /// The node could not be reached or had not yet indexed the request.
    /// Retriable.
    Unavailable(String),
    /// The node returned data the engine cannot interpret. Fatal for the
    /// affected block.
    Malformed(String),
}

impl SourceError {
    /// Returns `true` if the operation may be retried later.
    pub fn is_retriable(&self) -> bool {
        matches!(self, SourceError::Unavailable(_))
    }
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceError::Unavailable(msg) => write!(f, "block source unavailable: {msg}"),
            SourceError::Malformed(msg) => write!(f, "malformed block source data: {msg}"),
        }
    }
}

impl std::error::Error for SourceError {}

/// Abstract interface to the blockchain node.
///
/// Methods take `&self` so one source can be shared between the driver
/// (fetching blocks) and the endpoint (broadcasting constructed
/// transactions). Implementations must be internally synchronized.
pub trait BlockSource {
    /// Returns the height of the current chain tip.
    fn tip(&self) -> Result<u64, SourceError>;

    /// Fetches the block at `height`.
    ///
    /// Heights above the tip return [`SourceError::Unavailable`].
    fn block_at(&self, height: u64) -> Result<Block, SourceError>;

    /// Submits a signed transaction to the network.
    fn broadcast(&self, tx: &BlockTx) -> Result<Txid, SourceError>;
}
