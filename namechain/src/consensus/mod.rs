//! Consensus-hash tape.
//!
//! At the end of every processed block the driver seals the block's
//! accepted operations into a new consensus hash:
//!
//! ```text
//! CH[h] = blake3_16( ops_bytes ‖ CH[h-1] ‖ CH[h-W] )
//! ```
//!
//! where `ops_bytes` is the concatenation, in transaction order, of each
//! accepted operation's canonical wire payload followed by its sender
//! address, and `W` is the consensus window. Binding each hash both to the
//! immediate past and to a point `W` blocks back makes client-committed
//! hashes checkable with a simple window lookup.
//!
//! The tape retains the last `W` entries; older entries are evicted.

use serde::{Deserialize, Serialize};

use crate::types::ConsensusHash;

/// One sealed entry of the tape.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ConsensusEntry {
    /// Block height this hash was sealed at.
    pub height: u64,
    /// The consensus hash for that block.
    pub hash: ConsensusHash,
}

/// Sliding window of recent consensus hashes.
///
/// Owned by the committed chain state; only the driver appends to it, at
/// block boundaries. Readers use [`contains`](ConsensusTape::contains) to
/// check freshness of client-committed hashes and
/// [`current`](ConsensusTape::current) for the latest hash.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ConsensusTape {
    window: u64,
    entries: Vec<ConsensusEntry>,
}

impl ConsensusTape {
    /// Creates an empty tape with the given window size.
    ///
    /// A window of zero is clamped to one: the tape must retain at least
    /// the current hash.
    pub fn new(window: u64) -> Self {
        Self {
            window: window.max(1),
            entries: Vec::new(),
        }
    }

    /// Returns the configured window size `W`.
    pub fn window(&self) -> u64 {
        self.window
    }

    /// Returns the most recent consensus hash, if any block has been sealed.
    pub fn current(&self) -> Option<ConsensusHash> {
        self.entries.last().map(|e| e.hash)
    }

    /// Returns the hash sealed at `height`, if still retained.
    pub fn at(&self, height: u64) -> Option<ConsensusHash> {
        self.entries
            .iter()
            .find(|e| e.height == height)
            .map(|e| e.hash)
    }

    /// Checks whether `hash` is inside the retained window.
    ///
    /// Any operation committing to a hash older than the window fails this
    /// check and must be rejected.
    pub fn contains(&self, hash: &ConsensusHash) -> bool {
        self.entries.iter().any(|e| e.hash == *hash)
    }

    /// Seals block `height`, producing and retaining its consensus hash.
    ///
    /// `ops_bytes` must already be in canonical accepted-operation order.
    /// Missing predecessors (the first blocks after genesis) fall back to
    /// the deterministic genesis hash so that every replica computes the
    /// same tape from the same blocks.
    pub fn seal(&mut self, height: u64, ops_bytes: &[u8]) -> ConsensusHash {
        let prev = self.current().unwrap_or_else(ConsensusHash::genesis);
        let windowed = height
            .checked_sub(self.window)
            .and_then(|h| self.at(h))
            .unwrap_or_else(ConsensusHash::genesis);

        let mut input =
            Vec::with_capacity(ops_bytes.len() + 2 * crate::types::CONSENSUS_HASH_LEN);
        input.extend_from_slice(ops_bytes);
        input.extend_from_slice(prev.as_bytes());
        input.extend_from_slice(windowed.as_bytes());

        let hash = ConsensusHash::compute(&input);
        self.entries.push(ConsensusEntry { height, hash });

        // Evict entries that fell out of the window.
        if self.entries.len() as u64 > self.window {
            let excess = self.entries.len() - self.window as usize;
            self.entries.drain(..excess);
        }

        hash
    }

    /// Returns the retained entries, oldest first.
    pub fn entries(&self) -> &[ConsensusEntry] {
        &self.entries
    }

    /// Drops every entry sealed above `height`.
    ///
    /// Used when rewinding to an earlier snapshot after a reorg. Note that
    /// entries evicted by the window cannot be recovered this way; rewinds
    /// deeper than the window require reloading a snapshot.
    pub fn truncate_above(&mut self, height: u64) {
        self.entries.retain(|e| e.height <= height);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sealed_tape(window: u64, blocks: u64) -> ConsensusTape {
        let mut tape = ConsensusTape::new(window);
        for h in 1..=blocks {
            tape.seal(h, format!("ops at {h}").as_bytes());
        }
        tape
    }

    #[test]
    fn sealing_is_deterministic() {
        let a = sealed_tape(144, 50);
        let b = sealed_tape(144, 50);
        assert_eq!(a, b);
        assert_eq!(a.current(), b.current());
    }

    #[test]
    fn hash_depends_on_accepted_ops() {
        let mut a = ConsensusTape::new(8);
        let mut b = ConsensusTape::new(8);
        a.seal(1, b"op-a");
        b.seal(1, b"op-b");
        assert_ne!(a.current(), b.current());
    }

    #[test]
    fn window_evicts_old_entries() {
        let tape = sealed_tape(4, 10);
        assert_eq!(tape.entries().len(), 4);
        assert_eq!(tape.entries()[0].height, 7);
        assert!(tape.at(6).is_none());
        assert!(tape.at(10).is_some());
    }

    #[test]
    fn contains_tracks_the_window() {
        let mut tape = ConsensusTape::new(3);
        let h1 = tape.seal(1, b"a");
        tape.seal(2, b"b");
        tape.seal(3, b"c");
        assert!(tape.contains(&h1));

        // Sealing block 4 evicts block 1's hash.
        tape.seal(4, b"d");
        assert!(!tape.contains(&h1));
    }

    #[test]
    fn divergence_propagates_through_the_chain() {
        // A single differing block keeps every later hash different, even
        // when all subsequent ops agree.
        let mut a = ConsensusTape::new(3);
        let mut b = ConsensusTape::new(3);
        a.seal(1, b"first-a");
        b.seal(1, b"first-b");
        for h in 2..=4 {
            assert_ne!(a.seal(h, b"same"), b.seal(h, b"same"));
        }
    }

    #[test]
    fn truncate_above_rewinds_recent_entries() {
        let mut tape = sealed_tape(16, 10);
        let at_7 = tape.at(7).unwrap();
        tape.truncate_above(7);
        assert_eq!(tape.current(), Some(at_7));
        assert!(tape.at(8).is_none());
    }
}
