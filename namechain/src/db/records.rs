// namechain/src/db/records.rs

//! Record types stored in the name database.

use serde::{Deserialize, Serialize};

use crate::types::{Address, ConsensusHash, Hash160};

/// A registered name.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct NameRecord {
    /// Current owner. Changes only via transfer.
    pub owner: Address,
    /// Digest of the off-chain data associated with the name, if set.
    pub data_hash: Option<Hash160>,
    /// Block height the name was registered (or last re-registered) at.
    pub registered_at: u64,
    /// First block height at which the name is expired.
    pub expires_at: u64,
    /// Namespace the name belongs to.
    pub namespace_id: String,
    /// Whether the name has been revoked by its owner.
    ///
    /// A revoked name accepts no further operations until it expires.
    pub revoked: bool,
    /// Fingerprint of the preorder that created this registration.
    pub fingerprint: Hash160,
}

impl NameRecord {
    /// Returns `true` if the name is expired as of `height`.
    pub fn is_expired(&self, height: u64) -> bool {
        height >= self.expires_at
    }
}

/// Which kind of object a preorder commits to.
///
/// The fingerprint hides the committed name, so the kind comes from the
/// opcode that created the record. Registers only consume name preorders
/// and reveals only consume namespace preorders.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum PreorderKind {
    /// Commits to a full name.
    Name,
    /// Commits to a namespace id.
    Namespace,
}

/// An outstanding preorder commitment.
///
/// Created by a preorder operation, consumed by the matching register or
/// reveal, and otherwise expiring silently after its TTL.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct PreorderRecord {
    /// Address that sent the preorder. Only this address may consume it.
    pub sender: Address,
    /// Block height the preorder was accepted at.
    pub block_height: u64,
    /// Consensus hash the preorder committed to.
    pub consensus_hash: ConsensusHash,
    /// Whether this commits to a name or a namespace.
    pub kind: PreorderKind,
}

impl PreorderRecord {
    /// Returns `true` if the preorder is expired as of `height` given `ttl`.
    pub fn is_expired(&self, height: u64, ttl: u64) -> bool {
        height.saturating_sub(self.block_height) > ttl
    }
}

/// Lifecycle state of a namespace.
///
/// The *preordered* stage lives in the preorder table; once revealed a
/// namespace exists as a record and can only move forward to ready.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum NamespaceState {
    /// Revealed by its creator; only the creator may register names.
    Revealed,
    /// Open: anyone may register names, subject to pricing.
    Ready,
}

/// A revealed or ready namespace.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct NamespaceRecord {
    /// Address that preordered and revealed the namespace.
    pub creator: Address,
    /// Name lifetime in blocks for registrations in this namespace.
    pub lifetime: u32,
    /// Base name cost in satoshis.
    pub base_cost: u32,
    /// Cost decay rate per extra name character, in millionths.
    pub cost_decay_ppm: u32,
    /// Current lifecycle state.
    pub state: NamespaceState,
    /// Block height of the reveal.
    pub reveal_height: u64,
    /// Block height of the ready operation, once it happened.
    pub ready_height: Option<u64>,
}
