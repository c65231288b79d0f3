// namechain/src/types/ops.rs

//! Typed name operations.
//!
//! This module defines the concrete operation payloads recognized by the
//! virtual chain along with a tagged [`NameOperation`] enum. Operations
//! cover the name lifecycle (preorder, register, update, transfer, revoke)
//! and the three-step namespace lifecycle (preorder, reveal, ready).
//!
//! Renewal has no wire form of its own: it is a register of a name the
//! sender already owns, and the name database distinguishes the two cases.
//!
//! The wire encoding of these values lives in `crate::codec`; this module
//! only defines the typed shapes plus the name-shape rules and the preorder
//! fingerprint, which are shared by the codec, the database, and the
//! operation constructor.

use serde::{Deserialize, Serialize};

use super::{ConsensusHash, Hash160, Salt};

/// Maximum length in bytes of a full name (`label.ns`).
///
/// Bounded by the wire format: the update payload must fit a 20-byte data
/// hash, a length byte, and the name within the embedded-output limit.
pub const MAX_NAME_LEN: usize = 19;

/// Maximum length in bytes of a namespace id.
pub const MAX_NAMESPACE_LEN: usize = 8;

/// Commitment to a name hidden behind a fingerprint.
///
/// The fingerprint is `Hash160(name ‖ salt ‖ consensus_hash)`; the embedded
/// consensus hash is carried alongside so the engine can check freshness
/// without knowing the name.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct NamePreorder {
    /// Fingerprint of the committed (name, salt, consensus hash) triple.
    pub fingerprint: Hash160,
    /// Consensus hash the sender committed to.
    pub consensus_hash: ConsensusHash,
}

/// Discloses a preordered name and claims ownership of it.
///
/// Also the wire form of a renewal: registering a name the sender already
/// owns extends its expiration instead of consuming a preorder.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct NameRegister {
    /// The name being claimed, `label.ns`.
    pub name: String,
    /// Salt the matching preorder committed to.
    pub salt: Salt,
}

/// Attaches a new data hash to a name.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct NameUpdate {
    /// The name being updated.
    pub name: String,
    /// Digest of the off-chain data now associated with the name.
    pub data_hash: Hash160,
}

/// Moves a name to a new owner.
///
/// The recipient address is not part of the payload: it is the operation
/// destination output of the carrying transaction.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct NameTransfer {
    /// The name being transferred.
    pub name: String,
    /// Whether the data hash survives the transfer.
    pub keep_data: bool,
}

/// Permanently disables a name until it expires.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct NameRevoke {
    /// The name being revoked.
    pub name: String,
}

/// Commitment to a namespace id hidden behind a fingerprint.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct NamespacePreorder {
    /// Fingerprint of the committed (namespace, salt, consensus hash) triple.
    pub fingerprint: Hash160,
    /// Consensus hash the sender committed to.
    pub consensus_hash: ConsensusHash,
}

/// Discloses a preordered namespace and fixes its pricing parameters.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct NamespaceReveal {
    /// The namespace id being revealed.
    pub namespace_id: String,
    /// Salt the matching preorder committed to.
    pub salt: Salt,
    /// Name lifetime in blocks for names registered in this namespace.
    pub lifetime: u32,
    /// Base name cost in satoshis.
    pub base_cost: u32,
    /// Cost decay rate per extra name character, in millionths.
    pub cost_decay_ppm: u32,
}

/// Opens a revealed namespace for registration by anyone.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct NamespaceReady {
    /// The namespace id being opened.
    pub namespace_id: String,
}

/// Top-level name-operation enum.
///
/// This is the type produced by the codec and consumed by the name
/// database. Every variant corresponds to exactly one wire opcode.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum NameOperation {
    /// Commits to a name without disclosing it.
    Preorder(NamePreorder),
    /// Claims (or renews) a name.
    Register(NameRegister),
    /// Sets a name's data hash.
    Update(NameUpdate),
    /// Changes a name's owner.
    Transfer(NameTransfer),
    /// Revokes a name.
    Revoke(NameRevoke),
    /// Commits to a namespace without disclosing it.
    NamespacePreorder(NamespacePreorder),
    /// Discloses a namespace and its pricing.
    NamespaceReveal(NamespaceReveal),
    /// Opens a namespace for public registration.
    NamespaceReady(NamespaceReady),
}

impl NameOperation {
    /// Returns a short human-readable tag for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            NameOperation::Preorder(_) => "preorder",
            NameOperation::Register(_) => "register",
            NameOperation::Update(_) => "update",
            NameOperation::Transfer(_) => "transfer",
            NameOperation::Revoke(_) => "revoke",
            NameOperation::NamespacePreorder(_) => "namespace_preorder",
            NameOperation::NamespaceReveal(_) => "namespace_reveal",
            NameOperation::NamespaceReady(_) => "namespace_ready",
        }
    }
}

/// Computes the preorder fingerprint for a (name, salt, consensus hash)
/// triple.
///
/// Used both by the operation constructor (to build preorders) and by the
/// name database (to match a register against the preorder table). The
/// preimage layout must never change: fingerprints are consensus-critical.
pub fn preorder_fingerprint(name: &str, salt: &Salt, consensus_hash: &ConsensusHash) -> Hash160 {
    let mut input = Vec::with_capacity(name.len() + super::SALT_LEN + super::CONSENSUS_HASH_LEN);
    input.extend_from_slice(name.as_bytes());
    input.extend_from_slice(salt.as_bytes());
    input.extend_from_slice(consensus_hash.as_bytes());
    Hash160::compute(&input)
}

/// Checks whether `ns` is a well-formed namespace id.
///
/// Namespace ids are 1..=[`MAX_NAMESPACE_LEN`] lowercase alphanumeric bytes.
pub fn is_valid_namespace_id(ns: &str) -> bool {
    !ns.is_empty()
        && ns.len() <= MAX_NAMESPACE_LEN
        && ns
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit())
}

/// Checks whether `name` is a well-formed full name (`label.ns`).
///
/// The label is 1+ bytes of `[a-z0-9_-]`, the suffix a valid namespace id,
/// and the total length is at most [`MAX_NAME_LEN`].
pub fn is_valid_name(name: &str) -> bool {
    if name.is_empty() || name.len() > MAX_NAME_LEN {
        return false;
    }
    let Some((label, ns)) = split_name(name) else {
        return false;
    };
    !label.is_empty()
        && label
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-' || b == b'_')
        && is_valid_namespace_id(ns)
}

/// Splits a full name into `(label, namespace_id)` at the last dot.
///
/// Returns `None` if the name has no dot.
pub fn split_name(name: &str) -> Option<(&str, &str)> {
    name.rsplit_once('.')
}
