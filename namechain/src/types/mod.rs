//! Core domain types used by the virtual chain.
//!
//! This module defines strongly-typed hashes, addresses, key material, and
//! the block/transaction shapes shared across the engine. The goal is to
//! avoid "naked" byte buffers in public APIs and instead use domain-specific
//! newtypes.

use serde::{Deserialize, Serialize};

/// Block and blockchain-transaction types.
pub mod block;
/// Typed name operations embedded in blockchain transactions.
pub mod ops;

pub use block::{Block, BlockHash, BlockHeader, BlockTx, TxInput, TxOutput, Txid};
pub use ops::{
    NameOperation, NamePreorder, NameRegister, NameRevoke, NameTransfer, NameUpdate,
    NamespacePreorder, NamespaceReady, NamespaceReveal,
};

/// Length in bytes of the full-width hash type.
pub const HASH_LEN: usize = 32;

/// Length in bytes of fingerprint/address hashes.
pub const HASH160_LEN: usize = 20;

/// Length in bytes of consensus-hash window entries.
pub const CONSENSUS_HASH_LEN: usize = 16;

/// Length in bytes of preorder salts.
pub const SALT_LEN: usize = 16;

/// Strongly-typed 256-bit hash wrapper (BLAKE3-256).
///
/// Backing representation for transaction ids and other full-width digests.
/// It is always exactly [`HASH_LEN`] bytes long.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Hash256(pub [u8; HASH_LEN]);

impl Hash256 {
    /// Computes a new [`Hash256`] as the BLAKE3-256 hash of `data`.
    pub fn compute(data: &[u8]) -> Self {
        let h = blake3::hash(data);
        Hash256(*h.as_bytes())
    }

    /// Returns the underlying 32-byte hash as a borrowed array.
    pub fn as_bytes(&self) -> &[u8; HASH_LEN] {
        &self.0
    }
}

/// Truncated 160-bit hash (first 20 bytes of BLAKE3-256).
///
/// Used where the wire format only has room for a short digest: preorder
/// fingerprints, name data hashes, and address payloads. Truncation keeps
/// every operation payload within the embedded-output size limit.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Hash160(pub [u8; HASH160_LEN]);

impl Hash160 {
    /// Computes a new [`Hash160`] by truncating the BLAKE3-256 hash of `data`.
    pub fn compute(data: &[u8]) -> Self {
        let h = blake3::hash(data);
        let mut out = [0u8; HASH160_LEN];
        out.copy_from_slice(&h.as_bytes()[..HASH160_LEN]);
        Hash160(out)
    }

    /// Returns the underlying 20-byte hash as a borrowed array.
    pub fn as_bytes(&self) -> &[u8; HASH160_LEN] {
        &self.0
    }

    /// Parses a [`Hash160`] from a 40-character hex string.
    pub fn from_hex(hex_str: &str) -> Result<Self, &'static str> {
        let bytes = hex::decode(hex_str).map_err(|_| "invalid hex encoding")?;
        if bytes.len() != HASH160_LEN {
            return Err("expected a 20-byte hash");
        }
        let mut out = [0u8; HASH160_LEN];
        out.copy_from_slice(&bytes);
        Ok(Hash160(out))
    }

    /// Returns the lowercase hex encoding of this hash.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

/// Consensus hash: a 16-byte digest binding a block to the accepted
/// operations before it and to a windowed reference further back.
///
/// Clients embed the current consensus hash in preorders to prove freshness
/// of their intent; the engine checks membership in the sliding window.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConsensusHash(pub [u8; CONSENSUS_HASH_LEN]);

impl ConsensusHash {
    /// Computes a new [`ConsensusHash`] by truncating the BLAKE3-256 hash
    /// of `data`.
    pub fn compute(data: &[u8]) -> Self {
        let h = blake3::hash(data);
        let mut out = [0u8; CONSENSUS_HASH_LEN];
        out.copy_from_slice(&h.as_bytes()[..CONSENSUS_HASH_LEN]);
        ConsensusHash(out)
    }

    /// The deterministic hash used in place of missing predecessors when
    /// sealing the first blocks after genesis.
    pub fn genesis() -> Self {
        ConsensusHash::compute(b"namechain-genesis")
    }

    /// Returns the underlying bytes as a borrowed array.
    pub fn as_bytes(&self) -> &[u8; CONSENSUS_HASH_LEN] {
        &self.0
    }

    /// Returns the lowercase hex encoding of this hash.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parses a [`ConsensusHash`] from a 32-character hex string.
    pub fn from_hex(hex_str: &str) -> Result<Self, &'static str> {
        let bytes = hex::decode(hex_str).map_err(|_| "invalid hex encoding")?;
        if bytes.len() != CONSENSUS_HASH_LEN {
            return Err("expected a 16-byte consensus hash");
        }
        let mut out = [0u8; CONSENSUS_HASH_LEN];
        out.copy_from_slice(&bytes);
        Ok(ConsensusHash(out))
    }
}

/// Random salt committed to by a preorder.
///
/// The salt keeps the preorder fingerprint resistant to dictionary probing
/// between the preorder and the register that discloses the name.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Salt(pub [u8; SALT_LEN]);

impl Salt {
    /// Returns the underlying bytes as a borrowed array.
    pub fn as_bytes(&self) -> &[u8; SALT_LEN] {
        &self.0
    }

    /// Parses a [`Salt`] from a 32-character hex string.
    pub fn from_hex(hex_str: &str) -> Result<Self, &'static str> {
        let bytes = hex::decode(hex_str).map_err(|_| "invalid hex encoding")?;
        if bytes.len() != SALT_LEN {
            return Err("expected a 16-byte salt");
        }
        let mut out = [0u8; SALT_LEN];
        out.copy_from_slice(&bytes);
        Ok(Salt(out))
    }

    /// Returns the lowercase hex encoding of this salt.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

/// Blockchain address (hash of the owning public key).
///
/// Addresses are opaque to the engine: they identify operation senders and
/// serve as transaction output destinations. Ordering and equality are
/// byte-wise.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Address(pub Hash160);

impl Address {
    /// Derives an [`Address`] from a public key.
    ///
    /// The caller is responsible for passing the canonical byte encoding of
    /// the public key; different encodings of the same key yield different
    /// addresses.
    pub fn from_public_key(pk: &PublicKey) -> Self {
        Address(Hash160::compute(pk.as_bytes()))
    }

    /// Returns the underlying [`Hash160`] backing this address.
    pub fn as_hash(&self) -> &Hash160 {
        &self.0
    }

    /// Parses an [`Address`] from its 40-character hex encoding.
    pub fn from_hex(hex_str: &str) -> Result<Self, &'static str> {
        Ok(Address(Hash160::from_hex(hex_str)?))
    }

    /// Returns the lowercase hex encoding of this address.
    pub fn to_hex(&self) -> String {
        self.0.to_hex()
    }
}

/// Address that name prices are burned to.
///
/// Nothing can spend from the all-zero address, so satoshis sent here are
/// destroyed rather than paid to any party.
pub const BURN_ADDRESS: Address = Address(Hash160([0u8; HASH160_LEN]));

/// Public key bytes, wrapped to avoid naked `Vec<u8>`.
///
/// This type is intentionally opaque: it does not interpret or validate the
/// key material, it only carries it through the API in a structured way.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct PublicKey(pub Vec<u8>);

impl PublicKey {
    /// Returns the raw public key bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// Detached signature bytes over a canonical transaction encoding.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Signature(pub Vec<u8>);

impl Signature {
    /// Returns the raw signature bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// Private key material used by the operation constructor.
///
/// The key scheme is a deterministic BLAKE3 derivation: the public key and
/// signatures are keyed digests of the private bytes. The state engine never
/// verifies signatures (it recovers senders from transaction inputs), so a
/// real curve can be swapped in behind this type without touching the
/// consensus-critical paths.
#[derive(Clone)]
pub struct PrivateKey(Vec<u8>);

impl PrivateKey {
    /// Wraps raw private key bytes.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        PrivateKey(bytes)
    }

    /// Parses a [`PrivateKey`] from a hex string.
    pub fn from_hex(hex_str: &str) -> Result<Self, &'static str> {
        let bytes = hex::decode(hex_str).map_err(|_| "invalid hex encoding")?;
        if bytes.is_empty() {
            return Err("empty private key");
        }
        Ok(PrivateKey(bytes))
    }

    /// Derives the public key for this private key.
    pub fn public_key(&self) -> PublicKey {
        let mut input = Vec::with_capacity(self.0.len() + 13);
        input.extend_from_slice(b"namechain-pub");
        input.extend_from_slice(&self.0);
        PublicKey(Hash256::compute(&input).as_bytes().to_vec())
    }

    /// Derives the address controlled by this private key.
    pub fn address(&self) -> Address {
        Address::from_public_key(&self.public_key())
    }

    /// Produces a detached signature over `msg`.
    pub fn sign(&self, msg: &[u8]) -> Signature {
        let mut input = Vec::with_capacity(self.0.len() + msg.len() + 13);
        input.extend_from_slice(b"namechain-sig");
        input.extend_from_slice(&self.0);
        input.extend_from_slice(msg);
        Signature(Hash256::compute(&input).as_bytes().to_vec())
    }
}

impl std::fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print key material.
        write!(f, "PrivateKey(..)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash160_is_a_truncation_of_hash256() {
        let data = b"alice.id";
        let full = Hash256::compute(data);
        let short = Hash160::compute(data);
        assert_eq!(&full.as_bytes()[..HASH160_LEN], short.as_bytes());
    }

    #[test]
    fn consensus_hash_hex_roundtrip() {
        let ch = ConsensusHash::compute(b"block 144");
        let parsed = ConsensusHash::from_hex(&ch.to_hex()).expect("hex should parse");
        assert_eq!(ch, parsed);
    }

    #[test]
    fn consensus_hash_from_hex_rejects_wrong_length() {
        assert!(ConsensusHash::from_hex("abcd").is_err());
        assert!(ConsensusHash::from_hex("zz").is_err());
    }

    #[test]
    fn address_derivation_is_deterministic() {
        let key = PrivateKey::from_bytes(vec![7u8; 32]);
        let a1 = key.address();
        let a2 = PrivateKey::from_bytes(vec![7u8; 32]).address();
        assert_eq!(a1, a2);

        let other = PrivateKey::from_bytes(vec![8u8; 32]).address();
        assert_ne!(a1, other);
    }

    #[test]
    fn signatures_depend_on_message_and_key() {
        let key = PrivateKey::from_bytes(vec![1u8; 32]);
        let s1 = key.sign(b"tx-a");
        let s2 = key.sign(b"tx-b");
        assert_ne!(s1.as_bytes(), s2.as_bytes());

        let s3 = PrivateKey::from_bytes(vec![2u8; 32]).sign(b"tx-a");
        assert_ne!(s1.as_bytes(), s3.as_bytes());
    }

    #[test]
    fn burn_address_is_all_zeroes() {
        assert_eq!(BURN_ADDRESS.as_hash().as_bytes(), &[0u8; HASH160_LEN]);
    }
}
