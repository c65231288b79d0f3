// namechain/src/types/block.rs

//! Blockchain block and transaction types.
//!
//! These are the shapes the engine receives from a [`BlockSource`]
//! (`crate::source::BlockSource`) and the shapes the operation constructor
//! produces for broadcast. Blocks are Bitcoin-like: each transaction has
//! inputs that identify the sender and outputs that either pay an address
//! or carry an embedded data payload.
//!
//! Serialization is done with **bincode 2** using the `serde` integration
//! (`bincode::serde::encode_to_vec`) and an explicit `standard()` config.
//! The same canonical encoding is used everywhere we need transaction bytes.

use serde::{Deserialize, Serialize};

use super::{Address, Hash256, PublicKey, Signature};

/// Strongly-typed transaction id.
///
/// Computed as a BLAKE3-256 digest over the canonical bincode-2
/// serialization of the transaction.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Txid(pub Hash256);

impl Txid {
    /// Returns the lowercase hex encoding of this transaction id.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0.as_bytes())
    }
}

/// Strongly-typed block hash, assigned by the underlying blockchain.
///
/// The engine treats block hashes as opaque: it only compares them to
/// detect reorganizations. It never recomputes them.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct BlockHash(pub Hash256);

/// Transaction input.
///
/// Spends a previous output and identifies the sender: the engine recovers
/// the sending address from the first input's public key.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TxInput {
    /// Id of the transaction being spent.
    pub prev_txid: Txid,
    /// Output index within that transaction.
    pub prev_vout: u32,
    /// Public key of the spender.
    pub public_key: PublicKey,
    /// Detached signature over the canonical unsigned transaction bytes.
    pub signature: Signature,
}

/// Transaction output: either a plain payment or an embedded data payload.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum TxOutput {
    /// Null-data output carrying an embedded operation payload.
    Payload {
        /// Raw payload bytes (magic + opcode + fields).
        data: Vec<u8>,
    },
    /// Payment to an address.
    Pay {
        /// Destination address.
        address: Address,
        /// Amount in satoshis.
        value: u64,
    },
}

/// Blockchain transaction: inputs + ordered outputs.
///
/// By convention, an operation-bearing transaction carries its payload in
/// output 0 and its destination address (transfer recipient, register
/// owner, or the burn address for paid operations) in output 1.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BlockTx {
    /// Inputs, at least one for any spendable transaction.
    pub inputs: Vec<TxInput>,
    /// Ordered outputs.
    pub outputs: Vec<TxOutput>,
}

impl BlockTx {
    /// Returns the canonical byte representation of this transaction.
    ///
    /// # Panics
    ///
    /// Panics if encoding fails. This is considered a programming error,
    /// because all fields are required to be serializable.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let cfg = bincode::config::standard();
        bincode::serde::encode_to_vec(self, cfg)
            .expect("BlockTx should always be serializable with bincode 2 + serde")
    }

    /// Returns the canonical bytes with all input signatures cleared.
    ///
    /// This is the message that input signatures commit to, so that a
    /// signature does not have to sign over itself.
    pub fn sighash_bytes(&self) -> Vec<u8> {
        let mut unsigned = self.clone();
        for input in &mut unsigned.inputs {
            input.signature = Signature(Vec::new());
        }
        unsigned.canonical_bytes()
    }

    /// Computes the canonical transaction id.
    pub fn txid(&self) -> Txid {
        Txid(Hash256::compute(&self.canonical_bytes()))
    }

    /// Returns the sending address, recovered from the first input.
    pub fn sender(&self) -> Option<Address> {
        self.inputs
            .first()
            .map(|input| Address::from_public_key(&input.public_key))
    }

    /// Returns the first embedded payload, if any.
    pub fn payload(&self) -> Option<&[u8]> {
        self.outputs.iter().find_map(|out| match out {
            TxOutput::Payload { data } => Some(data.as_slice()),
            TxOutput::Pay { .. } => None,
        })
    }

    /// Returns the operation destination address, if any.
    ///
    /// This is the first `Pay` output, per the output-ordering convention.
    pub fn destination(&self) -> Option<Address> {
        self.outputs.iter().find_map(|out| match out {
            TxOutput::Pay { address, .. } => Some(*address),
            TxOutput::Payload { .. } => None,
        })
    }
}

/// Block header: linking and ordering information from the blockchain.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BlockHeader {
    /// Height of this block in the chain.
    pub height: u64,
    /// Hash of this block.
    pub hash: BlockHash,
    /// Hash of the parent block.
    pub prev_hash: BlockHash,
    /// Wall-clock timestamp of the block, seconds since Unix epoch.
    pub timestamp: u64,
}

/// Block = header + ordered list of transactions.
///
/// Transaction order within the block is the global operation order; the
/// driver applies candidate operations strictly in this order.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Block {
    /// Header containing linking and ordering information.
    pub header: BlockHeader,
    /// Ordered list of transactions included in this block.
    pub txs: Vec<BlockTx>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Hash160, PrivateKey};

    fn dummy_txid(byte: u8) -> Txid {
        Txid(Hash256([byte; crate::types::HASH_LEN]))
    }

    fn dummy_tx(key: &PrivateKey, payload: Vec<u8>, dest: Option<Address>) -> BlockTx {
        let mut outputs = vec![TxOutput::Payload { data: payload }];
        if let Some(address) = dest {
            outputs.push(TxOutput::Pay {
                address,
                value: 5_500,
            });
        }
        let mut tx = BlockTx {
            inputs: vec![TxInput {
                prev_txid: dummy_txid(1),
                prev_vout: 0,
                public_key: key.public_key(),
                signature: Signature(Vec::new()),
            }],
            outputs,
        };
        let sighash = tx.sighash_bytes();
        tx.inputs[0].signature = key.sign(&sighash);
        tx
    }

    #[test]
    fn txid_is_deterministic() {
        let key = PrivateKey::from_bytes(vec![9u8; 32]);
        let tx = dummy_tx(&key, vec![0x69, 0x64, b'~'], None);
        assert_eq!(tx.txid(), tx.txid());
    }

    #[test]
    fn sender_is_recovered_from_first_input() {
        let key = PrivateKey::from_bytes(vec![9u8; 32]);
        let tx = dummy_tx(&key, vec![], None);
        assert_eq!(tx.sender(), Some(key.address()));
    }

    #[test]
    fn payload_and_destination_follow_output_order() {
        let key = PrivateKey::from_bytes(vec![9u8; 32]);
        let dest = Address(Hash160([3u8; crate::types::HASH160_LEN]));
        let tx = dummy_tx(&key, vec![1, 2, 3], Some(dest));

        assert_eq!(tx.payload(), Some(&[1u8, 2, 3][..]));
        assert_eq!(tx.destination(), Some(dest));
    }

    #[test]
    fn sighash_ignores_existing_signatures() {
        let key = PrivateKey::from_bytes(vec![9u8; 32]);
        let signed = dummy_tx(&key, vec![7], None);

        let mut stripped = signed.clone();
        stripped.inputs[0].signature = Signature(Vec::new());

        assert_eq!(signed.sighash_bytes(), stripped.sighash_bytes());
        assert_ne!(signed.canonical_bytes(), stripped.canonical_bytes());
    }
}
