//! Transaction assembly and signing.
//!
//! One builder method per operation kind. Each method serializes the
//! payload through the codec (so the bytes are exactly what the engine
//! will later parse), selects UTXOs to cover the miner fee plus any
//! destination amounts, arranges outputs as `[payload, destination?,
//! change]`, and signs every input.

use super::utxo::{Utxo, UtxoProvider};
use super::TxError;
use crate::codec;
use crate::types::ops::{
    NameOperation, NamePreorder, NameRegister, NameRevoke, NameTransfer, NameUpdate,
    NamespacePreorder, NamespaceReady, NamespaceReveal, is_valid_name, is_valid_namespace_id,
    preorder_fingerprint,
};
use crate::types::{
    Address, BURN_ADDRESS, BlockTx, ConsensusHash, Hash160, PrivateKey, Salt, Signature, TxInput,
    TxOutput,
};

/// Flat miner fee per operation transaction, in satoshis.
pub const DEFAULT_TX_FEE: u64 = 10_000;

/// Value attached to destination outputs, in satoshis.
///
/// Destination outputs exist to name an address, not to move funds; they
/// carry the conventional dust amount.
pub const DUST_VALUE: u64 = 5_500;

/// Flat price burned by a namespace preorder, in satoshis.
pub const NAMESPACE_PRICE: u64 = 40_000_000;

/// Builds and signs operation-bearing transactions.
#[derive(Clone, Debug)]
pub struct TxBuilder {
    fee: u64,
    dust: u64,
}

impl Default for TxBuilder {
    fn default() -> Self {
        Self {
            fee: DEFAULT_TX_FEE,
            dust: DUST_VALUE,
        }
    }
}

impl TxBuilder {
    /// Creates a builder with explicit fee and dust values.
    pub fn new(fee: u64, dust: u64) -> Self {
        Self { fee, dust }
    }

    /// Builds a name preorder burning `price` satoshis.
    ///
    /// The fingerprint commits to `(name, salt, consensus_hash)`; the
    /// caller must reuse the same salt in the later register.
    pub fn preorder(
        &self,
        name: &str,
        salt: &Salt,
        consensus_hash: &ConsensusHash,
        price: u64,
        key: &PrivateKey,
        provider: &dyn UtxoProvider,
    ) -> Result<BlockTx, TxError> {
        check_name(name)?;
        let op = NameOperation::Preorder(NamePreorder {
            fingerprint: preorder_fingerprint(name, salt, consensus_hash),
            consensus_hash: *consensus_hash,
        });
        self.build(&op, key, provider, &[(BURN_ADDRESS, price)])
    }

    /// Builds a register disclosing `(name, salt)`.
    ///
    /// The destination output names the new owner (the sender).
    pub fn register(
        &self,
        name: &str,
        salt: &Salt,
        key: &PrivateKey,
        provider: &dyn UtxoProvider,
    ) -> Result<BlockTx, TxError> {
        check_name(name)?;
        let op = NameOperation::Register(NameRegister {
            name: name.to_string(),
            salt: *salt,
        });
        self.build(&op, key, provider, &[(key.address(), self.dust)])
    }

    /// Builds a renewal: a register of an already-owned name, burning the
    /// current name price.
    ///
    /// Renewals consume no preorder, so the salt carries no commitment;
    /// the zero salt is used by convention.
    pub fn renew(
        &self,
        name: &str,
        price: u64,
        key: &PrivateKey,
        provider: &dyn UtxoProvider,
    ) -> Result<BlockTx, TxError> {
        check_name(name)?;
        let op = NameOperation::Register(NameRegister {
            name: name.to_string(),
            salt: Salt([0u8; crate::types::SALT_LEN]),
        });
        self.build(&op, key, provider, &[(BURN_ADDRESS, price)])
    }

    /// Builds an update setting `data_hash` on `name`.
    pub fn update(
        &self,
        name: &str,
        data_hash: &Hash160,
        key: &PrivateKey,
        provider: &dyn UtxoProvider,
    ) -> Result<BlockTx, TxError> {
        check_name(name)?;
        let op = NameOperation::Update(NameUpdate {
            name: name.to_string(),
            data_hash: *data_hash,
        });
        self.build(&op, key, provider, &[])
    }

    /// Builds a transfer of `name` to `recipient`.
    pub fn transfer(
        &self,
        name: &str,
        recipient: &Address,
        keep_data: bool,
        key: &PrivateKey,
        provider: &dyn UtxoProvider,
    ) -> Result<BlockTx, TxError> {
        check_name(name)?;
        let op = NameOperation::Transfer(NameTransfer {
            name: name.to_string(),
            keep_data,
        });
        self.build(&op, key, provider, &[(*recipient, self.dust)])
    }

    /// Builds a revoke of `name`.
    pub fn revoke(
        &self,
        name: &str,
        key: &PrivateKey,
        provider: &dyn UtxoProvider,
    ) -> Result<BlockTx, TxError> {
        check_name(name)?;
        let op = NameOperation::Revoke(NameRevoke {
            name: name.to_string(),
        });
        self.build(&op, key, provider, &[])
    }

    /// Builds a namespace preorder burning the flat namespace price.
    pub fn namespace_preorder(
        &self,
        namespace_id: &str,
        salt: &Salt,
        consensus_hash: &ConsensusHash,
        key: &PrivateKey,
        provider: &dyn UtxoProvider,
    ) -> Result<BlockTx, TxError> {
        check_namespace(namespace_id)?;
        let op = NameOperation::NamespacePreorder(NamespacePreorder {
            fingerprint: preorder_fingerprint(namespace_id, salt, consensus_hash),
            consensus_hash: *consensus_hash,
        });
        self.build(&op, key, provider, &[(BURN_ADDRESS, NAMESPACE_PRICE)])
    }

    /// Builds a namespace reveal with the given pricing parameters.
    pub fn namespace_reveal(
        &self,
        namespace_id: &str,
        salt: &Salt,
        lifetime: u32,
        base_cost: u32,
        cost_decay_ppm: u32,
        key: &PrivateKey,
        provider: &dyn UtxoProvider,
    ) -> Result<BlockTx, TxError> {
        check_namespace(namespace_id)?;
        let op = NameOperation::NamespaceReveal(NamespaceReveal {
            namespace_id: namespace_id.to_string(),
            salt: *salt,
            lifetime,
            base_cost,
            cost_decay_ppm,
        });
        self.build(&op, key, provider, &[])
    }

    /// Builds a namespace ready.
    pub fn namespace_ready(
        &self,
        namespace_id: &str,
        key: &PrivateKey,
        provider: &dyn UtxoProvider,
    ) -> Result<BlockTx, TxError> {
        check_namespace(namespace_id)?;
        let op = NameOperation::NamespaceReady(NamespaceReady {
            namespace_id: namespace_id.to_string(),
        });
        self.build(&op, key, provider, &[])
    }

    /// Assembles and signs one operation transaction.
    fn build(
        &self,
        op: &NameOperation,
        key: &PrivateKey,
        provider: &dyn UtxoProvider,
        destinations: &[(Address, u64)],
    ) -> Result<BlockTx, TxError> {
        let sender = key.address();
        let required = self.fee + destinations.iter().map(|(_, v)| v).sum::<u64>();
        let (inputs, total_in) = select_utxos(provider.utxos(&sender)?, required)?;

        let mut outputs = Vec::with_capacity(destinations.len() + 2);
        outputs.push(TxOutput::Payload {
            data: codec::encode_payload(op),
        });
        for (address, value) in destinations {
            outputs.push(TxOutput::Pay {
                address: *address,
                value: *value,
            });
        }
        // Change below the dust threshold is left to the miner.
        let change = total_in - required;
        if change >= self.dust {
            outputs.push(TxOutput::Pay {
                address: sender,
                value: change,
            });
        }

        let mut tx = BlockTx {
            inputs: inputs
                .into_iter()
                .map(|utxo| TxInput {
                    prev_txid: utxo.txid,
                    prev_vout: utxo.vout,
                    public_key: key.public_key(),
                    signature: Signature(Vec::new()),
                })
                .collect(),
            outputs,
        };

        let sighash = tx.sighash_bytes();
        let signature = key.sign(&sighash);
        for input in &mut tx.inputs {
            input.signature = signature.clone();
        }
        Ok(tx)
    }
}

/// Picks UTXOs largest-first until `required` satoshis are covered.
///
/// The sort is made total (value, then txid, then vout) so the same UTXO
/// set always yields the same transaction.
fn select_utxos(mut utxos: Vec<Utxo>, required: u64) -> Result<(Vec<Utxo>, u64), TxError> {
    utxos.sort_by(|a, b| {
        b.value
            .cmp(&a.value)
            .then(a.txid.cmp(&b.txid))
            .then(a.vout.cmp(&b.vout))
    });

    let mut selected = Vec::new();
    let mut total = 0u64;
    for utxo in utxos {
        if total >= required {
            break;
        }
        total += utxo.value;
        selected.push(utxo);
    }

    if total < required {
        return Err(TxError::InsufficientFunds {
            required,
            available: total,
        });
    }
    Ok((selected, total))
}

fn check_name(name: &str) -> Result<(), TxError> {
    if !is_valid_name(name) {
        return Err(TxError::InvalidName(name.to_string()));
    }
    Ok(())
}

fn check_namespace(namespace_id: &str) -> Result<(), TxError> {
    if !is_valid_namespace_id(namespace_id) {
        return Err(TxError::InvalidName(namespace_id.to_string()));
    }
    Ok(())
}
