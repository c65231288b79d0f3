//! UTXO provider abstraction.

use std::collections::HashMap;
use std::sync::Mutex;

use super::TxError;
use crate::types::{Address, Hash256, Txid};

/// A spendable output belonging to the sender.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Utxo {
    /// Transaction the output belongs to.
    pub txid: Txid,
    /// Output index within that transaction.
    pub vout: u32,
    /// Value in satoshis.
    pub value: u64,
}

/// Source of spendable outputs for an address.
///
/// Implementations can query the blockchain node, a dedicated indexing
/// service, or (for tests and devnets) an in-memory table.
pub trait UtxoProvider {
    /// Returns the spendable outputs for `address`.
    fn utxos(&self, address: &Address) -> Result<Vec<Utxo>, TxError>;
}

/// In-memory implementation of [`UtxoProvider`].
///
/// Tests and devnets fund addresses explicitly; the provider hands the
/// outputs back unchanged.
#[derive(Default)]
pub struct StaticUtxoProvider {
    table: Mutex<HashMap<Address, Vec<Utxo>>>,
    next_funding_id: Mutex<u64>,
}

impl StaticUtxoProvider {
    /// Creates an empty provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// Credits `address` with one synthetic output worth `value` satoshis.
    pub fn fund(&self, address: Address, value: u64) {
        let mut id = self.next_funding_id.lock().expect("utxo lock poisoned");
        *id += 1;
        let mut input = Vec::with_capacity(28);
        input.extend_from_slice(b"funding-");
        input.extend_from_slice(&id.to_be_bytes());
        input.extend_from_slice(address.as_hash().as_bytes());
        let txid = Txid(Hash256::compute(&input));
        drop(id);

        self.table
            .lock()
            .expect("utxo lock poisoned")
            .entry(address)
            .or_default()
            .push(Utxo {
                txid,
                vout: 0,
                value,
            });
    }
}

impl UtxoProvider for StaticUtxoProvider {
    fn utxos(&self, address: &Address) -> Result<Vec<Utxo>, TxError> {
        Ok(self
            .table
            .lock()
            .expect("utxo lock poisoned")
            .get(address)
            .cloned()
            .unwrap_or_default())
    }
}
