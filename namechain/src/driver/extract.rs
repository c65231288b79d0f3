//! Candidate-operation extraction from blockchain transactions.

use crate::codec;
use crate::types::{Address, Block, NameOperation, Txid};

/// A parsed operation candidate, not yet validated against the database.
#[derive(Clone, Debug)]
pub struct PendingOp {
    /// Id of the carrying transaction.
    pub txid: Txid,
    /// The typed operation.
    pub op: NameOperation,
    /// Sender, recovered from the transaction's first input.
    pub sender: Address,
    /// Destination address from the transaction's first payment output.
    pub recipient: Option<Address>,
}

/// Extracts operation candidates from a block, in transaction order.
///
/// Transactions without an embedded payload are not operations and are
/// skipped silently; payloads that fail to parse are skipped with a debug
/// log. Neither case is fatal for the block.
pub fn extract_operations(block: &Block) -> Vec<PendingOp> {
    let mut out = Vec::new();

    for tx in &block.txs {
        let Some(payload) = tx.payload() else {
            continue;
        };
        let Some(sender) = tx.sender() else {
            tracing::debug!(
                height = block.header.height,
                "skipping payload-bearing transaction with no inputs"
            );
            continue;
        };
        match codec::parse_payload(payload) {
            Ok(op) => out.push(PendingOp {
                txid: tx.txid(),
                op,
                sender,
                recipient: tx.destination(),
            }),
            Err(reason) => {
                tracing::debug!(
                    height = block.header.height,
                    %reason,
                    "skipping unparseable payload"
                );
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::encode_payload;
    use crate::types::ops::NameRevoke;
    use crate::types::{
        BlockHash, BlockHeader, BlockTx, HASH_LEN, Hash256, PrivateKey, Signature, TxInput,
        TxOutput,
    };

    fn block_with(txs: Vec<BlockTx>) -> Block {
        Block {
            header: BlockHeader {
                height: 100,
                hash: BlockHash(Hash256([1; HASH_LEN])),
                prev_hash: BlockHash(Hash256([0; HASH_LEN])),
                timestamp: 1_700_000_100,
            },
            txs,
        }
    }

    fn tx_with_payload(key: &PrivateKey, payload: Vec<u8>) -> BlockTx {
        BlockTx {
            inputs: vec![TxInput {
                prev_txid: Txid(Hash256([2; HASH_LEN])),
                prev_vout: 0,
                public_key: key.public_key(),
                signature: Signature(Vec::new()),
            }],
            outputs: vec![TxOutput::Payload { data: payload }],
        }
    }

    #[test]
    fn parseable_payloads_become_candidates() {
        let key = PrivateKey::from_bytes(vec![1; 32]);
        let op = NameOperation::Revoke(NameRevoke {
            name: "alice.id".to_string(),
        });
        let block = block_with(vec![tx_with_payload(&key, encode_payload(&op))]);

        let candidates = extract_operations(&block);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].op, op);
        assert_eq!(candidates[0].sender, key.address());
    }

    #[test]
    fn non_operation_and_garbage_payloads_are_skipped() {
        let key = PrivateKey::from_bytes(vec![1; 32]);
        let plain_payment = BlockTx {
            inputs: vec![TxInput {
                prev_txid: Txid(Hash256([2; HASH_LEN])),
                prev_vout: 0,
                public_key: key.public_key(),
                signature: Signature(Vec::new()),
            }],
            outputs: vec![TxOutput::Pay {
                address: key.address(),
                value: 1_000,
            }],
        };
        let garbage = tx_with_payload(&key, b"not an operation".to_vec());
        let block = block_with(vec![plain_payment, garbage]);

        assert!(extract_operations(&block).is_empty());
    }

    #[test]
    fn extraction_preserves_transaction_order() {
        let key = PrivateKey::from_bytes(vec![1; 32]);
        let first = NameOperation::Revoke(NameRevoke {
            name: "a.id".to_string(),
        });
        let second = NameOperation::Revoke(NameRevoke {
            name: "b.id".to_string(),
        });
        let block = block_with(vec![
            tx_with_payload(&key, encode_payload(&first)),
            tx_with_payload(&key, encode_payload(&second)),
        ]);

        let candidates = extract_operations(&block);
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].op, first);
        assert_eq!(candidates[1].op, second);
    }
}
