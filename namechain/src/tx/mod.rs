//! Operation constructor.
//!
//! Builds and signs the blockchain transactions that carry name
//! operations. The constructor is deliberately broadcast-free: it returns
//! raw transactions, and callers submit them through a
//! [`BlockSource`](crate::source::BlockSource).

use std::fmt;

/// Transaction assembly and signing.
pub mod builder;
/// HTTP UTXO provider client.
pub mod http;
/// UTXO provider abstraction and in-memory implementation.
pub mod utxo;

pub use builder::TxBuilder;
pub use http::HttpUtxoProvider;
pub use utxo::{StaticUtxoProvider, Utxo, UtxoProvider};

/// Client-side construction errors.
///
/// These are usage errors returned synchronously to the caller; nothing
/// here mutates engine state.
#[derive(Debug)]
pub enum TxError {
    /// The name or namespace id is not well formed.
    InvalidName(String),
    /// The sender's UTXOs cannot cover the required amount.
    InsufficientFunds {
        /// Satoshis needed (fee + destinations).
        required: u64,
        /// Satoshis available across the sender's UTXOs.
        available: u64,
    },
    /// The UTXO provider failed.
    Provider(String),
}

impl fmt::Display for TxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TxError::InvalidName(name) => write!(f, "invalid name: {name:?}"),
            TxError::InsufficientFunds {
                required,
                available,
            } => write!(
                f,
                "insufficient funds: need {required} satoshis, have {available}"
            ),
            TxError::Provider(msg) => write!(f, "UTXO provider error: {msg}"),
        }
    }
}

impl std::error::Error for TxError {}
