//! HTTP JSON-RPC block source.
//!
//! Talks to a blockchain node exposing a small JSON-RPC surface:
//!
//! ```json
//! POST /
//! {"jsonrpc": "2.0", "id": 1, "method": "getblockcount", "params": []}
//! {"jsonrpc": "2.0", "id": 1, "method": "getblock", "params": [104]}
//! {"jsonrpc": "2.0", "id": 1, "method": "sendrawtransaction", "params": ["<hex>"]}
//! ```
//!
//! `getblock` responds with the block as JSON in the shape of
//! [`crate::types::Block`]; `sendrawtransaction` takes the hex of the
//! canonical transaction bytes and responds with the txid hex.
//!
//! This client is thread-safe (`Send + Sync`) and can be shared between
//! the driver and the endpoint. It uses the blocking `reqwest` client
//! internally; the driver runs on a blocking task, and async callers can
//! wrap calls in `spawn_blocking`.

use std::time::Duration;

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{BlockSource, SourceError};
use crate::config::BlockchainNodeConfig;
use crate::types::{Block, BlockTx, Hash256, Txid};

/// HTTP-based implementation of [`BlockSource`].
pub struct HttpBlockSource {
    url: String,
    auth: Option<(String, String)>,
    client: Client,
}

impl HttpBlockSource {
    /// Constructs a client from the node configuration.
    pub fn new(cfg: &BlockchainNodeConfig, timeout: Duration) -> Result<Self, SourceError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SourceError::Unavailable(format!("failed to build HTTP client: {e}")))?;

        let auth = if cfg.user.is_empty() {
            None
        } else {
            Some((cfg.user.clone(), cfg.password.clone()))
        };

        Ok(Self {
            url: cfg.url(),
            auth,
            client,
        })
    }

    fn call<T: for<'de> Deserialize<'de>>(
        &self,
        method: &str,
        params: Vec<Value>,
    ) -> Result<T, SourceError> {
        let body = RpcRequest {
            jsonrpc: "2.0",
            id: 1,
            method,
            params,
        };

        let mut req = self.client.post(&self.url).json(&body);
        if let Some((user, password)) = &self.auth {
            req = req.basic_auth(user, Some(password));
        }

        let resp = req
            .send()
            .map_err(|e| SourceError::Unavailable(format!("HTTP POST {method} failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(SourceError::Unavailable(format!(
                "node returned HTTP status {status} for {method}"
            )));
        }

        let envelope = resp
            .json::<RpcResponse<T>>()
            .map_err(|e| SourceError::Malformed(format!("bad JSON-RPC response: {e}")))?;

        if let Some(err) = envelope.error {
            return Err(SourceError::Malformed(format!(
                "node error for {method}: {} (code {})",
                err.message, err.code
            )));
        }
        envelope
            .result
            .ok_or_else(|| SourceError::Malformed(format!("missing result for {method}")))
    }
}

impl BlockSource for HttpBlockSource {
    fn tip(&self) -> Result<u64, SourceError> {
        self.call("getblockcount", Vec::new())
    }

    fn block_at(&self, height: u64) -> Result<Block, SourceError> {
        self.call("getblock", vec![Value::from(height)])
    }

    fn broadcast(&self, tx: &BlockTx) -> Result<Txid, SourceError> {
        let raw = hex::encode(tx.canonical_bytes());
        let txid_hex: String = self.call("sendrawtransaction", vec![Value::from(raw)])?;

        let bytes = hex::decode(&txid_hex)
            .map_err(|_| SourceError::Malformed("txid is not valid hex".to_string()))?;
        if bytes.len() != crate::types::HASH_LEN {
            return Err(SourceError::Malformed("txid has wrong length".to_string()));
        }
        let mut out = [0u8; crate::types::HASH_LEN];
        out.copy_from_slice(&bytes);
        Ok(Txid(Hash256(out)))
    }
}

/// JSON-RPC request envelope.
#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'a str,
    id: u32,
    method: &'a str,
    params: Vec<Value>,
}

/// JSON-RPC response envelope.
#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcError>,
}

/// JSON-RPC error object.
#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}
