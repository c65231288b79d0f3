//! HTTP UTXO provider client.
//!
//! Talks to an indexing service exposing a JSON API of the form:
//!
//! ```json
//! POST /utxos
//! {"address": "hex-encoded-address"}
//!
//! Response:
//! [
//!   {"txid": "hex-encoded-txid", "vout": 0, "value": 150000}
//! ]
//! ```
//!
//! Uses the blocking `reqwest` client; async callers should wrap calls in
//! `spawn_blocking`.

use std::time::Duration;

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

use super::utxo::{Utxo, UtxoProvider};
use super::TxError;
use crate::types::{Address, HASH_LEN, Hash256, Txid};

/// HTTP-based implementation of [`UtxoProvider`].
pub struct HttpUtxoProvider {
    base_url: String,
    credentials: Option<String>,
    client: Client,
}

impl HttpUtxoProvider {
    /// Constructs a provider pointing at `base_url`.
    ///
    /// A non-empty `credentials` string is sent as a bearer token.
    pub fn new(
        base_url: impl Into<String>,
        credentials: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, TxError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TxError::Provider(format!("failed to build HTTP client: {e}")))?;

        let credentials = credentials.into();
        Ok(Self {
            base_url: base_url.into(),
            credentials: (!credentials.is_empty()).then_some(credentials),
            client,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

/// Request payload sent to the UTXO service.
#[derive(Debug, Serialize)]
struct UtxoRequest {
    /// Hex-encoded address.
    address: String,
}

/// One spendable output in the service's response.
#[derive(Debug, Deserialize)]
struct UtxoEntry {
    txid: String,
    vout: u32,
    value: u64,
}

impl UtxoEntry {
    fn into_utxo(self) -> Result<Utxo, TxError> {
        let bytes = hex::decode(&self.txid)
            .map_err(|_| TxError::Provider("txid is not valid hex".to_string()))?;
        if bytes.len() != HASH_LEN {
            return Err(TxError::Provider("txid has wrong length".to_string()));
        }
        let mut out = [0u8; HASH_LEN];
        out.copy_from_slice(&bytes);
        Ok(Utxo {
            txid: Txid(Hash256(out)),
            vout: self.vout,
            value: self.value,
        })
    }
}

impl UtxoProvider for HttpUtxoProvider {
    fn utxos(&self, address: &Address) -> Result<Vec<Utxo>, TxError> {
        let url = self.endpoint("/utxos");
        let body = UtxoRequest {
            address: address.to_hex(),
        };

        let mut req = self.client.post(&url).json(&body);
        if let Some(token) = &self.credentials {
            req = req.bearer_auth(token);
        }

        let resp = req
            .send()
            .map_err(|e| TxError::Provider(format!("HTTP POST {url} failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(TxError::Provider(format!(
                "UTXO service returned HTTP status {status}"
            )));
        }

        let entries = resp
            .json::<Vec<UtxoEntry>>()
            .map_err(|e| TxError::Provider(format!("failed to parse JSON response: {e}")))?;

        entries.into_iter().map(UtxoEntry::into_utxo).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utxo_entries_deserialize_and_convert() {
        let json = format!(
            r#"[{{"txid": "{}", "vout": 1, "value": 150000}}]"#,
            "ab".repeat(HASH_LEN)
        );
        let entries: Vec<UtxoEntry> = serde_json::from_str(&json).expect("entries should parse");
        assert_eq!(entries.len(), 1);

        let utxo = entries
            .into_iter()
            .next()
            .unwrap()
            .into_utxo()
            .expect("entry should convert");
        assert_eq!(utxo.vout, 1);
        assert_eq!(utxo.value, 150_000);
    }

    #[test]
    fn bad_txid_hex_is_a_provider_error() {
        let entry = UtxoEntry {
            txid: "zz".to_string(),
            vout: 0,
            value: 1,
        };
        assert!(matches!(entry.into_utxo(), Err(TxError::Provider(_))));
    }
}
