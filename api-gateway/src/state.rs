//! Shared application state.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use namechain::{
    Address, BlockSource, BlockTx, Salt, StateHandle, TxBuilder, TxError, Txid, UtxoProvider,
};

/// Error type surfaced by gateway operations.
///
/// Everything ends up as an `{"error": <string>}` body; this enum keeps
/// the status-code mapping in one place.
#[derive(Debug)]
pub enum GatewayError {
    /// Client-side usage error (bad arguments, unknown name, no funds).
    BadRequest(String),
    /// The engine has not produced a consensus hash yet, or the indexer
    /// is degraded.
    Unavailable(String),
    /// Broadcast or provider failure.
    Upstream(String),
}

impl GatewayError {
    /// Returns the response message.
    pub fn message(&self) -> &str {
        match self {
            GatewayError::BadRequest(msg)
            | GatewayError::Unavailable(msg)
            | GatewayError::Upstream(msg) => msg,
        }
    }
}

impl From<TxError> for GatewayError {
    fn from(e: TxError) -> Self {
        match e {
            TxError::Provider(_) => GatewayError::Upstream(e.to_string()),
            _ => GatewayError::BadRequest(e.to_string()),
        }
    }
}

/// Shared state held by the API handlers and background tasks.
///
/// This is wrapped in an [`Arc`] and passed to request handlers via Axum's
/// `State` extractor. All chain reads go through the [`StateHandle`]
/// published by the driver, so handlers only ever see fully committed
/// snapshots.
pub struct AppState {
    /// Committed-state publication point, shared with the driver.
    pub handle: Arc<StateHandle>,
    /// Block source used to broadcast constructed transactions.
    pub source: Arc<dyn BlockSource + Send + Sync>,
    /// UTXO provider feeding the operation constructor.
    pub utxos: Arc<dyn UtxoProvider + Send + Sync>,
    /// The operation constructor.
    pub builder: TxBuilder,
    /// Salts generated by preorder requests, keyed by the committed name
    /// (or namespace id) and sender address, so the later register or
    /// reveal can reuse them.
    salts: Mutex<HashMap<(String, Address), Salt>>,
}

/// Thread-safe alias for `AppState`.
pub type SharedState = Arc<AppState>;

impl AppState {
    /// Creates the shared state.
    pub fn new(
        handle: Arc<StateHandle>,
        source: Arc<dyn BlockSource + Send + Sync>,
        utxos: Arc<dyn UtxoProvider + Send + Sync>,
    ) -> SharedState {
        Arc::new(Self {
            handle,
            source,
            utxos,
            builder: TxBuilder::default(),
            salts: Mutex::new(HashMap::new()),
        })
    }

    /// Remembers the salt a preorder committed to.
    pub fn remember_salt(&self, name: &str, sender: Address, salt: Salt) {
        self.salts
            .lock()
            .expect("salt cache lock poisoned")
            .insert((name.to_string(), sender), salt);
    }

    /// Returns the salt a previous preorder committed to, if any.
    pub fn recall_salt(&self, name: &str, sender: &Address) -> Option<Salt> {
        self.salts
            .lock()
            .expect("salt cache lock poisoned")
            .get(&(name.to_string(), *sender))
            .copied()
    }

    /// Runs a blocking build closure off the async runtime, then
    /// broadcasts the result.
    ///
    /// Both UTXO lookup and broadcast can do blocking HTTP, so the whole
    /// construction runs on `spawn_blocking`.
    pub async fn build_and_broadcast<F>(
        self: &Arc<Self>,
        build: F,
    ) -> Result<(BlockTx, Txid), GatewayError>
    where
        F: FnOnce(&TxBuilder, &dyn UtxoProvider) -> Result<BlockTx, TxError> + Send + 'static,
    {
        let state = self.clone();
        tokio::task::spawn_blocking(move || {
            let tx = build(&state.builder, state.utxos.as_ref())?;
            let txid = state
                .source
                .broadcast(&tx)
                .map_err(|e| GatewayError::Upstream(format!("broadcast failed: {e}")))?;
            Ok((tx, txid))
        })
        .await
        .map_err(|e| GatewayError::Upstream(format!("constructor task failed: {e}")))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use namechain::{ChainState, HASH160_LEN, Hash160, MemoryBlockSource, SALT_LEN,
        StaticUtxoProvider};

    fn dummy_state() -> SharedState {
        let handle = StateHandle::new(ChainState::genesis(100, 144));
        AppState::new(
            handle,
            Arc::new(MemoryBlockSource::new(100)),
            Arc::new(StaticUtxoProvider::new()),
        )
    }

    #[test]
    fn salt_cache_roundtrips_per_sender() {
        let state = dummy_state();
        let alice = Address(Hash160([1; HASH160_LEN]));
        let bob = Address(Hash160([2; HASH160_LEN]));
        let salt = Salt([7; SALT_LEN]);

        state.remember_salt("alice.id", alice, salt);
        assert_eq!(state.recall_salt("alice.id", &alice), Some(salt));
        assert_eq!(state.recall_salt("alice.id", &bob), None);
        assert_eq!(state.recall_salt("other.id", &alice), None);
    }
}
