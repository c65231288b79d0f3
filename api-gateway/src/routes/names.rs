//! Name lookup, status, and constructor routes.

use axum::{Json, extract::Path, extract::State, http::StatusCode};
use rand::RngCore;
use serde::{Deserialize, Serialize};

use namechain::types::ops::split_name;
use namechain::{NameRecord, SALT_LEN, Salt, name_price};

use crate::state::SharedState;

use super::{ApiError, TxResponse, api_error, parse_privkey, require_live_engine};

/// Serialized form of a name record.
#[derive(Debug, Serialize)]
pub struct NameRecordResponse {
    pub name: String,
    /// Hex-encoded owning address.
    pub owner: String,
    /// Hex-encoded data hash, if one is set.
    pub data_hash: Option<String>,
    pub registered_at: u64,
    pub expires_at: u64,
    pub namespace_id: String,
    pub revoked: bool,
}

impl NameRecordResponse {
    fn from_record(name: &str, record: &NameRecord) -> Self {
        Self {
            name: name.to_string(),
            owner: record.owner.to_hex(),
            data_hash: record.data_hash.as_ref().map(|h| h.to_hex()),
            registered_at: record.registered_at,
            expires_at: record.expires_at,
            namespace_id: record.namespace_id.clone(),
            revoked: record.revoked,
        }
    }
}

/// `GET /names/{name}`
///
/// Looks up a live (registered, unexpired) name in the committed snapshot.
pub async fn lookup(
    State(state): State<SharedState>,
    Path(name): Path<String>,
) -> Result<Json<NameRecordResponse>, ApiError> {
    let committed = state.handle.committed();
    match committed.db.lookup(&name, committed.height) {
        Some(record) => Ok(Json(NameRecordResponse::from_record(&name, record))),
        None => Err(api_error(StatusCode::NOT_FOUND, "Not found")),
    }
}

/// `GET /info` response body.
#[derive(Debug, Serialize)]
pub struct InfoResponse {
    /// Height of the last committed block.
    pub blocks: u64,
    /// Hex of the current consensus hash, absent before the first seal.
    pub consensus: Option<String>,
}

/// `GET /info`
///
/// Returns the committed height and the current consensus hash.
pub async fn getinfo(State(state): State<SharedState>) -> Json<InfoResponse> {
    let committed = state.handle.committed();
    Json(InfoResponse {
        blocks: committed.height,
        consensus: committed.current_consensus().map(|ch| ch.to_hex()),
    })
}

/// Request body shared by routes that only need a name and a key.
#[derive(Debug, Deserialize)]
pub struct NameKeyRequest {
    pub name: String,
    pub privkey: String,
}

/// Request body for `POST /names/update`.
#[derive(Debug, Deserialize)]
pub struct UpdateRequest {
    pub name: String,
    /// Hex-encoded 20-byte data hash.
    pub data_hash: String,
    pub privkey: String,
}

/// Request body for `POST /names/transfer`.
#[derive(Debug, Deserialize)]
pub struct TransferRequest {
    pub name: String,
    /// Hex-encoded recipient address.
    pub address: String,
    pub keep_data: bool,
    pub privkey: String,
}

fn random_salt() -> Salt {
    let mut bytes = [0u8; SALT_LEN];
    rand::thread_rng().fill_bytes(&mut bytes);
    Salt(bytes)
}

fn require_not_degraded(state: &SharedState) -> Result<(), ApiError> {
    if state.handle.is_degraded() {
        return Err(api_error(
            StatusCode::SERVICE_UNAVAILABLE,
            "Indexer halted; constructor requests unavailable",
        ));
    }
    Ok(())
}

/// `POST /names/preorder`
///
/// Commits to a name without disclosing it. Generates and caches the salt
/// so the later register can reuse it, and burns the name price.
pub async fn preorder(
    State(state): State<SharedState>,
    Json(body): Json<NameKeyRequest>,
) -> Result<Json<TxResponse>, ApiError> {
    let consensus = require_live_engine(&state)?;
    let key = parse_privkey(&body.privkey)?;

    let committed = state.handle.committed();
    if committed.db.is_name_registered(&body.name, committed.height) {
        return Err(api_error(StatusCode::BAD_REQUEST, "Name already registered"));
    }
    let Some((_, ns_id)) = split_name(&body.name) else {
        return Err(api_error(StatusCode::BAD_REQUEST, "Name has no namespace"));
    };
    let Some(namespace) = committed.db.get_namespace(ns_id) else {
        return Err(api_error(StatusCode::BAD_REQUEST, "Namespace not found"));
    };
    let price = name_price(namespace, &body.name);

    let salt = random_salt();
    let sender = key.address();
    let name = body.name.clone();
    let (tx, txid) = state
        .build_and_broadcast(move |builder, utxos| {
            builder.preorder(&name, &salt, &consensus, price, &key, utxos)
        })
        .await?;

    state.remember_salt(&body.name, sender, salt);
    tracing::debug!(name = %body.name, txid = %txid.to_hex(), "preorder");

    Ok(Json(TxResponse {
        transaction: hex::encode(tx.canonical_bytes()),
        txid: txid.to_hex(),
        salt: Some(salt.to_hex()),
    }))
}

/// `POST /names/register`
///
/// Discloses a previously preordered name, using the cached salt.
pub async fn register(
    State(state): State<SharedState>,
    Json(body): Json<NameKeyRequest>,
) -> Result<Json<TxResponse>, ApiError> {
    require_not_degraded(&state)?;
    let key = parse_privkey(&body.privkey)?;

    let committed = state.handle.committed();
    if committed.db.is_name_registered(&body.name, committed.height) {
        return Err(api_error(StatusCode::BAD_REQUEST, "Name already registered"));
    }
    let Some(salt) = state.recall_salt(&body.name, &key.address()) else {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "No preorder salt for this name; preorder it first",
        ));
    };

    let name = body.name.clone();
    let (tx, txid) = state
        .build_and_broadcast(move |builder, utxos| builder.register(&name, &salt, &key, utxos))
        .await?;
    tracing::debug!(name = %body.name, txid = %txid.to_hex(), "register");

    Ok(Json(TxResponse {
        transaction: hex::encode(tx.canonical_bytes()),
        txid: txid.to_hex(),
        salt: None,
    }))
}

/// `POST /names/update`
///
/// Attaches a new data hash to a name the sender owns.
pub async fn update(
    State(state): State<SharedState>,
    Json(body): Json<UpdateRequest>,
) -> Result<Json<TxResponse>, ApiError> {
    require_not_degraded(&state)?;
    let key = parse_privkey(&body.privkey)?;
    let data_hash = namechain::Hash160::from_hex(&body.data_hash)
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, format!("invalid data hash: {e}")))?;

    let name = body.name.clone();
    let (tx, txid) = state
        .build_and_broadcast(move |builder, utxos| builder.update(&name, &data_hash, &key, utxos))
        .await?;
    tracing::debug!(name = %body.name, txid = %txid.to_hex(), "update");

    Ok(Json(TxResponse {
        transaction: hex::encode(tx.canonical_bytes()),
        txid: txid.to_hex(),
        salt: None,
    }))
}

/// `POST /names/transfer`
///
/// Moves a name to a new owner, optionally dropping its data hash.
pub async fn transfer(
    State(state): State<SharedState>,
    Json(body): Json<TransferRequest>,
) -> Result<Json<TxResponse>, ApiError> {
    require_not_degraded(&state)?;
    let key = parse_privkey(&body.privkey)?;
    let recipient = namechain::Address::from_hex(&body.address)
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, format!("invalid address: {e}")))?;

    let name = body.name.clone();
    let keep_data = body.keep_data;
    let (tx, txid) = state
        .build_and_broadcast(move |builder, utxos| {
            builder.transfer(&name, &recipient, keep_data, &key, utxos)
        })
        .await?;
    tracing::debug!(name = %body.name, txid = %txid.to_hex(), "transfer");

    Ok(Json(TxResponse {
        transaction: hex::encode(tx.canonical_bytes()),
        txid: txid.to_hex(),
        salt: None,
    }))
}

/// `POST /names/renew`
///
/// Extends the expiration of a name the sender owns, burning the current
/// name price. On the wire a renewal is a register of the existing name.
pub async fn renew(
    State(state): State<SharedState>,
    Json(body): Json<NameKeyRequest>,
) -> Result<Json<TxResponse>, ApiError> {
    require_not_degraded(&state)?;
    let key = parse_privkey(&body.privkey)?;

    let committed = state.handle.committed();
    let Some(record) = committed.db.lookup(&body.name, committed.height) else {
        return Err(api_error(StatusCode::BAD_REQUEST, "Name not registered"));
    };
    let Some(namespace) = committed.db.get_namespace(&record.namespace_id) else {
        return Err(api_error(StatusCode::BAD_REQUEST, "Namespace not found"));
    };
    let price = name_price(namespace, &body.name);

    let name = body.name.clone();
    let (tx, txid) = state
        .build_and_broadcast(move |builder, utxos| builder.renew(&name, price, &key, utxos))
        .await?;
    tracing::debug!(name = %body.name, txid = %txid.to_hex(), "renew");

    Ok(Json(TxResponse {
        transaction: hex::encode(tx.canonical_bytes()),
        txid: txid.to_hex(),
        salt: None,
    }))
}

/// `POST /names/revoke`
///
/// Revokes a name and clears its data.
pub async fn revoke(
    State(state): State<SharedState>,
    Json(body): Json<NameKeyRequest>,
) -> Result<Json<TxResponse>, ApiError> {
    require_not_degraded(&state)?;
    let key = parse_privkey(&body.privkey)?;

    let name = body.name.clone();
    let (tx, txid) = state
        .build_and_broadcast(move |builder, utxos| builder.revoke(&name, &key, utxos))
        .await?;
    tracing::debug!(name = %body.name, txid = %txid.to_hex(), "revoke");

    Ok(Json(TxResponse {
        transaction: hex::encode(tx.canonical_bytes()),
        txid: txid.to_hex(),
        salt: None,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::AppState;
    use namechain::codec::parse_payload;
    use namechain::db::records::{NamespaceRecord, NamespaceState};
    use namechain::{
        Address, ChainState, HASH160_LEN, Hash160, MemoryBlockSource, NameOperation, PrivateKey,
        StateHandle, StaticUtxoProvider,
    };
    use std::sync::Arc;

    /// Committed state at height 104 with a ready namespace "id" and one
    /// registered name "taken.id".
    fn seeded_state(owner: &PrivateKey) -> ChainState {
        let mut state = ChainState::genesis(100, 144);
        for h in 100..=104 {
            state.tape.seal(h, &h.to_be_bytes());
        }
        state.height = 104;
        state.db.namespaces.insert(
            "id".to_string(),
            NamespaceRecord {
                creator: Address(Hash160([9; HASH160_LEN])),
                lifetime: 1_000,
                base_cost: 25_600,
                cost_decay_ppm: 500_000,
                state: NamespaceState::Ready,
                reveal_height: 10,
                ready_height: Some(20),
            },
        );
        state.db.names.insert(
            "taken.id".to_string(),
            namechain::NameRecord {
                owner: owner.address(),
                data_hash: None,
                registered_at: 101,
                expires_at: 1_101,
                namespace_id: "id".to_string(),
                revoked: false,
                fingerprint: Hash160([3; HASH160_LEN]),
            },
        );
        state
    }

    fn gateway(
        state: ChainState,
    ) -> (SharedState, Arc<MemoryBlockSource>, Arc<StaticUtxoProvider>) {
        let handle = StateHandle::new(state);
        let source = Arc::new(MemoryBlockSource::new(100));
        let utxos = Arc::new(StaticUtxoProvider::new());
        let app = AppState::new(handle, source.clone(), utxos.clone());
        (app, source, utxos)
    }

    fn privkey_hex(byte: u8) -> String {
        hex::encode([byte; 32])
    }

    #[tokio::test]
    async fn lookup_finds_live_names_only() {
        let owner = PrivateKey::from_hex(&privkey_hex(1)).unwrap();
        let (app, _source, _utxos) = gateway(seeded_state(&owner));

        let found = lookup(State(app.clone()), Path("taken.id".to_string()))
            .await
            .expect("lookup should succeed");
        assert_eq!(found.0.owner, owner.address().to_hex());
        assert_eq!(found.0.expires_at, 1_101);

        let (status, Json(body)) = lookup(State(app), Path("free.id".to_string()))
            .await
            .unwrap_err();
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.error, "Not found");
    }

    #[tokio::test]
    async fn getinfo_reports_height_and_consensus() {
        let owner = PrivateKey::from_hex(&privkey_hex(1)).unwrap();
        let (app, _source, _utxos) = gateway(seeded_state(&owner));

        let info = getinfo(State(app)).await;
        assert_eq!(info.0.blocks, 104);
        assert!(info.0.consensus.is_some());
    }

    #[tokio::test]
    async fn preorder_then_register_reuses_the_cached_salt() {
        let owner = PrivateKey::from_hex(&privkey_hex(1)).unwrap();
        let (app, source, utxos) = gateway(seeded_state(&owner));
        utxos.fund(owner.address(), 10_000_000);

        let resp = preorder(
            State(app.clone()),
            Json(NameKeyRequest {
                name: "alice.id".to_string(),
                privkey: privkey_hex(1),
            }),
        )
        .await
        .expect("preorder should succeed");
        let salt_hex = resp.0.salt.clone().expect("preorder returns its salt");

        let resp = register(
            State(app),
            Json(NameKeyRequest {
                name: "alice.id".to_string(),
                privkey: privkey_hex(1),
            }),
        )
        .await
        .expect("register should succeed");

        // Both transactions were broadcast, and the register disclosed the
        // same salt the preorder committed to.
        let broadcasts = source.broadcasts();
        assert_eq!(broadcasts.len(), 2);
        let register_tx = &broadcasts[1];
        assert_eq!(hex::encode(register_tx.canonical_bytes()), resp.0.transaction);
        match parse_payload(register_tx.payload().unwrap()).unwrap() {
            NameOperation::Register(r) => {
                assert_eq!(r.name, "alice.id");
                assert_eq!(r.salt.to_hex(), salt_hex);
            }
            other => panic!("unexpected operation: {other:?}"),
        }
    }

    #[tokio::test]
    async fn preorder_requires_a_consensus_hash() {
        let (app, _source, _utxos) = gateway(ChainState::genesis(100, 144));

        let (_, Json(body)) = preorder(
            State(app),
            Json(NameKeyRequest {
                name: "alice.id".to_string(),
                privkey: privkey_hex(1),
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(body.error, "Nameset snapshot not found");
    }

    #[tokio::test]
    async fn preorder_refuses_taken_names() {
        let owner = PrivateKey::from_hex(&privkey_hex(1)).unwrap();
        let (app, _source, _utxos) = gateway(seeded_state(&owner));

        let (_, Json(body)) = preorder(
            State(app),
            Json(NameKeyRequest {
                name: "taken.id".to_string(),
                privkey: privkey_hex(2),
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(body.error, "Name already registered");
    }

    #[tokio::test]
    async fn register_without_preorder_salt_is_refused() {
        let owner = PrivateKey::from_hex(&privkey_hex(1)).unwrap();
        let (app, _source, _utxos) = gateway(seeded_state(&owner));

        let (_, Json(body)) = register(
            State(app),
            Json(NameKeyRequest {
                name: "alice.id".to_string(),
                privkey: privkey_hex(1),
            }),
        )
        .await
        .unwrap_err();
        assert!(body.error.contains("No preorder salt"));
    }

    #[tokio::test]
    async fn degraded_mode_refuses_constructors_but_serves_lookups() {
        let owner = PrivateKey::from_hex(&privkey_hex(1)).unwrap();
        let (app, _source, utxos) = gateway(seeded_state(&owner));
        utxos.fund(owner.address(), 10_000_000);
        app.handle.set_degraded();

        let (status, _) = revoke(
            State(app.clone()),
            Json(NameKeyRequest {
                name: "taken.id".to_string(),
                privkey: privkey_hex(1),
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

        // Reads still come from the last good snapshot.
        let found = lookup(State(app), Path("taken.id".to_string())).await;
        assert!(found.is_ok());
    }
}
