//! Namespace lifecycle constructor routes.

use axum::{Json, extract::State, http::StatusCode};
use rand::RngCore;
use serde::Deserialize;

use namechain::{SALT_LEN, Salt};

use crate::state::SharedState;

use super::{ApiError, TxResponse, api_error, parse_privkey, require_live_engine};

/// Request body for `POST /namespaces/preorder` and `/namespaces/ready`.
#[derive(Debug, Deserialize)]
pub struct NamespaceKeyRequest {
    pub namespace: String,
    pub privkey: String,
}

/// Request body for `POST /namespaces/reveal`.
#[derive(Debug, Deserialize)]
pub struct RevealRequest {
    pub namespace: String,
    /// Name lifetime in blocks.
    pub lifetime: u32,
    /// Base name cost in satoshis.
    pub base_cost: u32,
    /// Cost decay rate per extra character, e.g. `0.25`.
    pub cost_decay: f64,
    pub privkey: String,
}

fn random_salt() -> Salt {
    let mut bytes = [0u8; SALT_LEN];
    rand::thread_rng().fill_bytes(&mut bytes);
    Salt(bytes)
}

/// `POST /namespaces/preorder`
///
/// Commits to a namespace id without disclosing it, burning the flat
/// namespace price.
pub async fn preorder(
    State(state): State<SharedState>,
    Json(body): Json<NamespaceKeyRequest>,
) -> Result<Json<TxResponse>, ApiError> {
    let consensus = require_live_engine(&state)?;
    let key = parse_privkey(&body.privkey)?;

    let committed = state.handle.committed();
    if committed.db.get_namespace(&body.namespace).is_some() {
        return Err(api_error(StatusCode::BAD_REQUEST, "Namespace already exists"));
    }

    let salt = random_salt();
    let sender = key.address();
    let namespace = body.namespace.clone();
    let (tx, txid) = state
        .build_and_broadcast(move |builder, utxos| {
            builder.namespace_preorder(&namespace, &salt, &consensus, &key, utxos)
        })
        .await?;

    state.remember_salt(&body.namespace, sender, salt);
    tracing::debug!(namespace = %body.namespace, txid = %txid.to_hex(), "namespace_preorder");

    Ok(Json(TxResponse {
        transaction: hex::encode(tx.canonical_bytes()),
        txid: txid.to_hex(),
        salt: Some(salt.to_hex()),
    }))
}

/// `POST /namespaces/reveal`
///
/// Discloses a preordered namespace and fixes its pricing parameters.
/// The decay rate is carried on-chain in millionths.
pub async fn reveal(
    State(state): State<SharedState>,
    Json(body): Json<RevealRequest>,
) -> Result<Json<TxResponse>, ApiError> {
    require_live_engine(&state)?;
    let key = parse_privkey(&body.privkey)?;

    if !(body.cost_decay.is_finite() && body.cost_decay >= 0.0) {
        return Err(api_error(StatusCode::BAD_REQUEST, "Invalid cost decay rate"));
    }
    let cost_decay_ppm = (body.cost_decay * 1_000_000.0).round();
    if cost_decay_ppm > f64::from(u32::MAX) {
        return Err(api_error(StatusCode::BAD_REQUEST, "Cost decay rate too large"));
    }
    let cost_decay_ppm = cost_decay_ppm as u32;

    let Some(salt) = state.recall_salt(&body.namespace, &key.address()) else {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "No preorder salt for this namespace; preorder it first",
        ));
    };

    let namespace = body.namespace.clone();
    let lifetime = body.lifetime;
    let base_cost = body.base_cost;
    let (tx, txid) = state
        .build_and_broadcast(move |builder, utxos| {
            builder.namespace_reveal(
                &namespace,
                &salt,
                lifetime,
                base_cost,
                cost_decay_ppm,
                &key,
                utxos,
            )
        })
        .await?;
    tracing::debug!(
        namespace = %body.namespace,
        lifetime,
        base_cost,
        cost_decay_ppm,
        txid = %txid.to_hex(),
        "namespace_reveal"
    );

    Ok(Json(TxResponse {
        transaction: hex::encode(tx.canonical_bytes()),
        txid: txid.to_hex(),
        salt: None,
    }))
}

/// `POST /namespaces/ready`
///
/// Opens a revealed namespace to registrations from anyone.
pub async fn ready(
    State(state): State<SharedState>,
    Json(body): Json<NamespaceKeyRequest>,
) -> Result<Json<TxResponse>, ApiError> {
    require_live_engine(&state)?;
    let key = parse_privkey(&body.privkey)?;

    let namespace = body.namespace.clone();
    let (tx, txid) = state
        .build_and_broadcast(move |builder, utxos| builder.namespace_ready(&namespace, &key, utxos))
        .await?;
    tracing::debug!(namespace = %body.namespace, txid = %txid.to_hex(), "namespace_ready");

    Ok(Json(TxResponse {
        transaction: hex::encode(tx.canonical_bytes()),
        txid: txid.to_hex(),
        salt: None,
    }))
}
