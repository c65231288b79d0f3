//! HTTP route handlers.

use axum::Json;
use axum::http::StatusCode;
use serde::Serialize;

use namechain::PrivateKey;

use crate::state::{GatewayError, SharedState};

pub mod health;
pub mod names;
pub mod namespaces;

/// Error body shared by every route: `{"error": "..."}`.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// The uniform error type returned by handlers.
pub type ApiError = (StatusCode, Json<ErrorResponse>);

pub(crate) fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

impl From<GatewayError> for ApiError {
    fn from(e: GatewayError) -> Self {
        let status = match &e {
            GatewayError::BadRequest(_) => StatusCode::BAD_REQUEST,
            GatewayError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            GatewayError::Upstream(_) => StatusCode::BAD_GATEWAY,
        };
        api_error(status, e.message())
    }
}

/// Response body for every constructor route.
#[derive(Debug, Serialize)]
pub struct TxResponse {
    /// Hex encoding of the signed transaction's canonical bytes.
    pub transaction: String,
    /// Id the transaction was broadcast under.
    pub txid: String,
    /// Salt the operation committed to (preorders only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub salt: Option<String>,
}

/// Parses a hex private key from a request body.
pub(crate) fn parse_privkey(hex_str: &str) -> Result<PrivateKey, ApiError> {
    PrivateKey::from_hex(hex_str)
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, format!("invalid private key: {e}")))
}

/// Rejects constructor requests while the indexer is degraded, and
/// returns the live consensus hash needed by commitment-bearing
/// operations.
pub(crate) fn require_live_engine(
    state: &SharedState,
) -> Result<namechain::ConsensusHash, ApiError> {
    if state.handle.is_degraded() {
        return Err(api_error(
            StatusCode::SERVICE_UNAVAILABLE,
            "Indexer halted; constructor requests unavailable",
        ));
    }
    state
        .handle
        .committed()
        .current_consensus()
        .ok_or_else(|| api_error(StatusCode::SERVICE_UNAVAILABLE, "Nameset snapshot not found"))
}
