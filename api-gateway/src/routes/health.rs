use axum::{Json, http::StatusCode};
use serde::Serialize;

/// `GET /ping` response body.
#[derive(Serialize)]
pub struct PingResponse {
    pub status: &'static str,
}

/// `GET /ping`
///
/// Returns a basic JSON document indicating liveness.
pub async fn ping() -> (StatusCode, Json<PingResponse>) {
    (StatusCode::OK, Json(PingResponse { status: "alive" }))
}
