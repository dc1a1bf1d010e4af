pub mod chat;
pub mod tasks;

use axum::{http::StatusCode, Json};
use serde_json::{json, Value};
use std::fmt::Display;

/// Log a server-side failure and hide its details from the client.
pub(crate) fn internal_error(e: impl Display) -> (StatusCode, String) {
    tracing::error!(error = %e, "request failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal server error".to_string(),
    )
}

// GET /api/health
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
