use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

use crate::services::metrics::get_metrics;

/// Health check endpoint for liveness probes. The service holds no
/// stateful backends, so being able to answer is being healthy.
pub async fn health_check() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "status": "ok",
            "service": "invoice-service",
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}

pub async fn metrics_endpoint() -> impl IntoResponse {
    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        get_metrics(),
    )
}
