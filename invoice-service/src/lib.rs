pub mod config;
pub mod dtos;
pub mod handlers;
pub mod models;
pub mod services;
pub mod startup;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    middleware::from_fn,
    routing::{get, post},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::{
    security_headers::security_headers_middleware, tracing::request_id_middleware,
};
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::startup::AppState;

/// Request body ceiling: a base64-encoded 10MB PDF plus form fields.
const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

/// Preflight cache hint (24 hours).
const CORS_MAX_AGE_SECS: u64 = 86_400;

pub fn build_router(state: AppState) -> Result<Router, AppError> {
    let allowed_origin = state
        .config
        .common
        .allowed_origin
        .parse::<HeaderValue>()
        .map_err(|e| {
            AppError::ConfigError(anyhow::anyhow!(
                "Invalid CORS origin '{}': {}",
                state.config.common.allowed_origin,
                e
            ))
        })?;

    let cors = CorsLayer::new()
        .allow_origin(allowed_origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .max_age(Duration::from_secs(CORS_MAX_AGE_SECS));

    let app = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/metrics", get(handlers::health::metrics_endpoint))
        .route("/extract-invoice", post(handlers::extract::extract_invoice))
        .route(
            "/send-invoice-email",
            post(handlers::email::send_invoice_email),
        )
        .route(
            "/download-invoice",
            post(handlers::download::download_invoice),
        )
        .route(
            "/validate-logo-file",
            post(handlers::logo::validate_logo_file),
        )
        .route("/notify-chat", post(handlers::notify::notify_chat))
        .route("/notify-crm", post(handlers::notify::notify_crm))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                )
            }),
        )
        .layer(from_fn(request_id_middleware))
        .layer(from_fn(security_headers_middleware))
        .layer(cors)
        .with_state(state);

    Ok(app)
}
