use axum::{extract::State, http::HeaderMap, Json};
use service_core::error::AppError;
use service_core::middleware::rate_limit::client_key;

use crate::dtos::ExtractRequest;
use crate::models::parsed::ParsedInvoice;
use crate::startup::AppState;

/// Extract structured invoice fields from free text.
///
/// The quota is consumed before any processing so the model is never called
/// for an over-quota caller.
#[tracing::instrument(skip_all)]
pub async fn extract_invoice(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<ExtractRequest>,
) -> Result<Json<ParsedInvoice>, AppError> {
    let key = client_key(&headers);
    if !state.ai_limiter.check_and_consume(&key) {
        tracing::warn!(caller = %key, "Extraction rate limit exceeded");
        return Err(AppError::RateLimitExceeded {
            retry_after: state.ai_limiter.retry_after_secs(&key),
        });
    }

    let parsed = state.extraction.extract(&request.text).await?;
    Ok(Json(parsed))
}
