use axum::{extract::State, http::HeaderMap, Json};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use service_core::error::AppError;
use service_core::middleware::rate_limit::client_key;
use validator::Validate;

use crate::dtos::{SendInvoiceEmailRequest, SendInvoiceEmailResponse};
use crate::models::invoice::Invoice;
use crate::startup::AppState;

/// Email the derived invoice, with its PDF attached, to the given recipient.
#[tracing::instrument(skip_all)]
pub async fn send_invoice_email(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<SendInvoiceEmailRequest>,
) -> Result<Json<SendInvoiceEmailResponse>, AppError> {
    request.validate()?;
    request.invoice.validate_domain()?;

    let invoice = Invoice::derive(&request.invoice);

    let pdf_override = match request.pdf_base64.as_deref() {
        Some(encoded) => Some(BASE64.decode(encoded).map_err(|_| {
            AppError::field_validation("pdf", "Invalid PDF payload encoding")
        })?),
        None => None,
    };

    let key = client_key(&headers);
    let session = state.session(&headers, &key);

    let outcome = state
        .pipeline
        .email(
            &invoice,
            &request.recipient_email,
            pdf_override,
            &key,
            &session,
        )
        .await?;

    Ok(Json(SendInvoiceEmailResponse {
        status: "sent".to_string(),
        message_id: outcome.message_id,
    }))
}
