use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;
use service_core::middleware::rate_limit::client_key;
use validator::Validate;

use crate::dtos::DownloadInvoiceRequest;
use crate::models::invoice::Invoice;
use crate::startup::AppState;

/// Render the derived invoice to PDF and deliver the binary to the caller.
#[tracing::instrument(skip_all)]
pub async fn download_invoice(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<DownloadInvoiceRequest>,
) -> Result<impl IntoResponse, AppError> {
    request.validate()?;
    request.invoice.validate_domain()?;

    let invoice = Invoice::derive(&request.invoice);

    let key = client_key(&headers);
    let session = state.session(&headers, &key);

    let pdf = state.pipeline.download(&invoice, &session).await?;

    tracing::info!(
        invoice_name = %invoice.invoice_name,
        size = pdf.len(),
        "Invoice PDF generated"
    );

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", invoice.pdf_filename()),
            ),
        ],
        pdf,
    ))
}
