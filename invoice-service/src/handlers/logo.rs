use axum::{extract::Multipart, Json};
use service_core::error::AppError;

use crate::dtos::ValidateLogoResponse;
use crate::services::file_signature;

/// Validate an uploaded logo image before the form embeds it.
#[tracing::instrument(skip_all)]
pub async fn validate_logo_file(
    mut multipart: Multipart,
) -> Result<Json<ValidateLogoResponse>, AppError> {
    let field = multipart
        .next_field()
        .await
        .map_err(|e| {
            AppError::BadRequest(anyhow::anyhow!("Failed to read multipart field: {}", e))
        })?
        .ok_or_else(|| AppError::field_validation("file", "No file provided"))?;

    let declared_type = field
        .content_type()
        .unwrap_or("application/octet-stream")
        .to_string();

    let data = field
        .bytes()
        .await
        .map_err(|e| AppError::BadRequest(anyhow::anyhow!("Failed to read file bytes: {}", e)))?;

    let validated = file_signature::validate(&data, &declared_type)?;

    tracing::info!(
        declared = %declared_type,
        resolved = %validated.resolved_type,
        size = validated.size,
        "Logo file validated"
    );

    Ok(Json(ValidateLogoResponse {
        valid: true,
        file_type: validated.resolved_type.to_string(),
        size: validated.size,
    }))
}
