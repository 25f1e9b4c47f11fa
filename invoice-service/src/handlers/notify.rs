use axum::{extract::State, Json};
use serde_json::json;
use service_core::error::AppError;

use crate::dtos::NotifyChatRequest;
use crate::services::providers::crm::CrmSubmission;
use crate::startup::AppState;

/// Forward a block payload to the chat webhook. Unlike the pipeline's
/// best-effort path, failures here surface to the caller.
#[tracing::instrument(skip_all)]
pub async fn notify_chat(
    State(state): State<AppState>,
    Json(request): Json<NotifyChatRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    state
        .chat
        .send_blocks(&request.blocks)
        .await
        .map_err(|e| AppError::UpstreamError(anyhow::Error::new(e)))?;

    Ok(Json(json!({ "success": true })))
}

/// Submit contact/address fields to the CRM form.
#[tracing::instrument(skip_all)]
pub async fn notify_crm(
    State(state): State<AppState>,
    Json(submission): Json<CrmSubmission>,
) -> Result<Json<serde_json::Value>, AppError> {
    state
        .crm
        .submit_contact(&submission)
        .await
        .map_err(|e| AppError::UpstreamError(anyhow::Error::new(e)))?;

    Ok(Json(json!({ "success": true })))
}
