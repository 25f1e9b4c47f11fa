//! Request/response DTOs for the invoice HTTP API.

use crate::models::invoice::InvoiceForm;
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Deserialize)]
pub struct ExtractRequest {
    pub text: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SendInvoiceEmailRequest {
    #[validate(nested)]
    pub invoice: InvoiceForm,
    /// Validated in the pipeline so the failure maps to the email field.
    pub recipient_email: String,
    /// Optional client-rendered PDF; decoded and size-checked in place of
    /// server-side rendering.
    pub pdf_base64: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendInvoiceEmailResponse {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct DownloadInvoiceRequest {
    #[validate(nested)]
    pub invoice: InvoiceForm,
}

#[derive(Debug, Serialize)]
pub struct ValidateLogoResponse {
    pub valid: bool,
    #[serde(rename = "type")]
    pub file_type: String,
    pub size: usize,
}

#[derive(Debug, Deserialize)]
pub struct NotifyChatRequest {
    pub blocks: serde_json::Value,
}
