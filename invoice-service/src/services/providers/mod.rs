//! Outbound provider abstractions and implementations.
//!
//! Every network-facing collaborator (model, SMTP, chat webhook, CRM) sits
//! behind a trait so the pipeline can be exercised against mocks and
//! backends can be swapped without touching the flows.

pub mod chat;
pub mod crm;
pub mod email;
pub mod mock;
pub mod openai;

use crate::models::invoice::Invoice;
use async_trait::async_trait;
use thiserror::Error;

/// Error type for provider operations.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Invalid recipient: {0}")]
    InvalidRecipient(String),

    #[error("Rate limited")]
    RateLimited,

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Send failed: {0}")]
    SendFailed(String),

    #[error("Render failed: {0}")]
    RenderFailed(String),
}

/// User action that triggered a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvoiceAction {
    Download,
    Email,
}

impl InvoiceAction {
    pub fn as_label(&self) -> &'static str {
        match self {
            InvoiceAction::Download => "Downloaded",
            InvoiceAction::Email => "Emailed",
        }
    }
}

/// Model-backed extraction of invoice fields from sanitized free text.
/// Returns the raw JSON payload the model produced.
#[async_trait]
pub trait ExtractionProvider: Send + Sync {
    async fn extract_fields(&self, text: &str) -> Result<String, ProviderError>;
}

/// Invoice email dispatch with the rendered PDF attached.
/// Returns the provider's message id when one is reported.
#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send_invoice(
        &self,
        to: &str,
        invoice: &Invoice,
        pdf: &[u8],
    ) -> Result<Option<String>, ProviderError>;
}

/// Chat-channel notification of invoice events (block payload).
#[async_trait]
pub trait ChatNotifier: Send + Sync {
    async fn send_blocks(&self, blocks: &serde_json::Value) -> Result<(), ProviderError>;
}

/// CRM contact upsert with the invoice's company/address fields.
#[async_trait]
pub trait CrmNotifier: Send + Sync {
    async fn submit_contact(&self, submission: &crm::CrmSubmission) -> Result<(), ProviderError>;
}
