//! Mock extraction provider for tests and unconfigured deployments.

use super::{ExtractionProvider, ProviderError};
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};

/// Fixed-key payload with every field null, matching the response contract.
const ALL_NULL_RESPONSE: &str = r#"{
    "invoiceNumber": null,
    "invoiceName": null,
    "date": null,
    "dueDate": null,
    "sender": null,
    "recipient": null,
    "items": null,
    "taxRate": null,
    "currency": null,
    "notes": null,
    "paymentInstructions": null,
    "shipping": null
}"#;

pub struct MockExtractionProvider {
    response: String,
    calls: AtomicU64,
}

impl MockExtractionProvider {
    /// Mock that finds nothing in any text.
    pub fn new() -> Self {
        Self::with_response(ALL_NULL_RESPONSE)
    }

    /// Mock that returns a fixed raw payload.
    pub fn with_response(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            calls: AtomicU64::new(0),
        }
    }

    pub fn call_count(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for MockExtractionProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ExtractionProvider for MockExtractionProvider {
    async fn extract_fields(&self, _text: &str) -> Result<String, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tracing::info!("[MOCK] Extraction request served with canned payload");
        Ok(self.response.clone())
    }
}
