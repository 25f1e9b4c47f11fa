//! Chat-channel notifications posted to a configured webhook.

use super::{ChatNotifier, InvoiceAction, ProviderError};
use crate::config::SlackConfig;
use crate::models::invoice::Invoice;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};

pub struct SlackNotifier {
    config: SlackConfig,
    client: Client,
}

impl SlackNotifier {
    pub fn new(config: SlackConfig) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .expect("Failed to create HTTP client");

        Self { config, client }
    }
}

#[async_trait]
impl ChatNotifier for SlackNotifier {
    async fn send_blocks(&self, blocks: &Value) -> Result<(), ProviderError> {
        if !self.config.enabled || self.config.webhook_url.is_empty() {
            return Err(ProviderError::NotConfigured(
                "Chat webhook URL not configured".to_string(),
            ));
        }

        let response = self
            .client
            .post(&self.config.webhook_url)
            .json(&json!({ "blocks": blocks }))
            .send()
            .await
            .map_err(|e| ProviderError::NetworkError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ProviderError::ApiError(format!(
                "Chat webhook error: {}",
                response.status()
            )));
        }

        Ok(())
    }
}

/// Build the invoice-event notification blocks: which action happened, plus
/// a sender/recipient contact summary.
pub fn invoice_blocks(invoice: &Invoice, action: InvoiceAction) -> Value {
    json!([
        {
            "type": "header",
            "text": {
                "type": "plain_text",
                "text": "New Invoice Generated!",
                "emoji": true
            }
        },
        {
            "type": "section",
            "text": {
                "type": "mrkdwn",
                "text": format!("*Action:* {}", action.as_label())
            }
        },
        {
            "type": "section",
            "text": {
                "type": "mrkdwn",
                "text": format!(
                    "*Sender Company Information:*\n\u{2022} Name: {}\n\u{2022} Email: {}\n\u{2022} Phone: {}",
                    invoice.sender.name, invoice.sender.email, invoice.sender.phone
                )
            }
        },
        {
            "type": "section",
            "text": {
                "type": "mrkdwn",
                "text": format!(
                    "*Recipient Company Information:*\n\u{2022} Name: {}\n\u{2022} Email: {}\n\u{2022} Phone: {}",
                    invoice.recipient.name, invoice.recipient.email, invoice.recipient.phone
                )
            }
        }
    ])
}

/// Mock chat notifier for tests.
pub struct MockChatNotifier {
    calls: AtomicU64,
    fail: bool,
}

impl MockChatNotifier {
    pub fn new() -> Self {
        Self {
            calls: AtomicU64::new(0),
            fail: false,
        }
    }

    /// Mock whose sends always fail, for best-effort paths.
    pub fn failing() -> Self {
        Self {
            calls: AtomicU64::new(0),
            fail: true,
        }
    }

    pub fn call_count(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for MockChatNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatNotifier for MockChatNotifier {
    async fn send_blocks(&self, _blocks: &Value) -> Result<(), ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(ProviderError::ApiError("mock chat failure".to_string()));
        }
        tracing::info!("[MOCK] Chat notification would be sent");
        Ok(())
    }
}
