//! CRM contact submission via a forms-API endpoint.
//!
//! The payload mirrors the CRM form's own field names (a mix of bare and
//! `recipient_`-prefixed keys), so the submission lands in the existing form.

use super::{CrmNotifier, ProviderError};
use crate::config::HubspotConfig;
use crate::models::invoice::Invoice;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::atomic::{AtomicU64, Ordering};

const FORMS_API_BASE: &str = "https://api.hsforms.com/submissions/v3/integration/submit";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CrmContact {
    pub company: String,
    pub email: String,
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address2: Option<String>,
    pub city: String,
    #[serde(rename = "postalCode")]
    pub postal_code: String,
    pub phone: String,
    pub recipient_company: String,
    pub recipient_email: String,
    pub recipient_address_1: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipient_address_2: Option<String>,
    pub recipient_city: String,
    pub recipient_postal_code: String,
    pub recipient_phone: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CrmContext {
    pub page_uri: String,
    pub page_name: String,
}

impl Default for CrmContext {
    fn default() -> Self {
        Self {
            page_uri: String::new(),
            page_name: "Invoice Generator".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CrmSubmission {
    #[serde(flatten)]
    pub contact: CrmContact,
    #[serde(default)]
    pub context: CrmContext,
}

impl CrmSubmission {
    pub fn from_invoice(invoice: &Invoice) -> Self {
        let sender = &invoice.sender;
        let recipient = &invoice.recipient;
        Self {
            contact: CrmContact {
                company: sender.name.clone(),
                email: sender.email.clone(),
                address: sender.address.clone(),
                address2: sender.address2.clone(),
                city: sender.city.clone(),
                postal_code: sender.postal_code.clone(),
                phone: sender.phone.clone(),
                recipient_company: recipient.name.clone(),
                recipient_email: recipient.email.clone(),
                recipient_address_1: recipient.address.clone(),
                recipient_address_2: recipient.address2.clone(),
                recipient_city: recipient.city.clone(),
                recipient_postal_code: recipient.postal_code.clone(),
                recipient_phone: recipient.phone.clone(),
            },
            context: CrmContext::default(),
        }
    }

    /// Transform the contact fields into the forms API's `fields` array,
    /// skipping empty values.
    fn form_fields(&self) -> Vec<serde_json::Value> {
        let object = match serde_json::to_value(&self.contact) {
            Ok(serde_json::Value::Object(map)) => map,
            _ => return Vec::new(),
        };

        object
            .into_iter()
            .filter(|(_, value)| value.as_str().is_some_and(|v| !v.is_empty()))
            .map(|(name, value)| json!({ "name": name, "value": value }))
            .collect()
    }
}

pub struct HubspotNotifier {
    config: HubspotConfig,
    client: Client,
}

impl HubspotNotifier {
    pub fn new(config: HubspotConfig) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .expect("Failed to create HTTP client");

        Self { config, client }
    }

    fn api_url(&self) -> String {
        format!(
            "{}/{}/{}",
            FORMS_API_BASE, self.config.portal_id, self.config.form_id
        )
    }
}

#[async_trait]
impl CrmNotifier for HubspotNotifier {
    async fn submit_contact(&self, submission: &CrmSubmission) -> Result<(), ProviderError> {
        if !self.config.enabled
            || self.config.portal_id.is_empty()
            || self.config.form_id.is_empty()
        {
            return Err(ProviderError::NotConfigured(
                "CRM portal/form ids not configured".to_string(),
            ));
        }

        let payload = json!({
            "fields": submission.form_fields(),
            "context": submission.context,
        });

        let response = self
            .client
            .post(self.api_url())
            .json(&payload)
            .send()
            .await
            .map_err(|e| ProviderError::NetworkError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ProviderError::ApiError(format!(
                "CRM API error: {}",
                response.status()
            )));
        }

        Ok(())
    }
}

/// Mock CRM notifier for tests.
pub struct MockCrmNotifier {
    calls: AtomicU64,
    fail: bool,
}

impl MockCrmNotifier {
    pub fn new() -> Self {
        Self {
            calls: AtomicU64::new(0),
            fail: false,
        }
    }

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

impl Default for MockCrmNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CrmNotifier for MockCrmNotifier {
    async fn submit_contact(&self, _submission: &CrmSubmission) -> Result<(), ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(ProviderError::ApiError("mock CRM failure".to_string()));
        }
        tracing::info!("[MOCK] CRM contact submission would be sent");
        Ok(())
    }
}
