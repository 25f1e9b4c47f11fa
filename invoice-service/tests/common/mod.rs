//! Shared test harness: spawns the application on a random port with mock
//! providers and hands back handles to them for assertions.

use invoice_service::config::{
    HubspotConfig, InvoiceConfig, OpenAiConfig, RateLimitConfig, SlackConfig, SmtpConfig,
};
use invoice_service::services::pdf::{InvoicePdfRenderer, PdfRenderer};
use invoice_service::services::providers::chat::MockChatNotifier;
use invoice_service::services::providers::crm::MockCrmNotifier;
use invoice_service::services::providers::email::MockEmailSender;
use invoice_service::services::providers::mock::MockExtractionProvider;
use invoice_service::startup::{Application, Providers};
use service_core::config::Config as CommonConfig;
use std::sync::Arc;

pub struct TestOptions {
    pub extraction: MockExtractionProvider,
    pub pdf: Arc<dyn PdfRenderer>,
    pub ai_requests_per_window: u32,
    pub emails_per_window: u32,
}

impl Default for TestOptions {
    fn default() -> Self {
        Self {
            extraction: MockExtractionProvider::new(),
            pdf: Arc::new(InvoicePdfRenderer),
            ai_requests_per_window: 100,
            emails_per_window: 100,
        }
    }
}

pub struct TestApp {
    pub address: String,
    pub client: reqwest::Client,
    pub email: Arc<MockEmailSender>,
    pub chat: Arc<MockChatNotifier>,
    pub crm: Arc<MockCrmNotifier>,
}

impl TestApp {
    pub async fn spawn() -> TestApp {
        Self::spawn_with(TestOptions::default()).await
    }

    pub async fn spawn_with(options: TestOptions) -> TestApp {
        let config = test_config(options.ai_requests_per_window, options.emails_per_window);

        let email = Arc::new(MockEmailSender::new());
        let chat = Arc::new(MockChatNotifier::new());
        let crm = Arc::new(MockCrmNotifier::new());

        let providers = Providers {
            extraction: Arc::new(options.extraction),
            email: email.clone(),
            chat: chat.clone(),
            crm: crm.clone(),
            pdf: options.pdf,
        };

        let app = Application::build_with_providers(config, providers)
            .await
            .expect("Failed to build application");
        let port = app.port();
        tokio::spawn(app.run_until_stopped());

        TestApp {
            address: format!("http://127.0.0.1:{}", port),
            client: reqwest::Client::new(),
            email,
            chat,
            crm,
        }
    }
}

fn test_config(ai_requests_per_window: u32, emails_per_window: u32) -> InvoiceConfig {
    InvoiceConfig {
        common: CommonConfig {
            port: 0,
            log_level: "info".to_string(),
            allowed_origin: "http://localhost:3000".to_string(),
        },
        openai: OpenAiConfig {
            api_key: String::new(),
            model: "gpt-3.5-turbo".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            enabled: false,
        },
        smtp: SmtpConfig {
            host: "localhost".to_string(),
            port: 587,
            user: String::new(),
            password: String::new(),
            from_email: "noreply@example.com".to_string(),
            from_name: "Invoice Generator".to_string(),
            enabled: false,
        },
        slack: SlackConfig {
            webhook_url: String::new(),
            enabled: false,
        },
        hubspot: HubspotConfig {
            portal_id: String::new(),
            form_id: String::new(),
            enabled: false,
        },
        limits: RateLimitConfig {
            ai_requests_per_window,
            emails_per_window,
            window_secs: 3600,
        },
    }
}

/// A complete, valid invoice form payload in the wire format.
pub fn sample_invoice_json() -> serde_json::Value {
    serde_json::json!({
        "invoiceNumber": "INV-1001",
        "invoiceName": null,
        "date": "2026-08-01",
        "dueDate": "2026-09-01",
        "sender": {
            "name": "Acme Consulting",
            "email": "billing@acme.test",
            "address": "1 Main St",
            "city": "Springfield",
            "postalCode": "12345",
            "country": "US",
            "state": "IL",
            "phone": "+1 555 0100"
        },
        "recipient": {
            "name": "Client Co",
            "email": "accounts@client.test",
            "address": "9 Market Ave",
            "city": "Shelbyville",
            "postalCode": "54321",
            "country": "US",
            "state": "IL",
            "phone": "+1 555 0101"
        },
        "items": [
            { "description": "Consulting", "quantity": 10, "rate": 100 }
        ],
        "taxRate": 8,
        "shipping": 25,
        "currency": "USD"
    })
}
