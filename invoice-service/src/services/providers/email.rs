//! Invoice email dispatch over SMTP, with a mock for tests.

use super::{EmailSender, ProviderError};
use crate::config::SmtpConfig;
use crate::models::currency::format_currency;
use crate::models::invoice::Invoice;
use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Attachment, Mailbox, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

pub struct SmtpSender {
    config: SmtpConfig,
    transport: Option<AsyncSmtpTransport<Tokio1Executor>>,
}

impl SmtpSender {
    pub fn new(config: SmtpConfig) -> Result<Self, ProviderError> {
        if !config.enabled {
            return Ok(Self {
                config,
                transport: None,
            });
        }

        let creds = Credentials::new(config.user.clone(), config.password.clone());

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .map_err(|e| {
                ProviderError::NotConfigured(format!("Failed to create SMTP relay: {}", e))
            })?
            .port(config.port)
            .credentials(creds)
            .build();

        Ok(Self {
            config,
            transport: Some(transport),
        })
    }
}

fn summary_html(invoice: &Invoice) -> String {
    format!(
        r#"<div style="font-family: Arial, sans-serif; padding: 20px;">
  <h1>Your Invoice #{number}</h1>
  <p>Hello from {sender},</p>
  <p>Your invoice has been generated successfully.</p>
  <div style="margin: 20px 0; padding: 20px; border: 1px solid #e5e7eb; border-radius: 5px;">
    <h2>Invoice Summary</h2>
    <p><strong>Invoice Number:</strong> {number}</p>
    <p><strong>Issue Date:</strong> {date}</p>
    <p><strong>Due Date:</strong> {due_date}</p>
    <p><strong>Total Amount:</strong> {total}</p>
  </div>
  <p>Thank you for your business!</p>
</div>"#,
        number = invoice.display_number(),
        sender = invoice.sender.name,
        date = invoice.date.as_deref().unwrap_or("-"),
        due_date = invoice.due_date.as_deref().unwrap_or("-"),
        total = format_currency(invoice.total, &invoice.currency),
    )
}

#[async_trait]
impl EmailSender for SmtpSender {
    async fn send_invoice(
        &self,
        to: &str,
        invoice: &Invoice,
        pdf: &[u8],
    ) -> Result<Option<String>, ProviderError> {
        if !self.config.enabled {
            return Err(ProviderError::NotConfigured(
                "SMTP email provider is not enabled".to_string(),
            ));
        }

        let transport = self.transport.as_ref().ok_or_else(|| {
            ProviderError::NotConfigured("SMTP transport not initialized".to_string())
        })?;

        let from_mailbox: Mailbox =
            format!("{} <{}>", self.config.from_name, self.config.from_email)
                .parse()
                .map_err(|e| {
                    ProviderError::NotConfigured(format!("Invalid from address: {}", e))
                })?;

        let to_mailbox: Mailbox = to
            .parse()
            .map_err(|e| ProviderError::InvalidRecipient(format!("Invalid recipient: {}", e)))?;

        let subject = format!(
            "Invoice #{} from {}",
            invoice.display_number(),
            invoice.sender.name
        );

        let pdf_content_type = ContentType::parse("application/pdf")
            .map_err(|e| ProviderError::SendFailed(format!("Invalid attachment type: {}", e)))?;

        let message = Message::builder()
            .from(from_mailbox)
            .to(to_mailbox)
            .subject(&subject)
            .multipart(
                MultiPart::mixed()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(summary_html(invoice)),
                    )
                    .singlepart(
                        Attachment::new(invoice.pdf_filename())
                            .body(pdf.to_vec(), pdf_content_type),
                    ),
            )
            .map_err(|e| ProviderError::SendFailed(format!("Failed to build message: {}", e)))?;

        let response = transport
            .send(message)
            .await
            .map_err(|e| ProviderError::SendFailed(format!("Failed to send email: {}", e)))?;

        let provider_id = response.message().next().map(|s| s.to_string());

        tracing::info!(
            to = %to,
            subject = %subject,
            pdf_bytes = pdf.len(),
            "Invoice email sent"
        );

        Ok(provider_id)
    }
}

/// Mock email sender for tests.
pub struct MockEmailSender {
    send_count: AtomicU64,
    last_recipient: Mutex<Option<String>>,
}

impl MockEmailSender {
    pub fn new() -> Self {
        Self {
            send_count: AtomicU64::new(0),
            last_recipient: Mutex::new(None),
        }
    }

    pub fn send_count(&self) -> u64 {
        self.send_count.load(Ordering::SeqCst)
    }

    pub fn last_recipient(&self) -> Option<String> {
        self.last_recipient.lock().expect("mock lock").clone()
    }
}

impl Default for MockEmailSender {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmailSender for MockEmailSender {
    async fn send_invoice(
        &self,
        to: &str,
        invoice: &Invoice,
        pdf: &[u8],
    ) -> Result<Option<String>, ProviderError> {
        let n = self.send_count.fetch_add(1, Ordering::SeqCst) + 1;
        *self.last_recipient.lock().expect("mock lock") = Some(to.to_string());

        tracing::info!(
            to = %to,
            invoice_name = %invoice.invoice_name,
            pdf_bytes = pdf.len(),
            "[MOCK] Invoice email would be sent"
        );

        Ok(Some(format!("mock-email-{}", n)))
    }
}
