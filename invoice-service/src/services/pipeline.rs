//! The invoice action pipeline.
//!
//! `download` and `email` are the only two triggers. Both record the event
//! best-effort to chat and CRM before any PDF or email work happens, so
//! attempted sends stay visible even when PDF generation later fails.
//! Notification failures are logged and swallowed; PDF and email failures
//! surface with distinguishable error classes. Nothing retries
//! automatically.

use crate::models::invoice::Invoice;
use crate::services::metrics;
use crate::services::pdf::PdfRenderer;
use crate::services::providers::{
    chat, crm::CrmSubmission, ChatNotifier, CrmNotifier, EmailSender, InvoiceAction,
};
use service_core::error::AppError;
use service_core::middleware::rate_limit::FixedWindowLimiter;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use validator::ValidateEmail;

/// Hard ceiling on the rendered PDF, checked before any network call.
pub const MAX_PDF_BYTES: usize = 10 * 1024 * 1024;

pub const PDF_RENDER_TIMEOUT: Duration = Duration::from_secs(30);

pub const EMAIL_SEND_TIMEOUT: Duration = Duration::from_secs(15);

/// Once-per-session notification flags for one action. A flag is raised only
/// after a successful attempt, so a failed best-effort notification may be
/// retried by the user's next click.
#[derive(Debug, Default)]
pub struct ActionFlags {
    chat_notified: AtomicBool,
    crm_notified: AtomicBool,
}

/// Per-session pipeline state. The download and email actions keep
/// independent flags.
#[derive(Debug, Default)]
pub struct SessionState {
    pub download: ActionFlags,
    pub email: ActionFlags,
}

#[derive(Debug)]
pub struct EmailOutcome {
    pub message_id: Option<String>,
}

pub struct NotificationPipeline {
    chat: Arc<dyn ChatNotifier>,
    crm: Arc<dyn CrmNotifier>,
    email: Arc<dyn EmailSender>,
    pdf: Arc<dyn PdfRenderer>,
    email_limiter: Arc<FixedWindowLimiter>,
}

impl NotificationPipeline {
    pub fn new(
        chat: Arc<dyn ChatNotifier>,
        crm: Arc<dyn CrmNotifier>,
        email: Arc<dyn EmailSender>,
        pdf: Arc<dyn PdfRenderer>,
        email_limiter: Arc<FixedWindowLimiter>,
    ) -> Self {
        Self {
            chat,
            crm,
            email,
            pdf,
            email_limiter,
        }
    }

    /// Download action: record the event best-effort, then render the PDF
    /// for delivery to the caller.
    pub async fn download(
        &self,
        invoice: &Invoice,
        session: &SessionState,
    ) -> Result<Vec<u8>, AppError> {
        self.notify_best_effort(invoice, InvoiceAction::Download, &session.download)
            .await;
        self.render_pdf(invoice).await
    }

    /// Email action: validate the recipient, record the event best-effort,
    /// obtain and bound the PDF, then dispatch under the email quota.
    ///
    /// `pdf_override` carries a client-rendered PDF when one was supplied;
    /// it is subject to the same size ceiling.
    pub async fn email(
        &self,
        invoice: &Invoice,
        recipient: &str,
        pdf_override: Option<Vec<u8>>,
        caller_key: &str,
        session: &SessionState,
    ) -> Result<EmailOutcome, AppError> {
        let recipient = recipient.trim();
        if recipient.is_empty() {
            return Err(AppError::field_validation(
                "email",
                "Recipient email is required",
            ));
        }
        if !recipient.validate_email() {
            return Err(AppError::field_validation("email", "Invalid email format"));
        }

        // Attempted sends are recorded even if PDF generation fails below.
        self.notify_best_effort(invoice, InvoiceAction::Email, &session.email)
            .await;

        let pdf = match pdf_override {
            Some(bytes) => bytes,
            None => self.render_pdf(invoice).await?,
        };

        if pdf.len() > MAX_PDF_BYTES {
            metrics::EMAILS_TOTAL.with_label_values(&["too_large"]).inc();
            return Err(AppError::PayloadTooLarge(
                "PDF file size exceeds maximum allowed (10MB)".to_string(),
            ));
        }

        if !self.email_limiter.check_and_consume(caller_key) {
            metrics::EMAILS_TOTAL
                .with_label_values(&["rate_limited"])
                .inc();
            return Err(AppError::RateLimitExceeded {
                retry_after: self.email_limiter.retry_after_secs(caller_key),
            });
        }

        let send = self.email.send_invoice(recipient, invoice, &pdf);
        match tokio::time::timeout(EMAIL_SEND_TIMEOUT, send).await {
            Err(_) => {
                metrics::EMAILS_TOTAL.with_label_values(&["timeout"]).inc();
                Err(AppError::TimeoutError("Email request".to_string()))
            }
            Ok(Err(e)) => {
                metrics::EMAILS_TOTAL.with_label_values(&["failed"]).inc();
                tracing::error!(error = %e, to = %recipient, "Failed to send invoice email");
                Err(AppError::EmailError(e.to_string()))
            }
            Ok(Ok(message_id)) => {
                metrics::EMAILS_TOTAL.with_label_values(&["sent"]).inc();
                tracing::info!(to = %recipient, "Invoice email sent");
                Ok(EmailOutcome { message_id })
            }
        }
    }

    /// Render under the hard ceiling. The render runs on the blocking pool;
    /// on timeout its result is discarded, not cancelled.
    async fn render_pdf(&self, invoice: &Invoice) -> Result<Vec<u8>, AppError> {
        let renderer = self.pdf.clone();
        let invoice = invoice.clone();
        let render = tokio::task::spawn_blocking(move || renderer.render(&invoice));

        match tokio::time::timeout(PDF_RENDER_TIMEOUT, render).await {
            Err(_) => {
                metrics::PDF_RENDERS_TOTAL
                    .with_label_values(&["timeout"])
                    .inc();
                Err(AppError::PdfGenerationTimeout)
            }
            Ok(Err(join_err)) => {
                metrics::PDF_RENDERS_TOTAL
                    .with_label_values(&["failed"])
                    .inc();
                Err(AppError::InternalError(anyhow::anyhow!(
                    "PDF render task failed: {}",
                    join_err
                )))
            }
            Ok(Ok(Err(e))) => {
                metrics::PDF_RENDERS_TOTAL
                    .with_label_values(&["failed"])
                    .inc();
                tracing::error!(error = %e, "PDF rendering failed");
                Err(AppError::InternalError(anyhow::Error::new(e)))
            }
            Ok(Ok(Ok(bytes))) => {
                metrics::PDF_RENDERS_TOTAL.with_label_values(&["ok"]).inc();
                Ok(bytes)
            }
        }
    }

    async fn notify_best_effort(
        &self,
        invoice: &Invoice,
        action: InvoiceAction,
        flags: &ActionFlags,
    ) {
        if !flags.chat_notified.load(Ordering::SeqCst) {
            let blocks = chat::invoice_blocks(invoice, action);
            match self.chat.send_blocks(&blocks).await {
                Ok(()) => {
                    flags.chat_notified.store(true, Ordering::SeqCst);
                    metrics::NOTIFICATIONS_TOTAL
                        .with_label_values(&["chat", "ok"])
                        .inc();
                }
                Err(e) => {
                    metrics::NOTIFICATIONS_TOTAL
                        .with_label_values(&["chat", "failed"])
                        .inc();
                    tracing::warn!(
                        error = %e,
                        action = action.as_label(),
                        "Chat notification failed"
                    );
                }
            }
        }

        if !flags.crm_notified.load(Ordering::SeqCst) {
            let submission = CrmSubmission::from_invoice(invoice);
            match self.crm.submit_contact(&submission).await {
                Ok(()) => {
                    flags.crm_notified.store(true, Ordering::SeqCst);
                    metrics::NOTIFICATIONS_TOTAL
                        .with_label_values(&["crm", "ok"])
                        .inc();
                }
                Err(e) => {
                    metrics::NOTIFICATIONS_TOTAL
                        .with_label_values(&["crm", "failed"])
                        .inc();
                    tracing::warn!(
                        error = %e,
                        action = action.as_label(),
                        "CRM notification failed"
                    );
                }
            }
        }
    }
}
