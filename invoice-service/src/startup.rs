//! Application startup and lifecycle management.

use crate::config::InvoiceConfig;
use crate::services::pdf::{InvoicePdfRenderer, PdfRenderer};
use crate::services::pipeline::{NotificationPipeline, SessionState};
use crate::services::providers::chat::{MockChatNotifier, SlackNotifier};
use crate::services::providers::crm::{HubspotNotifier, MockCrmNotifier};
use crate::services::providers::email::{MockEmailSender, SmtpSender};
use crate::services::providers::mock::MockExtractionProvider;
use crate::services::providers::openai::OpenAiExtractionProvider;
use crate::services::providers::{ChatNotifier, CrmNotifier, EmailSender, ExtractionProvider};
use crate::services::ExtractionService;
use axum::http::HeaderMap;
use dashmap::DashMap;
use service_core::error::AppError;
use service_core::middleware::rate_limit::FixedWindowLimiter;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;

/// Cap on tracked sessions. The flags are transient; dropping them only
/// risks a duplicate notification, never a lost invoice.
const MAX_TRACKED_SESSIONS: usize = 10_000;

/// The pipeline's outbound collaborators, injectable for tests.
pub struct Providers {
    pub extraction: Arc<dyn ExtractionProvider>,
    pub email: Arc<dyn EmailSender>,
    pub chat: Arc<dyn ChatNotifier>,
    pub crm: Arc<dyn CrmNotifier>,
    pub pdf: Arc<dyn PdfRenderer>,
}

impl Providers {
    /// Wire real providers from configuration, falling back to mocks for
    /// anything disabled or misconfigured.
    pub fn from_config(config: &InvoiceConfig) -> Self {
        let extraction: Arc<dyn ExtractionProvider> =
            if config.openai.enabled && !config.openai.api_key.is_empty() {
                tracing::info!(model = %config.openai.model, "Model extraction provider initialized");
                Arc::new(OpenAiExtractionProvider::new(config.openai.clone()))
            } else {
                tracing::info!("Extraction provider disabled, using mock");
                Arc::new(MockExtractionProvider::new())
            };

        let email: Arc<dyn EmailSender> = if config.smtp.enabled {
            match SmtpSender::new(config.smtp.clone()) {
                Ok(provider) => {
                    tracing::info!("SMTP email provider initialized");
                    Arc::new(provider)
                }
                Err(e) => {
                    tracing::warn!("Failed to initialize SMTP provider: {}. Using mock.", e);
                    Arc::new(MockEmailSender::new())
                }
            }
        } else {
            tracing::info!("SMTP provider disabled, using mock email sender");
            Arc::new(MockEmailSender::new())
        };

        let chat: Arc<dyn ChatNotifier> =
            if config.slack.enabled && !config.slack.webhook_url.is_empty() {
                tracing::info!("Chat webhook notifier initialized");
                Arc::new(SlackNotifier::new(config.slack.clone()))
            } else {
                tracing::info!("Chat notifier disabled, using mock");
                Arc::new(MockChatNotifier::new())
            };

        let crm: Arc<dyn CrmNotifier> =
            if config.hubspot.enabled && !config.hubspot.portal_id.is_empty() {
                tracing::info!("CRM forms notifier initialized");
                Arc::new(HubspotNotifier::new(config.hubspot.clone()))
            } else {
                tracing::info!("CRM notifier disabled, using mock");
                Arc::new(MockCrmNotifier::new())
            };

        Self {
            extraction,
            email,
            chat,
            crm,
            pdf: Arc::new(InvoicePdfRenderer),
        }
    }
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: InvoiceConfig,
    pub extraction: ExtractionService,
    pub pipeline: Arc<NotificationPipeline>,
    pub chat: Arc<dyn ChatNotifier>,
    pub crm: Arc<dyn CrmNotifier>,
    pub ai_limiter: Arc<FixedWindowLimiter>,
    pub sessions: Arc<DashMap<String, Arc<SessionState>>>,
}

impl AppState {
    /// Resolve the notification-flag state for this request's session:
    /// the `x-session-id` header when the form supplies one, the caller key
    /// otherwise.
    pub fn session(&self, headers: &HeaderMap, fallback_key: &str) -> Arc<SessionState> {
        if self.sessions.len() >= MAX_TRACKED_SESSIONS {
            self.sessions.clear();
        }

        let id = headers
            .get("x-session-id")
            .and_then(|v| v.to_str().ok())
            .filter(|s| !s.is_empty())
            .unwrap_or(fallback_key);

        self.sessions
            .entry(id.to_string())
            .or_insert_with(Default::default)
            .clone()
    }
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    router: axum::Router,
}

impl Application {
    /// Build the application with providers wired from configuration.
    pub async fn build(config: InvoiceConfig) -> Result<Self, AppError> {
        let providers = Providers::from_config(&config);
        Self::build_with_providers(config, providers).await
    }

    /// Build the application with explicitly supplied providers.
    pub async fn build_with_providers(
        config: InvoiceConfig,
        providers: Providers,
    ) -> Result<Self, AppError> {
        let window = Duration::from_secs(config.limits.window_secs);
        let ai_limiter = Arc::new(FixedWindowLimiter::new(
            config.limits.ai_requests_per_window,
            window,
        ));
        let email_limiter = Arc::new(FixedWindowLimiter::new(
            config.limits.emails_per_window,
            window,
        ));

        let pipeline = Arc::new(NotificationPipeline::new(
            providers.chat.clone(),
            providers.crm.clone(),
            providers.email.clone(),
            providers.pdf.clone(),
            email_limiter,
        ));

        let state = AppState {
            config: config.clone(),
            extraction: ExtractionService::new(providers.extraction.clone()),
            pipeline,
            chat: providers.chat.clone(),
            crm: providers.crm.clone(),
            ai_limiter,
            sessions: Arc::new(DashMap::new()),
        };

        let router = crate::build_router(state)?;

        // Port 0 binds a random port for testing.
        let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind TCP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!("Listening on port {}", port);

        Ok(Self {
            port,
            listener,
            router,
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Run the application until stopped or signalled.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
