use service_core::config as core_config;
use service_core::error::AppError;
use std::env;

/// Default AI extraction quota per window. The production value is
/// environment-driven; this is the conservative fallback.
const DEFAULT_AI_REQUESTS_PER_WINDOW: u32 = 10;

/// Default email quota per window.
const DEFAULT_EMAILS_PER_WINDOW: u32 = 5;

/// Default fixed-window size in seconds (one hour).
const DEFAULT_WINDOW_SECS: u64 = 3600;

#[derive(Debug, Clone)]
pub struct InvoiceConfig {
    pub common: core_config::Config,
    pub openai: OpenAiConfig,
    pub smtp: SmtpConfig,
    pub slack: SlackConfig,
    pub hubspot: HubspotConfig,
    pub limits: RateLimitConfig,
}

#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub enabled: bool,
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub from_email: String,
    pub from_name: String,
    pub enabled: bool,
}

#[derive(Debug, Clone)]
pub struct SlackConfig {
    pub webhook_url: String,
    pub enabled: bool,
}

#[derive(Debug, Clone)]
pub struct HubspotConfig {
    pub portal_id: String,
    pub form_id: String,
    pub enabled: bool,
}

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub ai_requests_per_window: u32,
    pub emails_per_window: u32,
    pub window_secs: u64,
}

impl InvoiceConfig {
    pub fn load() -> Result<Self, AppError> {
        let common_config = core_config::Config::load()?;
        let is_prod = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string()) == "prod";

        Ok(InvoiceConfig {
            common: common_config,
            openai: OpenAiConfig {
                api_key: get_env("OPENAI_API_KEY", Some(""), is_prod)?,
                model: get_env("OPENAI_MODEL", Some("gpt-3.5-turbo"), is_prod)?,
                base_url: get_env("OPENAI_BASE_URL", Some("https://api.openai.com/v1"), is_prod)?,
                enabled: env_flag("OPENAI_ENABLED"),
            },
            smtp: SmtpConfig {
                host: get_env("SMTP_HOST", Some("smtp.gmail.com"), is_prod)?,
                port: get_env("SMTP_PORT", Some("587"), is_prod)?
                    .parse()
                    .unwrap_or(587),
                user: get_env("SMTP_USER", Some(""), is_prod)?,
                password: get_env("SMTP_PASSWORD", Some(""), is_prod)?,
                from_email: get_env("SMTP_FROM_EMAIL", Some("noreply@example.com"), is_prod)?,
                from_name: get_env("SMTP_FROM_NAME", Some("Invoice Generator"), is_prod)?,
                enabled: env_flag("SMTP_ENABLED"),
            },
            slack: SlackConfig {
                webhook_url: get_env("SLACK_WEBHOOK_URL", Some(""), is_prod)?,
                enabled: env_flag("SLACK_ENABLED"),
            },
            hubspot: HubspotConfig {
                portal_id: get_env("HUBSPOT_PORTAL_ID", Some(""), is_prod)?,
                form_id: get_env("HUBSPOT_FORM_ID", Some(""), is_prod)?,
                enabled: env_flag("HUBSPOT_ENABLED"),
            },
            limits: RateLimitConfig {
                ai_requests_per_window: get_env(
                    "AI_REQUESTS_PER_HOUR",
                    Some(&DEFAULT_AI_REQUESTS_PER_WINDOW.to_string()),
                    is_prod,
                )?
                .parse()
                .unwrap_or(DEFAULT_AI_REQUESTS_PER_WINDOW),
                emails_per_window: get_env(
                    "EMAILS_PER_HOUR",
                    Some(&DEFAULT_EMAILS_PER_WINDOW.to_string()),
                    is_prod,
                )?
                .parse()
                .unwrap_or(DEFAULT_EMAILS_PER_WINDOW),
                window_secs: get_env(
                    "RATE_LIMIT_WINDOW_SECS",
                    Some(&DEFAULT_WINDOW_SECS.to_string()),
                    is_prod,
                )?
                .parse()
                .unwrap_or(DEFAULT_WINDOW_SECS),
            },
        })
    }
}

fn env_flag(key: &str) -> bool {
    env::var(key)
        .unwrap_or_else(|_| "false".to_string())
        .parse()
        .unwrap_or(false)
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required in production but not set",
                    key
                )))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required but not set",
                    key
                )))
            }
        }
    }
}
