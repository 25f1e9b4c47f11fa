use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {message}")]
    ValidationError {
        /// Form field the error maps to, when it maps to one.
        field: Option<String>,
        message: String,
    },

    #[error("Validation error: {0}")]
    SchemaError(#[from] validator::ValidationErrors),

    #[error("Bad request: {0}")]
    BadRequest(anyhow::Error),

    #[error("Too many requests")]
    RateLimitExceeded { retry_after: Option<u64> },

    #[error("Request timed out: {0}")]
    TimeoutError(String),

    #[error("PDF generation timed out")]
    PdfGenerationTimeout,

    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("Upstream error: {0}")]
    UpstreamError(anyhow::Error),

    #[error("Email error: {0}")]
    EmailError(String),

    #[error("Internal server error: {0}")]
    InternalError(#[from] anyhow::Error),

    #[error("Configuration error: {0}")]
    ConfigError(anyhow::Error),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::ValidationError {
            field: None,
            message: message.into(),
        }
    }

    pub fn field_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        AppError::ValidationError {
            field: Some(field.into()),
            message: message.into(),
        }
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::ConfigError(anyhow::Error::new(err))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::InternalError(anyhow::Error::new(err))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            error: String,
            #[serde(skip_serializing_if = "Option::is_none")]
            details: Option<String>,
            #[serde(skip_serializing_if = "Option::is_none")]
            field: Option<String>,
        }

        let (status, error_message, details, field, retry_after) = match self {
            AppError::ValidationError { field, message } => {
                (StatusCode::BAD_REQUEST, message, None, field, None)
            }
            AppError::SchemaError(err) => (
                StatusCode::BAD_REQUEST,
                "Validation error".to_string(),
                Some(err.to_string()),
                None,
                None,
            ),
            AppError::BadRequest(err) => {
                (StatusCode::BAD_REQUEST, err.to_string(), None, None, None)
            }
            AppError::RateLimitExceeded { retry_after } => (
                StatusCode::TOO_MANY_REQUESTS,
                "Rate limit exceeded. Please try again later.".to_string(),
                None,
                None,
                retry_after,
            ),
            AppError::TimeoutError(what) => (
                StatusCode::REQUEST_TIMEOUT,
                format!("{} timed out. Please try again.", what),
                None,
                None,
                None,
            ),
            AppError::PdfGenerationTimeout => (
                StatusCode::REQUEST_TIMEOUT,
                "PDF generation timed out. Your invoice may be too complex.".to_string(),
                None,
                None,
                None,
            ),
            AppError::PayloadTooLarge(what) => {
                (StatusCode::PAYLOAD_TOO_LARGE, what, None, None, None)
            }
            AppError::UpstreamError(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Upstream service error".to_string(),
                Some(err.to_string()),
                None,
                None,
            ),
            AppError::EmailError(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Email error".to_string(),
                Some(msg),
                None,
                None,
            ),
            AppError::InternalError(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
                Some(format!("{:#}", err)),
                None,
                None,
            ),
            AppError::ConfigError(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Configuration error".to_string(),
                Some(err.to_string()),
                None,
                None,
            ),
        };

        let mut res = (
            status,
            Json(ErrorResponse {
                error: error_message,
                details,
                field,
            }),
        )
            .into_response();

        if let Some(retry) = retry_after {
            res.headers_mut()
                .insert(axum::http::header::RETRY_AFTER, retry.into());
        }

        res
    }
}
