//! OpenAI-compatible chat-completions provider for invoice field extraction.
//!
//! The model is pinned to a fixed-key JSON response (`json_object` response
//! format, low temperature) so downstream parsing never has to guess.

use super::{ExtractionProvider, ProviderError};
use crate::config::OpenAiConfig;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// Fixed schema prompt. Every key must be present in the response; anything
/// the text does not mention is null.
const INVOICE_PARSE_PROMPT: &str = "You are an AI assistant that helps parse invoice information from text.\n\
Return a JSON object with these exact keys:\n\
- invoiceNumber (string)\n\
- invoiceName (string, a short 3-5 word description of the invoice)\n\
- date (string)\n\
- dueDate (string)\n\
- sender (object: { name, address, city, state, zipCode, country, email, phone })\n\
- recipient (object: { name, address, city, state, zipCode, country, email, phone })\n\
- items (array of objects: { description, quantity, rate })\n\
- taxRate (number)\n\
- currency (string)\n\
- notes (string, optional)\n\
- paymentInstructions (string, optional)\n\
- shipping (number, optional)\n\
\n\
If any field is not mentioned in the text, set it to null. Do not use any \
other keys or change the key names. Only return the JSON object.";

const MAX_COMPLETION_TOKENS: i32 = 2000;

/// Low temperature for consistent extraction results.
const TEMPERATURE: f32 = 0.2;

pub struct OpenAiExtractionProvider {
    config: OpenAiConfig,
    client: Client,
}

impl OpenAiExtractionProvider {
    pub fn new(config: OpenAiConfig) -> Self {
        // The adapter enforces its own 15s deadline; this is a backstop so
        // an abandoned call cannot hold a connection forever.
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        Self { config, client }
    }

    fn api_url(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl ExtractionProvider for OpenAiExtractionProvider {
    async fn extract_fields(&self, text: &str) -> Result<String, ProviderError> {
        if self.config.api_key.is_empty() {
            return Err(ProviderError::NotConfigured(
                "OpenAI API key not configured".to_string(),
            ));
        }

        let request = ChatCompletionRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: INVOICE_PARSE_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: text,
                },
            ],
            response_format: ResponseFormat {
                format_type: "json_object",
            },
            max_tokens: MAX_COMPLETION_TOKENS,
            temperature: TEMPERATURE,
        };

        tracing::debug!(
            model = %self.config.model,
            text_len = text.len(),
            "Sending extraction request to model API"
        );

        let response = self
            .client
            .post(self.api_url())
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::NetworkError(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();

            if status.as_u16() == 429 {
                return Err(ProviderError::RateLimited);
            }

            return Err(ProviderError::ApiError(format!(
                "Model API error {}: {}",
                status, error_text
            )));
        }

        let api_response: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::ApiError(format!("Failed to parse response: {}", e)))?;

        api_response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.is_empty())
            .ok_or_else(|| ProviderError::ApiError("Model returned an empty completion".to_string()))
    }
}

// ============================================================================
// Chat-completions API request/response types
// ============================================================================

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    response_format: ResponseFormat,
    max_tokens: i32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}
