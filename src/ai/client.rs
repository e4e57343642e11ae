//! Model Invoker
//!
//! Issues one completion request per call to an OpenAI-compatible endpoint
//! and returns the raw assistant content, not yet guaranteed to be valid
//! JSON. This layer performs no JSON repair and no retries; it only
//! enforces the timeout boundary and surfaces transport failures as typed
//! external-service errors the orchestrator can classify.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::timeout::with_timeout;
use crate::config::LlmConfig;
use crate::types::{Result, RfqError};

/// Provider name used in logs and error records.
const PROVIDER: &str = "groq";

/// One completion call against a named model.
///
/// Implemented by the production [`GroqClient`] and by mock clients in
/// cascade tests.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Issue a single completion request and return the raw assistant
    /// message content, unmodified.
    async fn complete(&self, model: &str, prompt: &str) -> Result<String>;

    /// Provider name for logging and error records.
    fn provider(&self) -> &str;
}

/// Groq chat-completions client with secure API key handling.
pub struct GroqClient {
    /// API key stored securely - never exposed in logs or debug output
    api_key: SecretString,
    api_base: String,
    temperature: f32,
    max_tokens: usize,
    top_p: f32,
    timeout: Duration,
    http: reqwest::Client,
}

impl std::fmt::Debug for GroqClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroqClient")
            .field("api_key", &"[REDACTED]")
            .field("api_base", &self.api_base)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("top_p", &self.top_p)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl GroqClient {
    /// Build a client for one extraction call. The timeout is caller
    /// supplied; credentials are per call, never global state.
    pub fn new(config: &LlmConfig, api_key: SecretString, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| RfqError::service(PROVIDER, format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            api_key,
            api_base: config.api_base.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            top_p: config.top_p,
            timeout,
            http,
        })
    }

    fn build_request(&self, model: &str, prompt: &str) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: model.to_string(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: super::prompt::SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: prompt.to_string(),
                },
            ],
            temperature: self.temperature,
            max_completion_tokens: self.max_tokens,
            top_p: self.top_p,
            response_format: ResponseFormat {
                format_type: "json_object".to_string(),
            },
        }
    }

    async fn send(&self, model: &str, prompt: &str) -> Result<String> {
        let request = self.build_request(model, prompt);
        let url = format!("{}/chat/completions", self.api_base);

        debug!(model, "Sending completion request");

        let response = self
            .http
            .post(&url)
            .header(
                "Authorization",
                format!("Bearer {}", self.api_key.expose_secret()),
            )
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| RfqError::service(PROVIDER, format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let status_text = status.canonical_reason().unwrap_or("unknown");
            let body = response.text().await.unwrap_or_default();
            let details: Option<Value> = serde_json::from_str(&body).ok();

            // The provider's JSON-validation failure carries the generation
            // it rejected; hand that to the repair engine downstream instead
            // of failing the attempt outright.
            if let Some(failed) = failed_generation(details.as_ref()) {
                warn!(model, "Provider rejected its own JSON output, salvaging failed_generation");
                return Ok(failed.to_string());
            }

            return Err(RfqError::service_with_status(
                PROVIDER,
                format!("Error {}: {}", status.as_u16(), status_text),
                status.as_u16(),
                details,
            ));
        }

        let envelope: ChatCompletionResponse = response.json().await.map_err(|e| {
            RfqError::service(PROVIDER, format!("malformed response envelope: {}", e))
        })?;

        let content = envelope
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| RfqError::service(PROVIDER, "no content in response"))?;

        Ok(content)
    }
}

#[async_trait]
impl CompletionClient for GroqClient {
    async fn complete(&self, model: &str, prompt: &str) -> Result<String> {
        info!(
            model,
            timeout_ms = self.timeout.as_millis() as u64,
            "Invoking completion model"
        );
        with_timeout(self.timeout, self.send(model, prompt), PROVIDER).await
    }

    fn provider(&self) -> &str {
        PROVIDER
    }
}

/// Pull `error.failed_generation` out of a provider error body when the
/// error code marks a JSON-validation failure.
fn failed_generation(details: Option<&Value>) -> Option<&str> {
    let error = details?.get("error")?;
    if error.get("code")?.as_str()? != "json_validate_failed" {
        return None;
    }
    error.get("failed_generation")?.as_str()
}

// Request/Response types

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_completion_tokens: usize,
    top_p: f32,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}
