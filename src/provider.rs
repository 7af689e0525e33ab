//! Model Provider Abstraction
//!
//! Uniform interface over the text/image generation services. Concrete HTTP clients
//! live in [`openai`] and [`gemini`]; [`gateway`] layers provider selection, per-call
//! timeouts and the single fallback hop on top.

use crate::config::{ProviderConfig, ProvidersConfig};
use crate::error::AutomationError;
use crate::media::ImageBlob;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

pub mod gateway;
pub mod gemini;
pub mod openai;
pub mod parse;

pub use gateway::{ProviderGateway, ProviderMode};
pub use gemini::GeminiClient;
pub use openai::OpenAIClient;

/// Outcome of one logical provider call.
///
/// `Empty` means the provider answered but produced nothing usable; `Failure`
/// covers transport errors, timeouts and malformed replies.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderResult<T> {
    Success(T),
    Empty,
    Failure(String),
}

impl<T> ProviderResult<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, ProviderResult::Success(_))
    }

    pub fn success(self) -> Option<T> {
        match self {
            ProviderResult::Success(value) => Some(value),
            _ => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ProviderResult<U> {
        match self {
            ProviderResult::Success(value) => ProviderResult::Success(f(value)),
            ProviderResult::Empty => ProviderResult::Empty,
            ProviderResult::Failure(reason) => ProviderResult::Failure(reason),
        }
    }

    /// Convert into the error taxonomy, naming the operation in the message.
    pub fn into_result(self, operation: &str) -> Result<T, AutomationError> {
        match self {
            ProviderResult::Success(value) => Ok(value),
            ProviderResult::Empty => Err(AutomationError::ProviderEmpty(operation.to_string())),
            ProviderResult::Failure(reason) => Err(AutomationError::ProviderFailure(format!(
                "{}: {}",
                operation, reason
            ))),
        }
    }
}

/// Chat message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

/// Chat message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }
}

/// Completion options
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionOptions {
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    /// Ask the provider for a JSON-only reply.
    pub json_response: bool,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            temperature: Some(0.7),
            max_tokens: None,
            json_response: false,
        }
    }
}

impl CompletionOptions {
    pub fn json(max_tokens: u32) -> Self {
        Self {
            temperature: Some(0.7),
            max_tokens: Some(max_tokens),
            json_response: true,
        }
    }

    pub fn short_text(max_tokens: u32, temperature: f32) -> Self {
        Self {
            temperature: Some(temperature),
            max_tokens: Some(max_tokens),
            json_response: false,
        }
    }
}

/// Completion response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResponse {
    pub content: String,
    pub model: String,
    pub finish_reason: Option<String>,
}

/// Model provider client trait
#[async_trait]
pub trait ModelProviderClient: Send + Sync {
    /// Generate a completion from a list of messages
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        options: CompletionOptions,
    ) -> Result<CompletionResponse, AutomationError>;

    /// Generate an image; `Ok(None)` when the provider answered without image data.
    async fn generate_image(&self, prompt: &str) -> Result<Option<ImageBlob>, AutomationError>;

    /// Get the provider name
    fn provider_name(&self) -> &str;

    /// Get the model name
    fn model_name(&self) -> &str;
}

/// Concrete provider selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ModelProvider {
    OpenAI {
        model: String,
        api_key: String,
        image_model: Option<String>,
        base_url: Option<String>,
    },
    Gemini {
        model: String,
        api_key: String,
        image_model: Option<String>,
        base_url: Option<String>,
    },
}

impl ModelProvider {
    /// Provider A from config, `None` without an API key.
    pub fn openai_from_config(config: &ProviderConfig) -> Option<Self> {
        let api_key = config.api_key.clone().filter(|_| config.is_configured())?;
        Some(ModelProvider::OpenAI {
            model: config.model.clone(),
            api_key,
            image_model: config.image_model.clone(),
            base_url: config.endpoint.clone(),
        })
    }

    /// Provider B from config, `None` without an API key.
    pub fn gemini_from_config(config: &ProviderConfig) -> Option<Self> {
        let api_key = config.api_key.clone().filter(|_| config.is_configured())?;
        Some(ModelProvider::Gemini {
            model: config.model.clone(),
            api_key,
            image_model: config.image_model.clone(),
            base_url: config.endpoint.clone(),
        })
    }
}

/// Builds provider clients from [`ModelProvider`] descriptions.
pub struct ProviderFactory;

impl ProviderFactory {
    pub fn create_client(
        provider: &ModelProvider,
    ) -> Result<Arc<dyn ModelProviderClient>, AutomationError> {
        match provider {
            ModelProvider::OpenAI {
                model,
                api_key,
                image_model,
                base_url,
            } => Ok(Arc::new(OpenAIClient::new(
                model.clone(),
                api_key.clone(),
                image_model.clone(),
                base_url.clone(),
            )?)),
            ModelProvider::Gemini {
                model,
                api_key,
                image_model,
                base_url,
            } => Ok(Arc::new(GeminiClient::new(
                model.clone(),
                api_key.clone(),
                image_model.clone(),
                base_url.clone(),
            )?)),
        }
    }

    /// Both slots from the providers section; unconfigured slots are `None`.
    #[allow(clippy::type_complexity)]
    pub fn from_config(
        config: &ProvidersConfig,
    ) -> Result<
        (
            Option<Arc<dyn ModelProviderClient>>,
            Option<Arc<dyn ModelProviderClient>>,
        ),
        AutomationError,
    > {
        let primary = ModelProvider::openai_from_config(&config.openai)
            .map(|p| Self::create_client(&p))
            .transpose()?;
        let secondary = ModelProvider::gemini_from_config(&config.gemini)
            .map(|p| Self::create_client(&p))
            .transpose()?;
        Ok((primary, secondary))
    }
}

// Helper function to map HTTP errors to AutomationError
pub(crate) fn map_http_error(error: reqwest::Error) -> AutomationError {
    if let Some(status) = error.status() {
        status_failure(status.as_u16(), &error.to_string())
    } else if error.is_timeout() {
        AutomationError::ProviderFailure(format!("Request timeout: {}", error))
    } else if error.is_connect() {
        AutomationError::ProviderFailure(format!("Connection error: {}", error))
    } else {
        AutomationError::ProviderFailure(format!("HTTP error: {}", error))
    }
}

fn status_failure(status: u16, detail: &str) -> AutomationError {
    match status {
        401 | 403 => AutomationError::ProviderFailure(format!("Authentication failed: {}", detail)),
        429 => AutomationError::ProviderFailure(format!("Rate limit exceeded: {}", detail)),
        404 => AutomationError::ProviderFailure(format!("Model not found: {}", detail)),
        _ => AutomationError::ProviderFailure(format!(
            "Request failed with status {}: {}",
            status, detail
        )),
    }
}

/// Pass successful responses through; turn everything else into a provider failure.
pub(crate) async fn ensure_success(
    response: reqwest::Response,
) -> Result<reqwest::Response, AutomationError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let error_text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    Err(status_failure(status, &error_text))
}

const PROVIDER_HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const PROVIDER_HTTP_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

pub(crate) fn build_provider_http_client() -> Result<Client, AutomationError> {
    build_http_client(PROVIDER_HTTP_REQUEST_TIMEOUT)
}

/// Client whose requests, body included, give up after `request_timeout`.
pub(crate) fn build_http_client(request_timeout: Duration) -> Result<Client, AutomationError> {
    Client::builder()
        .connect_timeout(PROVIDER_HTTP_CONNECT_TIMEOUT.min(request_timeout))
        .timeout(request_timeout)
        .build()
        .map_err(|e| AutomationError::ProviderFailure(format!("Failed to create HTTP client: {}", e)))
}

/// Download a binary payload referenced by URL (image APIs that return links).
pub(crate) async fn download_bytes(
    client: &Client,
    url: &str,
) -> Result<(Vec<u8>, Option<String>), AutomationError> {
    let response = client.get(url).send().await.map_err(map_http_error)?;
    let response = ensure_success(response).await?;
    let mime = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string());
    let bytes = response.bytes().await.map_err(map_http_error)?;
    Ok((bytes.to_vec(), mime))
}
