//! OpenAI chat-completions and images client.

use super::{
    build_provider_http_client, download_bytes, ensure_success, map_http_error, ChatMessage,
    CompletionOptions, CompletionResponse, MessageRole, ModelProviderClient,
};
use crate::error::AutomationError;
use crate::media::ImageBlob;
use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_IMAGE_MODEL: &str = "gpt-image-1";
const IMAGE_SIZE: &str = "1536x1024";

#[derive(Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Serialize, Deserialize)]
struct OpenAIMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    model: String,
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: OpenAIMessage,
    finish_reason: Option<String>,
}

#[derive(Serialize)]
struct ImageRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    size: &'static str,
    n: u8,
}

#[derive(Deserialize)]
struct ImageResponse {
    #[serde(default)]
    data: Vec<ImageDatum>,
}

#[derive(Deserialize)]
struct ImageDatum {
    b64_json: Option<String>,
    url: Option<String>,
}

fn role_to_string(role: MessageRole) -> &'static str {
    match role {
        MessageRole::System => "system",
        MessageRole::User => "user",
        MessageRole::Assistant => "assistant",
    }
}

/// OpenAI provider client
pub struct OpenAIClient {
    client: Client,
    model: String,
    image_model: String,
    api_key: String,
    base_url: String,
}

impl OpenAIClient {
    pub fn new(
        model: String,
        api_key: String,
        image_model: Option<String>,
        base_url: Option<String>,
    ) -> Result<Self, AutomationError> {
        let client = build_provider_http_client()?;
        let base_url = base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            client,
            model,
            image_model: image_model.unwrap_or_else(|| DEFAULT_IMAGE_MODEL.to_string()),
            api_key,
            base_url,
        })
    }
}

#[async_trait]
impl ModelProviderClient for OpenAIClient {
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        options: CompletionOptions,
    ) -> Result<CompletionResponse, AutomationError> {
        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages: messages
                .into_iter()
                .map(|msg| OpenAIMessage {
                    role: role_to_string(msg.role).to_string(),
                    content: Some(msg.content),
                })
                .collect(),
            temperature: options.temperature,
            max_tokens: options.max_tokens,
            response_format: options
                .json_response
                .then_some(ResponseFormat { kind: "json_object" }),
        };

        let url = format!("{}/chat/completions", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(map_http_error)?;
        let response = ensure_success(response).await?;

        let completion: ChatCompletionResponse = response.json().await.map_err(|e| {
            AutomationError::ProviderFailure(format!("Failed to parse response: {}", e))
        })?;

        let choice = completion
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AutomationError::ProviderFailure("No choices in response".to_string()))?;

        debug!(provider = "openai", model = %completion.model, "Completion received");
        Ok(CompletionResponse {
            content: choice.message.content.unwrap_or_default(),
            model: completion.model,
            finish_reason: choice.finish_reason,
        })
    }

    async fn generate_image(&self, prompt: &str) -> Result<Option<ImageBlob>, AutomationError> {
        let url = format!("{}/images/generations", self.base_url);
        let request = ImageRequest {
            model: &self.image_model,
            prompt,
            size: IMAGE_SIZE,
            n: 1,
        };
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(map_http_error)?;
        let response = ensure_success(response).await?;
        let parsed: ImageResponse = response.json().await.map_err(|e| {
            AutomationError::ProviderFailure(format!("Failed to parse image response: {}", e))
        })?;

        let Some(datum) = parsed.data.into_iter().next() else {
            return Ok(None);
        };
        if let Some(encoded) = datum.b64_json.filter(|s| !s.is_empty()) {
            let bytes = base64::engine::general_purpose::STANDARD
                .decode(encoded.as_bytes())
                .map_err(|e| {
                    AutomationError::ProviderFailure(format!("Invalid image payload: {}", e))
                })?;
            return Ok(Some(ImageBlob::from_bytes(bytes)));
        }
        if let Some(link) = datum.url.filter(|s| !s.is_empty()) {
            let (bytes, mime) = download_bytes(&self.client, &link).await?;
            return Ok(Some(ImageBlob::new(bytes, mime)));
        }
        Ok(None)
    }

    fn provider_name(&self) -> &str {
        "openai"
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
