//! Gemini `generateContent` client (text and inline image data).

use super::{
    build_provider_http_client, ensure_success, map_http_error, ChatMessage, CompletionOptions,
    CompletionResponse, MessageRole, ModelProviderClient,
};
use crate::error::AutomationError;
use crate::media::ImageBlob;
use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_IMAGE_MODEL: &str = "gemini-2.0-flash-preview-image-generation";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Serialize, Deserialize, Default)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Serialize, Default)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_modalities: Option<Vec<&'static str>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Content,
    finish_reason: Option<String>,
}

fn text_part(text: String) -> Part {
    Part {
        text: Some(text),
        inline_data: None,
    }
}

/// Gemini provider client
pub struct GeminiClient {
    client: Client,
    model: String,
    image_model: String,
    api_key: String,
    base_url: String,
}

impl GeminiClient {
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

    async fn generate(
        &self,
        model: &str,
        request: &GenerateRequest,
    ) -> Result<GenerateResponse, AutomationError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, model);
        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(request)
            .send()
            .await
            .map_err(map_http_error)?;
        let response = ensure_success(response).await?;
        response.json().await.map_err(|e| {
            AutomationError::ProviderFailure(format!("Failed to parse response: {}", e))
        })
    }
}

#[async_trait]
impl ModelProviderClient for GeminiClient {
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        options: CompletionOptions,
    ) -> Result<CompletionResponse, AutomationError> {
        let mut system = Vec::new();
        let mut contents = Vec::new();
        for message in messages {
            match message.role {
                MessageRole::System => system.push(text_part(message.content)),
                MessageRole::User => contents.push(Content {
                    role: Some("user".to_string()),
                    parts: vec![text_part(message.content)],
                }),
                MessageRole::Assistant => contents.push(Content {
                    role: Some("model".to_string()),
                    parts: vec![text_part(message.content)],
                }),
            }
        }

        let request = GenerateRequest {
            system_instruction: (!system.is_empty()).then(|| Content {
                role: None,
                parts: system,
            }),
            contents,
            generation_config: GenerationConfig {
                temperature: options.temperature,
                max_output_tokens: options.max_tokens,
                response_mime_type: options.json_response.then_some("application/json"),
                response_modalities: None,
            },
        };

        let response = self.generate(&self.model, &request).await?;
        let candidate = response
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| AutomationError::ProviderFailure("No candidates in response".to_string()))?;

        let content: String = candidate
            .content
            .parts
            .into_iter()
            .filter_map(|p| p.text)
            .collect::<Vec<_>>()
            .join("");

        debug!(provider = "gemini", model = %self.model, "Completion received");
        Ok(CompletionResponse {
            content,
            model: self.model.clone(),
            finish_reason: candidate.finish_reason,
        })
    }

    async fn generate_image(&self, prompt: &str) -> Result<Option<ImageBlob>, AutomationError> {
        let request = GenerateRequest {
            system_instruction: None,
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![text_part(prompt.to_string())],
            }],
            generation_config: GenerationConfig {
                response_modalities: Some(vec!["TEXT", "IMAGE"]),
                ..GenerationConfig::default()
            },
        };

        let response = self.generate(&self.image_model, &request).await?;
        let inline = response
            .candidates
            .into_iter()
            .flat_map(|c| c.content.parts)
            .find_map(|p| p.inline_data);

        let Some(inline) = inline else {
            return Ok(None);
        };
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(inline.data.as_bytes())
            .map_err(|e| AutomationError::ProviderFailure(format!("Invalid image payload: {}", e)))?;
        if bytes.is_empty() {
            return Ok(None);
        }
        Ok(Some(ImageBlob::new(bytes, Some(inline.mime_type))))
    }

    fn provider_name(&self) -> &str {
        "gemini"
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
