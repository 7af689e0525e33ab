//! Provider gateway: one call surface over the configured providers.
//!
//! Every logical call (item, comment, nickname, link suggestions, image) has the
//! same shape. Each attempt is bounded by the call timeout. In `Auto` mode the
//! secondary provider is consulted once when the primary does not succeed. There
//! are no other retries.

use super::parse::{parse_comment, parse_generated_item, parse_link_suggestions, parse_nickname};
use super::{
    ChatMessage, CompletionOptions, ModelProviderClient, ProviderFactory, ProviderResult,
};
use crate::comments::FrozenContext;
use crate::config::ProvidersConfig;
use crate::content::prompt::{self, ItemRequest};
use crate::content::{GeneratedItem, LinkCandidate, LinkSubject, LinkSuggestion};
use crate::error::AutomationError;
use crate::media::ImageBlob;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Which providers a call may use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderMode {
    /// Provider A only.
    #[serde(alias = "openai")]
    Primary,
    /// Provider B only.
    #[serde(alias = "gemini")]
    Secondary,
    /// A, then B once if A did not succeed.
    #[default]
    Auto,
}

pub struct ProviderGateway {
    primary: Option<Arc<dyn ModelProviderClient>>,
    secondary: Option<Arc<dyn ModelProviderClient>>,
    mode: ProviderMode,
    call_timeout: Duration,
}

impl ProviderGateway {
    pub fn new(
        primary: Option<Arc<dyn ModelProviderClient>>,
        secondary: Option<Arc<dyn ModelProviderClient>>,
        mode: ProviderMode,
        call_timeout: Duration,
    ) -> Self {
        Self {
            primary,
            secondary,
            mode,
            call_timeout,
        }
    }

    pub fn from_config(config: &ProvidersConfig) -> Result<Self, AutomationError> {
        let (primary, secondary) = ProviderFactory::from_config(config)?;
        Ok(Self::new(
            primary,
            secondary,
            config.mode,
            Duration::from_secs(config.call_timeout_secs),
        ))
    }

    pub fn mode(&self) -> ProviderMode {
        self.mode
    }

    /// Whether the current mode can reach at least one provider.
    pub fn is_configured(&self) -> bool {
        self.slots().iter().any(|(_, client)| client.is_some())
    }

    fn slots(&self) -> Vec<(&'static str, Option<&Arc<dyn ModelProviderClient>>)> {
        match self.mode {
            ProviderMode::Primary => vec![("primary", self.primary.as_ref())],
            ProviderMode::Secondary => vec![("secondary", self.secondary.as_ref())],
            ProviderMode::Auto => vec![
                ("primary", self.primary.as_ref()),
                ("secondary", self.secondary.as_ref()),
            ],
        }
    }

    async fn dispatch<T, F>(&self, operation: &'static str, call: F) -> ProviderResult<T>
    where
        F: for<'a> Fn(&'a dyn ModelProviderClient) -> BoxFuture<'a, ProviderResult<T>>,
    {
        let slots = self.slots();
        let single = slots.len() == 1;
        let mut causes = Vec::with_capacity(slots.len());

        for (slot, client) in slots {
            let (name, outcome) = match client {
                None => (
                    slot.to_string(),
                    ProviderResult::Failure("not configured".to_string()),
                ),
                Some(client) => {
                    let name = client.provider_name().to_string();
                    let outcome =
                        match tokio::time::timeout(self.call_timeout, call(client.as_ref())).await {
                            Ok(outcome) => outcome,
                            Err(_) => ProviderResult::Failure(format!(
                                "timed out after {}s",
                                self.call_timeout.as_secs()
                            )),
                        };
                    (name, outcome)
                }
            };

            match outcome {
                ProviderResult::Success(value) => {
                    debug!(operation, provider = %name, "Provider call succeeded");
                    return ProviderResult::Success(value);
                }
                ProviderResult::Empty => {
                    warn!(operation, provider = %name, "Provider returned an empty result");
                    if single {
                        return ProviderResult::Empty;
                    }
                    causes.push(format!("{}: empty result", name));
                }
                ProviderResult::Failure(reason) => {
                    warn!(operation, provider = %name, reason = %reason, "Provider call failed");
                    if single {
                        return ProviderResult::Failure(format!("{}: {}", name, reason));
                    }
                    causes.push(format!("{}: {}", name, reason));
                }
            }
        }

        ProviderResult::Failure(causes.join("; "))
    }

    async fn complete_with<T: Send + 'static>(
        &self,
        operation: &'static str,
        messages: Vec<ChatMessage>,
        options: CompletionOptions,
        parse: fn(&str) -> ProviderResult<T>,
    ) -> ProviderResult<T> {
        self.dispatch(operation, |client| {
            let messages = messages.clone();
            let options = options.clone();
            Box::pin(async move {
                match client.complete(messages, options).await {
                    Ok(response) => parse(&response.content),
                    Err(err) => ProviderResult::Failure(err.to_string()),
                }
            })
        })
        .await
    }

    pub async fn generate_item(&self, request: &ItemRequest) -> ProviderResult<GeneratedItem> {
        self.complete_with(
            "item",
            request.messages(),
            CompletionOptions::json(request.max_tokens),
            parse_generated_item,
        )
        .await
    }

    pub async fn generate_comment(&self, context: &FrozenContext) -> ProviderResult<String> {
        self.complete_with(
            "comment",
            prompt::comment_messages(context),
            CompletionOptions::short_text(200, 0.9),
            parse_comment,
        )
        .await
    }

    pub async fn generate_nickname(&self, context: &FrozenContext) -> ProviderResult<String> {
        self.complete_with(
            "nickname",
            prompt::nickname_messages(context),
            CompletionOptions::short_text(20, 1.0),
            parse_nickname,
        )
        .await
    }

    pub async fn suggest_links(
        &self,
        subject: &LinkSubject,
        candidates: &[LinkCandidate],
        keywords: &[String],
    ) -> ProviderResult<Vec<LinkSuggestion>> {
        self.complete_with(
            "links",
            prompt::link_messages(subject, candidates, keywords),
            CompletionOptions::json(600),
            parse_link_suggestions,
        )
        .await
    }

    pub async fn generate_image(&self, item: &GeneratedItem) -> ProviderResult<ImageBlob> {
        let image_prompt = prompt::image_prompt(item);
        self.dispatch("image", |client| {
            let image_prompt = image_prompt.clone();
            Box::pin(async move {
                match client.generate_image(&image_prompt).await {
                    Ok(Some(blob)) if !blob.bytes.is_empty() => ProviderResult::Success(blob),
                    Ok(_) => ProviderResult::Empty,
                    Err(err) => ProviderResult::Failure(err.to_string()),
                }
            })
        })
        .await
    }
}
