//! One generation cycle: context, request, generation, linking, persistence,
//! featured image, comment plan and status.
//!
//! [`ContentPipeline::run`] never propagates errors. Failures before persistence
//! end the cycle with [`PipelineOutcome::NothingProduced`]; failures after it
//! (image, comment plan) are recorded as the status error and the item stands.

use super::context::{ContextResolver, PromptContext};
use super::item::GeneratedItem;
use super::links::{inject_links, LinkCandidateSource, LinkSubject, LinkSuggestion};
use super::prompt::build_item_request;
use crate::comments::{CommentQueue, FrozenContext};
use crate::config::{AutomationConfig, ContentConfig};
use crate::error::AutomationError;
use crate::media::{render_caption, ImageEngine};
use crate::notify::{notify_if_fatal, Notifier};
use crate::provider::{ProviderGateway, ProviderResult};
use crate::status::{StatusPatch, StatusStore};
use crate::store::{ContentStore, NewItem};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Existing items offered to the linking prompt.
const LINK_CANDIDATES: usize = 20;

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub content: ContentConfig,
    pub system_prompt: String,
    pub image_template: String,
}

impl PipelineSettings {
    pub fn from_config(config: &AutomationConfig) -> Self {
        Self {
            content: config.content.clone(),
            system_prompt: config.providers.system_prompt.clone(),
            image_template: config.images.template.clone(),
        }
    }
}

#[derive(Debug)]
pub enum PipelineOutcome {
    /// Item persisted. `warnings` holds side-effect failures from the same run.
    Produced { item_id: u64, warnings: Vec<String> },
    /// Preview mode: generated but not persisted.
    Previewed(GeneratedItem),
    NothingProduced(AutomationError),
}

impl PipelineOutcome {
    pub fn item_id(&self) -> Option<u64> {
        match self {
            PipelineOutcome::Produced { item_id, .. } => Some(*item_id),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&AutomationError> {
        match self {
            PipelineOutcome::NothingProduced(err) => Some(err),
            _ => None,
        }
    }

    pub fn warnings(&self) -> &[String] {
        match self {
            PipelineOutcome::Produced { warnings, .. } => warnings.as_slice(),
            _ => &[],
        }
    }
}

pub struct ContentPipeline {
    settings: PipelineSettings,
    gateway: Arc<ProviderGateway>,
    context: Arc<dyn ContextResolver>,
    links: Arc<dyn LinkCandidateSource>,
    store: Arc<dyn ContentStore>,
    images: Option<Arc<dyn ImageEngine>>,
    queue: Arc<CommentQueue>,
    status: Arc<dyn StatusStore>,
    notifier: Arc<dyn Notifier>,
}

impl ContentPipeline {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        settings: PipelineSettings,
        gateway: Arc<ProviderGateway>,
        context: Arc<dyn ContextResolver>,
        links: Arc<dyn LinkCandidateSource>,
        store: Arc<dyn ContentStore>,
        images: Option<Arc<dyn ImageEngine>>,
        queue: Arc<CommentQueue>,
        status: Arc<dyn StatusStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            settings,
            gateway,
            context,
            links,
            store,
            images,
            queue,
            status,
            notifier,
        }
    }

    pub async fn run(&self, now: DateTime<Utc>) -> PipelineOutcome {
        match self.try_run(now).await {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(kind = err.kind(), error = %err, "Generation cycle produced nothing");
                notify_if_fatal(self.notifier.as_ref(), &err).await;
                PipelineOutcome::NothingProduced(err)
            }
        }
    }

    /// Generate an item without persisting anything.
    pub async fn preview(&self) -> Result<GeneratedItem, AutomationError> {
        self.generate().await
    }

    async fn try_run(&self, now: DateTime<Utc>) -> Result<PipelineOutcome, AutomationError> {
        let item = self.generate().await?;

        if self.settings.content.preview_mode {
            info!(title = %item.title, "Preview mode; item not persisted");
            return Ok(PipelineOutcome::Previewed(item));
        }

        let item = self.link(item).await;

        let record = NewItem::from_generated(
            &item,
            self.settings.content.default_status,
            self.settings.content.target_category.clone(),
            now,
        );
        let item_id = self
            .store
            .create_item(&record)
            .map_err(|e| AutomationError::PersistenceFailure(e.to_string()))?;
        info!(item_id, title = %item.title, "Item persisted");

        let mut warnings = Vec::new();
        if let Err(err) = self.attach_image(item_id, &item).await {
            warnings.push(err.to_string());
        }

        if let Err(err) = self
            .queue
            .enqueue(item_id, FrozenContext::from(&item), now)
            .await
        {
            warn!(item_id, error = %err, "Failed to create comment plan");
            notify_if_fatal(self.notifier.as_ref(), &err).await;
            warnings.push(
                AutomationError::SideEffectFailure(format!("comment plan: {}", err)).to_string(),
            );
        }

        let patch = StatusPatch::new().last_item_id(item_id).last_run_at(now);
        let patch = if warnings.is_empty() {
            patch
        } else {
            patch.error(warnings.join("; "), now)
        };
        if let Err(err) = self.status.merge(patch) {
            warn!(item_id, error = %err, "Failed to record item in status");
        }

        Ok(PipelineOutcome::Produced { item_id, warnings })
    }

    async fn generate(&self) -> Result<GeneratedItem, AutomationError> {
        if !self.gateway.is_configured() {
            return Err(AutomationError::ConfigurationMissing(format!(
                "no provider configured for mode {:?}",
                self.gateway.mode()
            )));
        }

        let context = self.context.prompt_context().unwrap_or_else(|err| {
            warn!(error = %err, "Site context unavailable; generating without it");
            PromptContext::default()
        });
        let request = build_item_request(
            &self.settings.content,
            &self.settings.system_prompt,
            &context,
        );
        let item = self.gateway.generate_item(&request).await.into_result("item")?;
        debug!(title = %item.title, "Item generated");
        Ok(item)
    }

    async fn link(&self, mut item: GeneratedItem) -> GeneratedItem {
        if !self.settings.content.internal_linking || item.body.trim().is_empty() {
            return item;
        }

        let candidates = match self.links.link_candidates(LINK_CANDIDATES) {
            Ok(candidates) if !candidates.is_empty() => candidates,
            Ok(_) => return item,
            Err(err) => {
                warn!(error = %err, "Link candidates unavailable");
                return item;
            }
        };

        let subject = LinkSubject {
            title: item.title.clone(),
            excerpt: item.resolved_excerpt(),
            text: item.plain_text(),
        };
        let suggestions = match self
            .gateway
            .suggest_links(&subject, &candidates, &self.settings.content.link_keywords)
            .await
        {
            ProviderResult::Success(suggestions) => suggestions,
            ProviderResult::Empty => return item,
            ProviderResult::Failure(reason) => {
                warn!(reason = %reason, "Link suggestions failed; body left unchanged");
                return item;
            }
        };

        // Only link to pages we actually offered.
        let allowed: Vec<LinkSuggestion> = suggestions
            .into_iter()
            .filter(|s| candidates.iter().any(|c| c.url == s.url.trim()))
            .collect();
        let (body, injected) = inject_links(&item.body, &allowed);
        if injected > 0 {
            info!(injected, "Internal links added");
            item.body = body;
        }
        item
    }

    async fn attach_image(&self, item_id: u64, item: &GeneratedItem) -> Result<(), AutomationError> {
        let Some(engine) = &self.images else {
            return Ok(());
        };
        let blob = engine.build(item).await.map_err(|err| {
            warn!(item_id, engine = engine.name(), error = %err, "Featured image skipped");
            AutomationError::SideEffectFailure(format!("featured image: {}", err))
        })?;
        let alt = render_caption(&self.settings.image_template, item);
        let media_id = self.store.attach_image(item_id, &blob, &alt).map_err(|err| {
            warn!(item_id, error = %err, "Failed to attach featured image");
            AutomationError::SideEffectFailure(format!("featured image: {}", err))
        })?;
        info!(item_id, media_id, "Featured image attached");
        Ok(())
    }
}
