//! Shared fixtures: scripted providers, a recording notifier and assembled runtimes.

use async_trait::async_trait;
use autoscribe::config::AutomationConfig;
use autoscribe::error::{AutomationError, StorageError};
use autoscribe::content::GeneratedItem;
use autoscribe::media::{ImageBlob, ImageEngine};
use autoscribe::notify::{Notification, Notifier};
use autoscribe::provider::{
    ChatMessage, CompletionOptions, CompletionResponse, ModelProviderClient, ProviderGateway,
    ProviderMode,
};
use autoscribe::runtime::Automation;
use autoscribe::store::{ContentStore, NewItem, SledContentStore};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// Which prompt a provider call belongs to, recognised from the system message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Item,
    Links,
    Comment,
    Nickname,
}

impl Route {
    fn of(messages: &[ChatMessage]) -> Self {
        let system = messages.first().map(|m| m.content.as_str()).unwrap_or("");
        if system.contains("regular reader") {
            Route::Comment
        } else if system.contains("nicknames") {
            Route::Nickname
        } else if system.contains("internal links") {
            Route::Links
        } else {
            Route::Item
        }
    }
}

#[derive(Debug, Clone)]
pub enum Reply {
    Text(String),
    Fail(String),
}

/// Provider that answers each route with a fixed reply and counts calls per route.
pub struct ScriptedProvider {
    name: String,
    model: String,
    replies: HashMap<Route, Reply>,
    delay: Duration,
    calls: Mutex<HashMap<Route, usize>>,
}

impl ScriptedProvider {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            model: format!("{}-model", name),
            replies: HashMap::new(),
            delay: Duration::ZERO,
            calls: Mutex::new(HashMap::new()),
        }
    }

    pub fn reply(mut self, route: Route, reply: Reply) -> Self {
        self.replies.insert(route, reply);
        self
    }

    pub fn text(self, route: Route, text: &str) -> Self {
        self.reply(route, Reply::Text(text.to_string()))
    }

    pub fn failing(self, route: Route, reason: &str) -> Self {
        self.reply(route, Reply::Fail(reason.to_string()))
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self, route: Route) -> usize {
        self.calls.lock().get(&route).copied().unwrap_or(0)
    }
}

#[async_trait]
impl ModelProviderClient for ScriptedProvider {
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        _options: CompletionOptions,
    ) -> Result<CompletionResponse, AutomationError> {
        let route = Route::of(&messages);
        *self.calls.lock().entry(route).or_default() += 1;
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match self.replies.get(&route) {
            Some(Reply::Fail(reason)) => Err(AutomationError::ProviderFailure(reason.clone())),
            Some(Reply::Text(content)) => Ok(CompletionResponse {
                content: content.clone(),
                model: self.model.clone(),
                finish_reason: Some("stop".to_string()),
            }),
            None => Ok(CompletionResponse {
                content: String::new(),
                model: self.model.clone(),
                finish_reason: Some("stop".to_string()),
            }),
        }
    }

    async fn generate_image(&self, _prompt: &str) -> Result<Option<ImageBlob>, AutomationError> {
        Ok(None)
    }

    fn provider_name(&self) -> &str {
        &self.name
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

pub const ITEM_JSON: &str = r#"{"title":"Rust Ownership Basics","slug":"rust-ownership-basics","excerpt":"A short tour.","content":"<p>Ownership keeps memory safe without a collector.</p>","summary":"Why ownership matters."}"#;

/// Provider that writes a valid item, a comment and a nickname.
pub fn writer(name: &str) -> ScriptedProvider {
    ScriptedProvider::new(name)
        .text(Route::Item, ITEM_JSON)
        .text(Route::Comment, "Great overview, the borrow checker part finally clicked.")
        .text(Route::Nickname, "ferris_fan")
}

#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), AutomationError> {
        self.sent.lock().push(notification.clone());
        Ok(())
    }
}

/// Content store whose writes always fail.
pub struct FailingContentStore;

impl ContentStore for FailingContentStore {
    fn create_item(&self, _item: &NewItem) -> Result<u64, StorageError> {
        Err(StorageError::IoError(std::io::Error::new(
            std::io::ErrorKind::Other,
            "disk full",
        )))
    }

    fn attach_image(
        &self,
        _item_id: u64,
        _image: &ImageBlob,
        _alt: &str,
    ) -> Result<u64, StorageError> {
        Err(StorageError::IoError(std::io::Error::new(
            std::io::ErrorKind::Other,
            "disk full",
        )))
    }
}

/// Image engine that never produces an image.
pub struct FailingImageEngine;

#[async_trait]
impl ImageEngine for FailingImageEngine {
    fn name(&self) -> &'static str {
        "failing"
    }

    async fn build(&self, _item: &GeneratedItem) -> Result<ImageBlob, AutomationError> {
        Err(AutomationError::SideEffectFailure("photo search: no route to host".to_string()))
    }
}

pub fn gateway(
    primary: Option<Arc<dyn ModelProviderClient>>,
    secondary: Option<Arc<dyn ModelProviderClient>>,
    mode: ProviderMode,
) -> ProviderGateway {
    ProviderGateway::new(primary, secondary, mode, Duration::from_secs(15))
}

/// Test configuration: no images, two actions per plan, dense window.
pub fn test_config() -> AutomationConfig {
    let mut config = AutomationConfig::default();
    config.comments.min = 2;
    config.comments.max = 2;
    config.comments.frequency = "dense".to_string();
    config.content.site_url = "https://blog.example.org".to_string();
    config.images.enabled = false;
    config
}

/// Runtime on a fresh sled store under `temp`.
pub fn automation(
    temp: &TempDir,
    config: AutomationConfig,
    gateway: ProviderGateway,
    notifier: Arc<dyn Notifier>,
) -> Automation {
    let content = SledContentStore::open(temp.path().join("store")).unwrap();
    Automation::assemble(config, content, gateway, notifier).unwrap()
}
