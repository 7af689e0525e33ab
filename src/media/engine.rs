//! Image engines.

use super::compose::OverlayCompositor;
use super::photo::{Orientation, PhotoSearch, PixabayClient};
use super::ImageBlob;
use crate::config::{ImageConfig, ImageMode};
use crate::content::GeneratedItem;
use crate::error::AutomationError;
use crate::provider::{build_http_client, download_bytes, ProviderGateway};
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

#[async_trait]
pub trait ImageEngine: Send + Sync {
    fn name(&self) -> &'static str;

    async fn build(&self, item: &GeneratedItem) -> Result<ImageBlob, AutomationError>;
}

/// Image generation through the provider gateway.
pub struct RemoteImageEngine {
    gateway: Arc<ProviderGateway>,
}

impl RemoteImageEngine {
    pub fn new(gateway: Arc<ProviderGateway>) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl ImageEngine for RemoteImageEngine {
    fn name(&self) -> &'static str {
        "remote"
    }

    async fn build(&self, item: &GeneratedItem) -> Result<ImageBlob, AutomationError> {
        self.gateway.generate_image(item).await.into_result("image")
    }
}

/// Stock photo plus a locally composited overlay.
pub struct ServerImageEngine {
    search: Arc<dyn PhotoSearch>,
    client: Client,
    compositor: OverlayCompositor,
    query: String,
    orientation: Orientation,
    timeout: Duration,
    rng: parking_lot::Mutex<StdRng>,
}

impl ServerImageEngine {
    pub fn new(
        search: Arc<dyn PhotoSearch>,
        compositor: OverlayCompositor,
        query: String,
        orientation: Orientation,
        timeout: Duration,
    ) -> Result<Self, AutomationError> {
        Ok(Self {
            search,
            client: build_http_client(timeout)?,
            compositor,
            query,
            orientation,
            timeout,
            rng: parking_lot::Mutex::new(StdRng::from_entropy()),
        })
    }

    fn timed_out(&self, step: &str) -> AutomationError {
        AutomationError::SideEffectFailure(format!(
            "{} timed out after {}s",
            step,
            self.timeout.as_secs_f64()
        ))
    }

    /// Configured query, or the first words of the title.
    fn query_for(&self, item: &GeneratedItem) -> String {
        let configured = self.query.trim();
        if !configured.is_empty() {
            return configured.to_string();
        }
        item.title
            .split_whitespace()
            .take(3)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[async_trait]
impl ImageEngine for ServerImageEngine {
    fn name(&self) -> &'static str {
        "server"
    }

    async fn build(&self, item: &GeneratedItem) -> Result<ImageBlob, AutomationError> {
        let query = self.query_for(item);
        let urls = tokio::time::timeout(self.timeout, self.search.search(&query, self.orientation))
            .await
            .map_err(|_| self.timed_out("photo search"))?
            .map_err(|e| AutomationError::SideEffectFailure(format!("photo search: {}", e)))?;
        if urls.is_empty() {
            return Err(AutomationError::SideEffectFailure(format!(
                "no photos for '{}'",
                query
            )));
        }
        let url = {
            let pick = self.rng.lock().gen_range(0..urls.len());
            urls[pick].clone()
        };
        debug!(url = %url, "Downloading photo");

        let (bytes, _) = tokio::time::timeout(self.timeout, download_bytes(&self.client, &url))
            .await
            .map_err(|_| self.timed_out("photo download"))?
            .map_err(|e| AutomationError::SideEffectFailure(format!("photo download: {}", e)))?;
        self.compositor.compose(&bytes)
    }
}

/// Pick the engine once from configuration. `None` when images are disabled.
pub fn build_engine(
    config: &ImageConfig,
    gateway: Arc<ProviderGateway>,
) -> Result<Option<Arc<dyn ImageEngine>>, AutomationError> {
    if !config.enabled {
        return Ok(None);
    }
    let engine: Arc<dyn ImageEngine> = match config.mode {
        ImageMode::Remote => Arc::new(RemoteImageEngine::new(gateway)),
        ImageMode::Server => {
            let api_key = config.pixabay_api_key.clone().ok_or_else(|| {
                AutomationError::ConfigurationMissing("images.pixabay_api_key".to_string())
            })?;
            let timeout = Duration::from_secs(config.request_timeout_secs.max(1));
            let search = PixabayClient::new(api_key, config.pixabay_endpoint.clone(), timeout)?;
            Arc::new(ServerImageEngine::new(
                Arc::new(search),
                OverlayCompositor::from_hex(&config.overlay_color)?,
                config.pixabay_query.clone(),
                config.pixabay_orientation,
                timeout,
            )?)
        }
    };
    debug!(engine = engine.name(), "Image engine selected");
    Ok(Some(engine))
}
