//! Stock photo search.

use crate::error::AutomationError;
use crate::provider::{build_http_client, ensure_success, map_http_error};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

const PIXABAY_ENDPOINT: &str = "https://pixabay.com/api/";
const PER_PAGE: u32 = 20;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    Horizontal,
    Vertical,
}

impl Orientation {
    pub fn as_str(self) -> &'static str {
        match self {
            Orientation::Horizontal => "horizontal",
            Orientation::Vertical => "vertical",
        }
    }
}

/// Photo search returning candidate image URLs, best first.
#[async_trait]
pub trait PhotoSearch: Send + Sync {
    async fn search(
        &self,
        query: &str,
        orientation: Orientation,
    ) -> Result<Vec<String>, AutomationError>;
}

pub struct PixabayClient {
    client: Client,
    api_key: String,
    endpoint: String,
}

#[derive(Debug, Deserialize)]
struct PixabayResponse {
    #[serde(default)]
    hits: Vec<PixabayHit>,
}

#[derive(Debug, Deserialize)]
struct PixabayHit {
    #[serde(rename = "largeImageURL")]
    large_image_url: Option<String>,
    #[serde(rename = "webformatURL")]
    webformat_url: Option<String>,
}

impl PixabayClient {
    pub fn new(
        api_key: String,
        endpoint: Option<String>,
        timeout: Duration,
    ) -> Result<Self, AutomationError> {
        Ok(Self {
            client: build_http_client(timeout)?,
            api_key,
            endpoint: endpoint.unwrap_or_else(|| PIXABAY_ENDPOINT.to_string()),
        })
    }
}

#[async_trait]
impl PhotoSearch for PixabayClient {
    async fn search(
        &self,
        query: &str,
        orientation: Orientation,
    ) -> Result<Vec<String>, AutomationError> {
        let per_page = PER_PAGE.to_string();
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("key", self.api_key.as_str()),
                ("q", query),
                ("image_type", "photo"),
                ("orientation", orientation.as_str()),
                ("safesearch", "true"),
                ("per_page", per_page.as_str()),
            ])
            .send()
            .await
            .map_err(map_http_error)?;
        let response = ensure_success(response).await?;
        let body: PixabayResponse = response.json().await.map_err(|e| {
            AutomationError::SideEffectFailure(format!("Failed to parse photo search: {}", e))
        })?;

        let urls: Vec<String> = body
            .hits
            .into_iter()
            .filter_map(|hit| hit.large_image_url.or(hit.webformat_url))
            .filter(|url| !url.trim().is_empty())
            .collect();
        debug!(query, hits = urls.len(), "Photo search finished");
        Ok(urls)
    }
}
