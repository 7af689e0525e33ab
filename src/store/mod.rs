//! Content Store
//!
//! Records for persisted items, attached media and inserted comments, plus the
//! narrow traits the pipeline and comment queue write through.

pub mod persistence;

pub use persistence::SledContentStore;

use crate::content::GeneratedItem;
use crate::error::StorageError;
use crate::media::ImageBlob;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Publication status for new items.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    #[default]
    Draft,
    Publish,
}

/// An item ready to be persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewItem {
    pub title: String,
    pub slug: String,
    pub excerpt: String,
    pub body: String,
    pub summary: Option<String>,
    pub status: ItemStatus,
    pub category: Option<String>,
    /// blake3 hex of title + summary.
    pub content_hash: String,
    pub generated_at: DateTime<Utc>,
}

impl NewItem {
    pub fn from_generated(
        item: &GeneratedItem,
        status: ItemStatus,
        category: Option<String>,
        generated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            title: item.title.clone(),
            slug: item.resolved_slug(),
            excerpt: item.resolved_excerpt(),
            body: item.body.clone(),
            summary: item.summary.clone(),
            status,
            category,
            content_hash: item.prompt_hash(),
            generated_at,
        }
    }
}

/// A persisted item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemRecord {
    pub id: u64,
    pub title: String,
    pub slug: String,
    pub excerpt: String,
    pub body: String,
    pub summary: Option<String>,
    pub status: ItemStatus,
    pub category: Option<String>,
    pub content_hash: String,
    pub generated_at: DateTime<Utc>,
    pub featured_media: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaRecord {
    pub id: u64,
    pub item_id: u64,
    pub mime: String,
    pub alt: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewComment {
    pub item_id: u64,
    pub author: String,
    pub author_email: String,
    pub content: String,
    pub approved: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentRecord {
    pub id: u64,
    pub item_id: u64,
    pub author: String,
    pub author_email: String,
    pub content: String,
    pub approved: bool,
    pub created_at: DateTime<Utc>,
}

/// Where the pipeline persists items and their featured images.
pub trait ContentStore: Send + Sync {
    fn create_item(&self, item: &NewItem) -> Result<u64, StorageError>;

    /// Store `image` and set it as the item's featured media.
    fn attach_image(&self, item_id: u64, image: &ImageBlob, alt: &str)
        -> Result<u64, StorageError>;
}

/// Where drained comment actions land.
pub trait CommentSink: Send + Sync {
    fn insert_comment(&self, comment: &NewComment) -> Result<u64, StorageError>;
}
