//! Sled-backed content store.

use crate::content::{
    CategoryFact, ContextResolver, LinkCandidate, LinkCandidateSource, PromptContext, RecentItem,
};
use crate::error::{AutomationError, StorageError};
use crate::media::ImageBlob;
use crate::store::{
    CommentRecord, CommentSink, ContentStore, ItemRecord, MediaRecord, NewComment, NewItem,
};
use sled::{Db, Tree};
use std::io;
use std::path::Path;

const TREE_ITEMS: &str = "items";
const TREE_MEDIA: &str = "media";
const TREE_COMMENTS: &str = "comments";

/// Recent items handed to the prompt context.
const RECENT_ITEMS: usize = 10;

/// Items, media and comments in three sled trees, bincode encoded, keyed by
/// big-endian id so iteration runs oldest to newest.
#[derive(Clone)]
pub struct SledContentStore {
    db: Db,
    items: Tree,
    media: Tree,
    comments: Tree,
    categories: Vec<String>,
    site_url: String,
}

impl SledContentStore {
    /// Open (or create) a database at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let db = sled::open(path).map_err(|e| {
            StorageError::IoError(io::Error::new(
                io::ErrorKind::Other,
                format!("Failed to open sled database: {}", e),
            ))
        })?;
        Self::from_db(&db)
    }

    pub fn from_db(db: &Db) -> Result<Self, StorageError> {
        Ok(Self {
            db: db.clone(),
            items: db.open_tree(TREE_ITEMS).map_err(to_storage_io)?,
            media: db.open_tree(TREE_MEDIA).map_err(to_storage_io)?,
            comments: db.open_tree(TREE_COMMENTS).map_err(to_storage_io)?,
            categories: Vec::new(),
            site_url: String::new(),
        })
    }

    /// Site facts used when answering context and link-candidate queries.
    pub fn with_site(mut self, categories: Vec<String>, site_url: impl Into<String>) -> Self {
        self.categories = categories;
        self.site_url = site_url.into();
        self
    }

    /// The underlying database, shared with the plan and status stores.
    pub fn db(&self) -> &Db {
        &self.db
    }

    pub fn get_item(&self, item_id: u64) -> Result<Option<ItemRecord>, StorageError> {
        get_record(&self.items, item_id)
    }

    pub fn get_media(&self, media_id: u64) -> Result<Option<MediaRecord>, StorageError> {
        get_record(&self.media, media_id)
    }

    /// Newest first.
    pub fn recent_items(&self, limit: usize) -> Result<Vec<ItemRecord>, StorageError> {
        let mut out = Vec::with_capacity(limit);
        for entry in self.items.iter().rev().take(limit) {
            let (_, value) = entry.map_err(to_storage_io)?;
            out.push(decode(&value)?);
        }
        Ok(out)
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    pub fn comments_for(&self, item_id: u64) -> Result<Vec<CommentRecord>, StorageError> {
        let mut out = Vec::new();
        for entry in self.comments.iter() {
            let (_, value) = entry.map_err(to_storage_io)?;
            let record: CommentRecord = decode(&value)?;
            if record.item_id == item_id {
                out.push(record);
            }
        }
        Ok(out)
    }

    pub fn flush(&self) -> Result<(), StorageError> {
        self.db.flush().map_err(to_storage_io)?;
        Ok(())
    }

    fn next_id(&self) -> Result<u64, StorageError> {
        // sled ids start at 0; keep 0 free so ids read naturally.
        Ok(self.db.generate_id().map_err(to_storage_io)? + 1)
    }

    fn item_url(&self, slug: &str) -> String {
        format!("{}/{}", self.site_url.trim_end_matches('/'), slug)
    }
}

impl ContentStore for SledContentStore {
    fn create_item(&self, item: &NewItem) -> Result<u64, StorageError> {
        let id = self.next_id()?;
        let record = ItemRecord {
            id,
            title: item.title.clone(),
            slug: item.slug.clone(),
            excerpt: item.excerpt.clone(),
            body: item.body.clone(),
            summary: item.summary.clone(),
            status: item.status,
            category: item.category.clone(),
            content_hash: item.content_hash.clone(),
            generated_at: item.generated_at,
            featured_media: None,
        };
        put_record(&self.items, id, &record)?;
        self.flush()?;
        Ok(id)
    }

    fn attach_image(
        &self,
        item_id: u64,
        image: &ImageBlob,
        alt: &str,
    ) -> Result<u64, StorageError> {
        let Some(mut item) = self.get_item(item_id)? else {
            return Err(StorageError::ItemNotFound(item_id));
        };
        let media_id = self.next_id()?;
        let media = MediaRecord {
            id: media_id,
            item_id,
            mime: image.mime.clone(),
            alt: alt.to_string(),
            bytes: image.bytes.clone(),
        };
        put_record(&self.media, media_id, &media)?;
        item.featured_media = Some(media_id);
        put_record(&self.items, item_id, &item)?;
        self.flush()?;
        Ok(media_id)
    }
}

impl CommentSink for SledContentStore {
    fn insert_comment(&self, comment: &NewComment) -> Result<u64, StorageError> {
        if !self
            .items
            .contains_key(comment.item_id.to_be_bytes())
            .map_err(to_storage_io)?
        {
            return Err(StorageError::ItemNotFound(comment.item_id));
        }
        let id = self.next_id()?;
        let record = CommentRecord {
            id,
            item_id: comment.item_id,
            author: comment.author.clone(),
            author_email: comment.author_email.clone(),
            content: comment.content.clone(),
            approved: comment.approved,
            created_at: comment.created_at,
        };
        put_record(&self.comments, id, &record)?;
        self.flush()?;
        Ok(id)
    }
}

impl ContextResolver for SledContentStore {
    fn prompt_context(&self) -> Result<PromptContext, AutomationError> {
        let mut categories: Vec<CategoryFact> = self
            .categories
            .iter()
            .map(|name| CategoryFact {
                name: name.clone(),
                item_count: 0,
            })
            .collect();
        for entry in self.items.iter() {
            let (_, value) = entry.map_err(to_storage_io)?;
            let record: ItemRecord = decode(&value)?;
            let Some(category) = record.category else {
                continue;
            };
            if let Some(fact) = categories.iter_mut().find(|c| c.name == category) {
                fact.item_count += 1;
            }
        }

        let recent_items = self
            .recent_items(RECENT_ITEMS)?
            .into_iter()
            .map(|record| RecentItem {
                title: record.title,
                slug: record.slug,
            })
            .collect();

        Ok(PromptContext {
            categories,
            recent_items,
        })
    }
}

impl LinkCandidateSource for SledContentStore {
    fn link_candidates(&self, limit: usize) -> Result<Vec<LinkCandidate>, AutomationError> {
        Ok(self
            .recent_items(limit)?
            .into_iter()
            .map(|record| LinkCandidate {
                url: self.item_url(&record.slug),
                title: record.title,
            })
            .collect())
    }
}

fn get_record<T: serde::de::DeserializeOwned>(
    tree: &Tree,
    id: u64,
) -> Result<Option<T>, StorageError> {
    let Some(raw) = tree.get(id.to_be_bytes()).map_err(to_storage_io)? else {
        return Ok(None);
    };
    decode(&raw).map(Some)
}

fn put_record<T: serde::Serialize>(tree: &Tree, id: u64, record: &T) -> Result<(), StorageError> {
    let value = bincode::serialize(record).map_err(|e| {
        StorageError::Serialization(format!("Failed to serialize record {}: {}", id, e))
    })?;
    tree.insert(id.to_be_bytes(), value).map_err(to_storage_io)?;
    Ok(())
}

fn decode<T: serde::de::DeserializeOwned>(raw: &[u8]) -> Result<T, StorageError> {
    bincode::deserialize(raw).map_err(|e| {
        StorageError::Serialization(format!("Failed to deserialize record: {}", e))
    })
}

fn to_storage_io(err: sled::Error) -> StorageError {
    StorageError::IoError(io::Error::new(io::ErrorKind::Other, err.to_string()))
}
