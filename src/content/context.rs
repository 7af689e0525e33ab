//! Site facts handed to the model so new items fit the existing catalogue.

use crate::error::AutomationError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryFact {
    pub name: String,
    pub item_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecentItem {
    pub title: String,
    pub slug: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PromptContext {
    pub categories: Vec<CategoryFact>,
    pub recent_items: Vec<RecentItem>,
}

/// Source of [`PromptContext`].
pub trait ContextResolver: Send + Sync {
    fn prompt_context(&self) -> Result<PromptContext, AutomationError>;
}
