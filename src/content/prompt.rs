//! Prompt construction for every provider call the engine makes.

use crate::comments::FrozenContext;
use crate::config::ContentConfig;
use crate::content::context::PromptContext;
use crate::content::item::GeneratedItem;
use crate::content::links::{LinkCandidate, LinkSubject};
use crate::provider::ChatMessage;

const LINK_TEXT_LIMIT: usize = 4000;

/// A fully built item-generation request.
#[derive(Debug, Clone)]
pub struct ItemRequest {
    pub system_prompt: String,
    pub user_prompt: String,
    pub max_tokens: u32,
}

impl ItemRequest {
    pub fn messages(&self) -> Vec<ChatMessage> {
        vec![
            ChatMessage::system(self.system_prompt.clone()),
            ChatMessage::user(self.user_prompt.clone()),
        ]
    }
}

/// Item prompt: strategy, length bounds, site context as JSON, and the reply shape.
pub fn build_item_request(
    content: &ContentConfig,
    system_prompt: &str,
    context: &PromptContext,
) -> ItemRequest {
    let categories = serde_json::to_string(&context.categories).unwrap_or_else(|_| "[]".into());
    let recent = serde_json::to_string(&context.recent_items).unwrap_or_else(|_| "[]".into());

    let mut prompt = String::new();
    prompt.push_str("Write one new article for the site.\n");
    prompt.push_str(&format!("Topic strategy: {}\n", content.topic_strategy.trim()));
    prompt.push_str(&format!(
        "Length: between {} and {} words.\n",
        content.word_count_min, content.word_count_max
    ));
    if let Some(category) = content.target_category.as_deref().filter(|c| !c.is_empty()) {
        prompt.push_str(&format!("The article belongs to the category \"{}\".\n", category));
    }
    prompt.push_str(&format!("Site categories (JSON): {}\n", categories));
    prompt.push_str(&format!(
        "Recently published items (JSON), do not repeat their topics: {}\n",
        recent
    ));
    prompt.push_str(
        "Format the body as HTML using <h2>, <h3>, <p>, <ul> and <li>. Do not include <h1>.\n",
    );
    prompt.push_str(
        "Reply with a single JSON object and nothing else: \
         {\"title\": \"...\", \"slug\": \"...\", \"excerpt\": \"...\", \"content\": \"...\", \"summary\": \"...\"}",
    );

    ItemRequest {
        system_prompt: system_prompt.to_string(),
        user_prompt: prompt,
        max_tokens: (content.word_count_max.saturating_mul(3)).clamp(1500, 8000),
    }
}

pub fn comment_messages(context: &FrozenContext) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(
            "You are a regular reader of this site writing a short, natural comment. \
             Sound like a real person: specific, friendly, sometimes asking a question.",
        ),
        ChatMessage::user(format!(
            "Article title: {}\nExcerpt: {}\nSummary: {}\n\n\
             Write one comment of one to three sentences reacting to the article. \
             Plain text only, no quotation marks, no signature.",
            context.title, context.excerpt, context.summary
        )),
    ]
}

pub fn nickname_messages(context: &FrozenContext) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system("You invent casual online nicknames."),
        ChatMessage::user(format!(
            "Suggest one nickname for a reader commenting on the article \"{}\". \
             Reply with the nickname only, at most 20 characters, no spaces.",
            context.title
        )),
    ]
}

pub fn link_messages(
    subject: &LinkSubject,
    candidates: &[LinkCandidate],
    keywords: &[String],
) -> Vec<ChatMessage> {
    let candidates = serde_json::to_string(candidates).unwrap_or_else(|_| "[]".into());
    let text: String = subject.text.chars().take(LINK_TEXT_LIMIT).collect();
    let keywords = if keywords.is_empty() {
        "none".to_string()
    } else {
        keywords.join(", ")
    };
    vec![
        ChatMessage::system(
            "You are an editor adding internal links. You only link to URLs from the given list \
             and only use anchor phrases copied verbatim from the article text.",
        ),
        ChatMessage::user(format!(
            "Article title: {}\nExcerpt: {}\nArticle text: {}\n\n\
             Candidate pages (JSON): {}\nPreferred keywords: {}\n\n\
             Reply with JSON {{\"links\": [{{\"anchor\": \"...\", \"url\": \"...\", \"title\": \"...\"}}]}} \
             containing at most 3 links.",
            subject.title, subject.excerpt, text, candidates, keywords
        )),
    ]
}

pub fn image_prompt(item: &GeneratedItem) -> String {
    let summary = item.summary_text();
    let mut prompt = format!("Editorial illustration for an article titled \"{}\".", item.title);
    if !summary.is_empty() {
        prompt.push(' ');
        prompt.push_str(summary);
    }
    prompt.push_str(" Wide 3:2 composition, no text, no logos.");
    prompt
}
