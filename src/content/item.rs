//! The typed result of one generation run.

use serde::{Deserialize, Serialize};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

const EXCERPT_WORDS: usize = 40;

/// Generated content item. `title` and `body` are always present; the provider
/// may omit the rest, in which case they are derived when persisting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedItem {
    pub title: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub excerpt: Option<String>,
    #[serde(rename = "content")]
    pub body: String,
    #[serde(default)]
    pub summary: Option<String>,
}

impl GeneratedItem {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            slug: None,
            excerpt: None,
            body: body.into(),
            summary: None,
        }
    }

    /// Provided slug (normalized) or one derived from the title.
    pub fn resolved_slug(&self) -> String {
        let source = non_blank(&self.slug).unwrap_or(&self.title);
        let slug = slugify(source);
        if slug.is_empty() {
            slugify(&self.title)
        } else {
            slug
        }
    }

    /// Provided excerpt or the first 40 words of the plain-text body.
    pub fn resolved_excerpt(&self) -> String {
        match non_blank(&self.excerpt) {
            Some(excerpt) => excerpt.trim().to_string(),
            None => trim_words(&strip_tags(&self.body), EXCERPT_WORDS),
        }
    }

    pub fn summary_text(&self) -> &str {
        non_blank(&self.summary).map(str::trim).unwrap_or("")
    }

    pub fn plain_text(&self) -> String {
        strip_tags(&self.body)
    }

    /// blake3 of title + summary, stored alongside the item to spot regenerated duplicates.
    pub fn prompt_hash(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.title.as_bytes());
        hasher.update(self.summary_text().as_bytes());
        hex::encode(hasher.finalize().as_bytes())
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.trim().is_empty())
}

/// URL slug: Unicode-decomposed, ASCII, lowercase, dash separated.
pub fn slugify(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut pending_dash = false;
    for c in input.nfkd().filter(|c| !is_combining_mark(*c)) {
        let mapped: &str = match c {
            'ł' | 'Ł' => "l",
            'ß' => "ss",
            'æ' | 'Æ' => "ae",
            'ø' | 'Ø' => "o",
            'đ' | 'Đ' => "d",
            _ => "",
        };
        if !mapped.is_empty() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.push_str(mapped);
        } else if c.is_ascii_alphanumeric() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    out
}

/// Remove markup and collapse whitespace.
pub fn strip_tags(html: &str) -> String {
    let mut text = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => {
                in_tag = true;
                text.push(' ');
            }
            '>' if in_tag => in_tag = false,
            _ if !in_tag => text.push(c),
            _ => {}
        }
    }
    let decoded = text
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">");
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// First `limit` words, with an ellipsis when truncated.
pub fn trim_words(text: &str, limit: usize) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.len() <= limit {
        return words.join(" ");
    }
    format!("{}…", words[..limit].join(" "))
}
