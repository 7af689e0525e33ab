//! Reply parsing: turns raw provider text into typed [`ProviderResult`]s.
//!
//! Blank replies are `Empty`; replies that are present but do not have the
//! requested shape are `Failure`.

use super::ProviderResult;
use crate::content::{GeneratedItem, LinkSuggestion};
use serde::Deserialize;

const NICKNAME_MAX_CHARS: usize = 40;

/// Drop a surrounding Markdown code fence, if any.
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };
    body.trim_end().trim_end_matches("```").trim()
}

/// The outermost `{ ... }` span of the reply.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

#[derive(Deserialize)]
struct RawItem {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    slug: Option<String>,
    #[serde(default)]
    excerpt: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    summary: Option<String>,
}

pub fn parse_generated_item(text: &str) -> ProviderResult<GeneratedItem> {
    let body = strip_code_fences(text);
    if body.is_empty() {
        return ProviderResult::Empty;
    }
    let Some(json) = extract_json_object(body) else {
        return ProviderResult::Failure("malformed item: no JSON object in reply".to_string());
    };
    let raw: RawItem = match serde_json::from_str(json) {
        Ok(raw) => raw,
        Err(e) => return ProviderResult::Failure(format!("malformed item: {}", e)),
    };

    let title = raw.title.map(|t| t.trim().to_string()).unwrap_or_default();
    let content = raw.content.map(|c| c.trim().to_string()).unwrap_or_default();
    if title.is_empty() && content.is_empty() {
        return ProviderResult::Empty;
    }
    if title.is_empty() || content.is_empty() {
        return ProviderResult::Failure("malformed item: missing title or content".to_string());
    }

    ProviderResult::Success(GeneratedItem {
        title,
        slug: raw.slug,
        excerpt: raw.excerpt,
        body: content,
        summary: raw.summary,
    })
}

fn trim_quotes(text: &str) -> &str {
    text.trim()
        .trim_matches(|c| matches!(c, '"' | '\'' | '“' | '”' | '„' | '«' | '»'))
        .trim()
}

pub fn parse_comment(text: &str) -> ProviderResult<String> {
    let comment = trim_quotes(strip_code_fences(text));
    if comment.is_empty() {
        ProviderResult::Empty
    } else {
        ProviderResult::Success(comment.to_string())
    }
}

pub fn parse_nickname(text: &str) -> ProviderResult<String> {
    let first_line = strip_code_fences(text).lines().next().unwrap_or("");
    let nickname: String = trim_quotes(first_line)
        .trim_start_matches('@')
        .chars()
        .filter(|c| !c.is_control())
        .take(NICKNAME_MAX_CHARS)
        .collect();
    let nickname = nickname.trim();
    if nickname.is_empty() {
        ProviderResult::Empty
    } else {
        ProviderResult::Success(nickname.to_string())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawLinks {
    Wrapped { links: Vec<LinkSuggestion> },
    Bare(Vec<LinkSuggestion>),
}

pub fn parse_link_suggestions(text: &str) -> ProviderResult<Vec<LinkSuggestion>> {
    let body = strip_code_fences(text);
    if body.is_empty() {
        return ProviderResult::Empty;
    }
    let json = match (body.find('['), body.find('{')) {
        (Some(arr), Some(obj)) if arr < obj => body[arr..].trim(),
        (Some(arr), None) => body[arr..].trim(),
        _ => match extract_json_object(body) {
            Some(obj) => obj,
            None => return ProviderResult::Failure("malformed links: no JSON in reply".to_string()),
        },
    };
    let links = match serde_json::from_str::<RawLinks>(json) {
        Ok(RawLinks::Wrapped { links }) | Ok(RawLinks::Bare(links)) => links,
        Err(e) => return ProviderResult::Failure(format!("malformed links: {}", e)),
    };
    let links: Vec<LinkSuggestion> = links
        .into_iter()
        .filter(|l| !l.anchor.trim().is_empty() && !l.url.trim().is_empty())
        .collect();
    if links.is_empty() {
        ProviderResult::Empty
    } else {
        ProviderResult::Success(links)
    }
}
