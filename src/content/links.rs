//! Internal linking: candidate lookup and anchor injection into generated HTML.

use crate::error::AutomationError;
use serde::{Deserialize, Serialize};

/// An existing item that may be linked to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkCandidate {
    pub title: String,
    pub url: String,
}

/// A provider-proposed link: wrap `anchor` (verbatim text from the body) around `url`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkSuggestion {
    pub anchor: String,
    pub url: String,
    #[serde(default)]
    pub title: Option<String>,
}

/// What the linking prompt is told about the new item.
#[derive(Debug, Clone)]
pub struct LinkSubject {
    pub title: String,
    pub excerpt: String,
    pub text: String,
}

pub trait LinkCandidateSource: Send + Sync {
    fn link_candidates(&self, limit: usize) -> Result<Vec<LinkCandidate>, AutomationError>;
}

/// Wrap the first free occurrence of each suggestion's anchor in a link.
///
/// Occurrences inside a tag or an existing `<a>` element are skipped. Returns the
/// new HTML and the number of links injected.
pub fn inject_links(html: &str, suggestions: &[LinkSuggestion]) -> (String, usize) {
    let mut out = html.to_string();
    let mut injected = 0;

    for suggestion in suggestions {
        let anchor = suggestion.anchor.trim();
        if anchor.is_empty() || suggestion.url.trim().is_empty() {
            continue;
        }
        let Some(pos) = find_linkable(&out, anchor) else {
            continue;
        };
        let href = suggestion.url.trim().replace('"', "%22");
        let title_attr = suggestion
            .title
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .map(|t| format!(" title=\"{}\"", t.trim().replace('"', "&quot;")))
            .unwrap_or_default();
        let replacement = format!(
            "<a href=\"{}\"{}>{}</a>",
            href,
            title_attr,
            &out[pos..pos + anchor.len()]
        );
        out.replace_range(pos..pos + anchor.len(), &replacement);
        injected += 1;
    }

    (out, injected)
}

fn find_linkable(html: &str, anchor: &str) -> Option<usize> {
    let mut from = 0;
    while let Some(rel) = html[from..].find(anchor) {
        let pos = from + rel;
        if is_linkable(&html[..pos]) {
            return Some(pos);
        }
        from = pos + anchor.len();
    }
    None
}

fn is_linkable(before: &str) -> bool {
    let inside_tag = match (before.rfind('<'), before.rfind('>')) {
        (Some(open), Some(close)) => open > close,
        (Some(_), None) => true,
        _ => false,
    };
    if inside_tag {
        return false;
    }
    let lower = before.to_ascii_lowercase();
    let opened = lower.matches("<a ").count() + lower.matches("<a>").count();
    let closed = lower.matches("</a>").count();
    opened <= closed
}
