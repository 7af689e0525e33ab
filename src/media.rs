//! Featured images
//!
//! An [`ImageEngine`] turns a generated item into image bytes. The engine is chosen
//! once from configuration: provider image generation ([`RemoteImageEngine`]) or a
//! stock photo with a tinted caption band ([`ServerImageEngine`]).

pub mod compose;
pub mod engine;
pub mod photo;

pub use engine::{build_engine, ImageEngine, RemoteImageEngine, ServerImageEngine};

use crate::content::GeneratedItem;

const FALLBACK_MIME: &str = "application/octet-stream";

/// Encoded image bytes plus their MIME type.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageBlob {
    pub bytes: Vec<u8>,
    pub mime: String,
}

impl ImageBlob {
    /// Trust an `image/*` MIME hint, otherwise sniff the bytes.
    pub fn new(bytes: Vec<u8>, mime: Option<String>) -> Self {
        let mime = mime
            .map(|m| m.split(';').next().unwrap_or_default().trim().to_string())
            .filter(|m| m.starts_with("image/"))
            .unwrap_or_else(|| sniff_mime(&bytes));
        Self { bytes, mime }
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self::new(bytes, None)
    }

    pub fn extension(&self) -> &'static str {
        match self.mime.as_str() {
            "image/png" => "png",
            "image/jpeg" => "jpg",
            "image/webp" => "webp",
            "image/gif" => "gif",
            _ => "bin",
        }
    }
}

fn sniff_mime(bytes: &[u8]) -> String {
    image::guess_format(bytes)
        .map(|format| format.to_mime_type().to_string())
        .unwrap_or_else(|_| FALLBACK_MIME.to_string())
}

/// Fill `{{title}}` and `{{summary}}` in the caption template.
pub fn render_caption(template: &str, item: &GeneratedItem) -> String {
    let caption = template
        .replace("{{title}}", item.title.trim())
        .replace("{{summary}}", item.summary_text());
    let caption = caption.trim();
    if caption.is_empty() {
        item.title.trim().to_string()
    } else {
        caption.to_string()
    }
}
