//! Local compositing: a tinted band across the lower part of a photo.

use super::ImageBlob;
use crate::error::AutomationError;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use std::io::Cursor;

/// Fraction of the image height covered by the band.
const BAND_RATIO: f32 = 0.35;
const BAND_OPACITY: f32 = 0.6;

/// Parse `#rgb`, `rgb`, `#rrggbb` or `rrggbb`.
pub fn parse_hex_color(raw: &str) -> Option<[u8; 3]> {
    let hex = raw.trim().trim_start_matches('#');
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    match hex.len() {
        3 => {
            let mut rgb = [0u8; 3];
            for (slot, c) in rgb.iter_mut().zip(hex.chars()) {
                let v = c.to_digit(16)? as u8;
                *slot = v * 16 + v;
            }
            Some(rgb)
        }
        6 => {
            let bytes = hex::decode(hex).ok()?;
            Some([bytes[0], bytes[1], bytes[2]])
        }
        _ => None,
    }
}

#[derive(Debug, Clone)]
pub struct OverlayCompositor {
    color: [u8; 3],
}

impl OverlayCompositor {
    pub fn new(color: [u8; 3]) -> Self {
        Self { color }
    }

    pub fn from_hex(raw: &str) -> Result<Self, AutomationError> {
        parse_hex_color(raw)
            .map(Self::new)
            .ok_or_else(|| AutomationError::ConfigError(format!("invalid overlay color '{}'", raw)))
    }

    /// Decode `photo`, blend the band and re-encode as JPEG.
    pub fn compose(&self, photo: &[u8]) -> Result<ImageBlob, AutomationError> {
        let decoded = image::load_from_memory(photo).map_err(|e| {
            AutomationError::SideEffectFailure(format!("Failed to decode photo: {}", e))
        })?;
        let mut canvas = decoded.to_rgb8();
        self.blend_band(&mut canvas);

        let mut encoded = Vec::new();
        DynamicImage::ImageRgb8(canvas)
            .write_to(&mut Cursor::new(&mut encoded), ImageFormat::Jpeg)
            .map_err(|e| {
                AutomationError::SideEffectFailure(format!("Failed to encode image: {}", e))
            })?;
        Ok(ImageBlob::new(encoded, Some("image/jpeg".to_string())))
    }

    fn blend_band(&self, canvas: &mut RgbImage) {
        let height = canvas.height();
        let band = ((height as f32) * BAND_RATIO).round() as u32;
        let top = height.saturating_sub(band);
        for y in top..height {
            for x in 0..canvas.width() {
                let Rgb(px) = *canvas.get_pixel(x, y);
                let mixed = [0, 1, 2].map(|i| {
                    let base = f32::from(px[i]) * (1.0 - BAND_OPACITY);
                    let tint = f32::from(self.color[i]) * BAND_OPACITY;
                    (base + tint).round().clamp(0.0, 255.0) as u8
                });
                canvas.put_pixel(x, y, Rgb(mixed));
            }
        }
    }
}
