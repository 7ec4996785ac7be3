//! Movable text overlay and its raster rendering.
//!
//! On screen the text is a draggable element styled by the DOM adapter from
//! this config; offsets are kept in the 816x1056 page reference space so the
//! exporter can consume them unscaled. In the raster the text is drawn
//! center-anchored and baseline-centered at `page center + offsets`, with no
//! image filters applied. Underline is a live-only style: the raster export
//! never draws it.

use ab_glyph::{Font, FontArc, Glyph, ScaleFont, point};
use image::{Rgba, RgbaImage};
use serde::{Deserialize, Serialize};

use super::alpha_blend;
use super::paint::parse_hex;

// ============================================================================
// TextLayer
// ============================================================================

/// Where the text sits relative to the paint wash.
///
/// The paint wash is the reference plane: toggling is only meaningful (and
/// only permitted) while paint is enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
#[serde(rename_all = "camelCase")]
pub enum TextLayer {
    /// Between the texture overlay and the paint wash.
    #[default]
    BelowPaint,
    /// Above everything.
    AbovePaint,
}

// ============================================================================
// TextOverlayConfig
// ============================================================================

/// Text overlay settings.
#[derive(Debug, Clone, PartialEq)]
pub struct TextOverlayConfig {
    /// The text itself; empty means no overlay.
    pub content: String,

    /// CSS-style font family list.
    pub font_family: String,

    /// Font size in page pixels.
    pub font_size_px: u32,

    /// Text color as `#RRGGBB`.
    pub color: String,

    /// Bold toggle.
    pub bold: bool,

    /// Italic toggle.
    pub italic: bool,

    /// Underline toggle (live style only; never rasterized).
    pub underline: bool,

    /// Drag offset from the page center, in page pixels.
    pub offset_x: f32,

    /// Drag offset from the page center, in page pixels.
    pub offset_y: f32,

    /// Stacking position relative to the paint wash.
    pub layer: TextLayer,
}

impl Default for TextOverlayConfig {
    fn default() -> Self {
        Self {
            content: String::new(),
            font_family: "Arial, sans-serif".to_string(),
            font_size_px: 24,
            color: "#212529".to_string(),
            bold: false,
            italic: false,
            underline: false,
            offset_x: 0.0,
            offset_y: 0.0,
            layer: TextLayer::BelowPaint,
        }
    }
}

impl TextOverlayConfig {
    /// True when there is text to show.
    pub fn is_visible(&self) -> bool {
        !self.content.is_empty()
    }

    /// Sets the content (trimmed); returns whether it changed.
    pub fn set_content(&mut self, content: &str) -> bool {
        let trimmed = content.trim();
        if self.content == trimmed {
            return false;
        }
        self.content = trimmed.to_string();
        true
    }

    /// The text color as RGB, falling back to the neutral default.
    pub fn rgb(&self) -> (u8, u8, u8) {
        parse_hex(&self.color).unwrap_or((0x21, 0x25, 0x29))
    }
}

// ============================================================================
// Raster rendering
// ============================================================================

/// Draws the overlay text onto the page, center-anchored at
/// `page center + offsets` with the baseline centered in the em box,
/// matching canvas `textAlign: center` / `textBaseline: middle`.
pub fn draw_text(page: &mut RgbaImage, font: &FontArc, config: &TextOverlayConfig) {
    if !config.is_visible() {
        return;
    }

    let scale = config.font_size_px.max(1) as f32;
    let scaled = font.as_scaled(scale);

    let center_x = page.width() as f32 / 2.0 + config.offset_x;
    let center_y = page.height() as f32 / 2.0 + config.offset_y;

    let width = line_width(font, scale, &config.content);
    let baseline = center_y + (scaled.ascent() + scaled.descent()) / 2.0;
    let mut caret = center_x - width / 2.0;

    let (r, g, b) = config.rgb();
    let mut prev: Option<ab_glyph::GlyphId> = None;

    for ch in config.content.chars() {
        let id = font.glyph_id(ch);
        if let Some(prev_id) = prev {
            caret += scaled.kern(prev_id, id);
        }
        let glyph: Glyph = id.with_scale_and_position(scale, point(caret, baseline));
        if let Some(outlined) = font.outline_glyph(glyph) {
            let bounds = outlined.px_bounds();
            outlined.draw(|px, py, coverage| {
                let x = bounds.min.x + px as f32;
                let y = bounds.min.y + py as f32;
                if x < 0.0 || y < 0.0 || x >= page.width() as f32 || y >= page.height() as f32 {
                    return;
                }
                let alpha = (coverage.clamp(0.0, 1.0) * 255.0).round() as u8;
                if alpha == 0 {
                    return;
                }
                let (x, y) = (x as u32, y as u32);
                let dst = *page.get_pixel(x, y);
                page.put_pixel(x, y, alpha_blend(Rgba([r, g, b, alpha]), dst));
            });
        }
        caret += scaled.h_advance(id);
        prev = Some(id);
    }
}

/// Advance-plus-kerning width of a single line at the given scale.
fn line_width(font: &FontArc, scale: f32, text: &str) -> f32 {
    let scaled = font.as_scaled(scale);
    let mut width = 0.0f32;
    let mut prev: Option<ab_glyph::GlyphId> = None;
    for ch in text.chars() {
        let id = font.glyph_id(ch);
        if let Some(prev_id) = prev {
            width += scaled.kern(prev_id, id);
        }
        width += scaled.h_advance(id);
        prev = Some(id);
    }
    width
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_values() {
        let config = TextOverlayConfig::default();
        assert!(!config.is_visible());
        assert_eq!(config.font_family, "Arial, sans-serif");
        assert_eq!(config.font_size_px, 24);
        assert_eq!(config.color, "#212529");
        assert_eq!(config.layer, TextLayer::BelowPaint);
        assert_eq!((config.offset_x, config.offset_y), (0.0, 0.0));
    }

    #[test]
    fn set_content_trims_and_reports_changes() {
        let mut config = TextOverlayConfig::default();
        assert!(config.set_content("  hello  "));
        assert_eq!(config.content, "hello");
        assert!(config.is_visible());
        assert!(!config.set_content("hello"));
        assert!(config.set_content(""));
        assert!(!config.is_visible());
    }

    #[test]
    fn invalid_color_falls_back_to_neutral_default() {
        let mut config = TextOverlayConfig::default();
        config.color = "nope".to_string();
        assert_eq!(config.rgb(), (0x21, 0x25, 0x29));
    }

    #[test]
    fn text_layer_serializes_camel_case() {
        assert_eq!(
            serde_json::to_string(&TextLayer::BelowPaint).unwrap(),
            "\"belowPaint\""
        );
        assert_eq!(
            serde_json::from_str::<TextLayer>("\"abovePaint\"").unwrap(),
            TextLayer::AbovePaint
        );
    }
}
