//! Texture overlay: a full-page background texture above the grid.

use image::RgbaImage;
use image::imageops::{self, FilterType};

use super::cover_crop;

// ============================================================================
// TextureOverlayConfig
// ============================================================================

/// A texture drawn cover-fit across the whole page at an opacity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureOverlayConfig {
    /// Texture URI, or `None` for no overlay. Empty selections map to
    /// `None` via [`set_path`](Self::set_path).
    pub path: Option<String>,

    /// Overlay opacity in percent, 0..=100.
    pub opacity_pct: u8,
}

impl Default for TextureOverlayConfig {
    fn default() -> Self {
        Self {
            path: None,
            opacity_pct: 100,
        }
    }
}

impl TextureOverlayConfig {
    /// True when a texture is selected and visible.
    pub fn is_active(&self) -> bool {
        self.path.is_some() && self.opacity_pct > 0
    }

    /// Selects a texture; an empty path clears the selection.
    pub fn set_path(&mut self, path: &str) -> bool {
        let next = if path.is_empty() {
            None
        } else {
            Some(path.to_string())
        };
        if next == self.path {
            return false;
        }
        self.path = next;
        true
    }

    /// Sets the opacity, clamped to 0..=100.
    pub fn set_opacity(&mut self, pct: u8) -> bool {
        let pct = pct.min(100);
        if pct == self.opacity_pct {
            return false;
        }
        self.opacity_pct = pct;
        true
    }
}

// ============================================================================
// Compositing
// ============================================================================

/// Draws `texture` cover-fit over the whole page, source-over at the
/// configured opacity.
pub fn composite_texture(page: &mut RgbaImage, texture: &RgbaImage, opacity_pct: u8) {
    if opacity_pct == 0 || texture.width() == 0 || texture.height() == 0 {
        return;
    }

    let (pw, ph) = page.dimensions();
    let (cx, cy, cw, ch) = cover_crop(texture.width(), texture.height(), pw, ph);
    let cropped = imageops::crop_imm(texture, cx, cy, cw, ch).to_image();
    let scaled = imageops::resize(&cropped, pw, ph, FilterType::Triangle);

    let opacity = f32::from(opacity_pct.min(100)) / 100.0;
    for (dst, src) in page.pixels_mut().zip(scaled.pixels()) {
        let sa = (src[3] as f32 / 255.0) * opacity;
        for c in 0..3 {
            let d = dst[c] as f32 / 255.0;
            let s = src[c] as f32 / 255.0;
            dst[c] = ((s * sa + d * (1.0 - sa)) * 255.0).round() as u8;
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
