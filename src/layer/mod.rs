//! Decoration layers stacked above the image grid.
//!
//! The page composes bottom to top:
//!
//! ```text
//! grid images          (per-image filter chain applied)
//!     │
//!     ▼
//! texture overlay      (cover-fit texture at an opacity)
//!     │
//!     ▼
//! paint wash           ("color" blend-mode full-bleed rectangle)
//!     │
//!     ▼
//! text                 (z-layer picks between-overlay-and-paint or on top)
//! ```
//!
//! The same configs drive both the live DOM adapter (via CSS-level
//! descriptors) and the raster exporter (via the pixel routines in these
//! modules), so screen and export agree by construction.

pub mod effects;
pub mod paint;
pub mod text;
pub mod texture;

pub use effects::{EffectKind, EffectState, FilterOp};
pub use paint::PaintConfig;
pub use text::{TextLayer, TextOverlayConfig};
pub use texture::TextureOverlayConfig;

use image::{Rgba, RgbaImage};

// ============================================================================
// Layer stack
// ============================================================================

/// The full-page decoration stack above the grid.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayerStack {
    /// Background-texture layer directly above the grid.
    pub texture: TextureOverlayConfig,

    /// Color wash above the texture.
    pub paint: PaintConfig,

    /// Movable text, below or above the paint wash.
    pub text: TextOverlayConfig,
}

// ============================================================================
// Compositing helpers
// ============================================================================

/// Centered cover-fit crop: the source region that fills `dst_w x dst_h`
/// without distortion.
///
/// A relatively wider image loses its left/right margins, a relatively
/// taller one loses top/bottom; the crop is always centered.
pub fn cover_crop(src_w: u32, src_h: u32, dst_w: u32, dst_h: u32) -> (u32, u32, u32, u32) {
    let src_aspect = src_w as f32 / src_h as f32;
    let dst_aspect = dst_w as f32 / dst_h as f32;

    if src_aspect > dst_aspect {
        let crop_w = ((src_h as f32 * dst_aspect).round() as u32).clamp(1, src_w);
        let x = (src_w - crop_w) / 2;
        (x, 0, crop_w, src_h)
    } else {
        let crop_h = ((src_w as f32 / dst_aspect).round() as u32).clamp(1, src_h);
        let y = (src_h - crop_h) / 2;
        (0, y, src_w, crop_h)
    }
}

/// Source-over alpha blend of two straight-alpha pixels.
pub fn alpha_blend(src: Rgba<u8>, dst: Rgba<u8>) -> Rgba<u8> {
    let sa = src[3] as f32 / 255.0;
    let da = dst[3] as f32 / 255.0;
    let out_a = sa + da * (1.0 - sa);

    if out_a == 0.0 {
        return Rgba([0, 0, 0, 0]);
    }

    let blend = |s: u8, d: u8| -> u8 {
        let sf = s as f32 / 255.0;
        let df = d as f32 / 255.0;
        let out = (sf * sa + df * da * (1.0 - sa)) / out_a;
        (out * 255.0).round() as u8
    };

    Rgba([
        blend(src[0], dst[0]),
        blend(src[1], dst[1]),
        blend(src[2], dst[2]),
        (out_a * 255.0).round() as u8,
    ])
}

/// Composites `src` onto `dest` at `(x, y)` with source-over blending,
/// clipping anything outside the destination.
pub fn composite_over(dest: &mut RgbaImage, src: &RgbaImage, x: i64, y: i64) {
    let dest_w = dest.width() as i64;
    let dest_h = dest.height() as i64;

    for sy in 0..src.height() {
        for sx in 0..src.width() {
            let dx = x + sx as i64;
            let dy = y + sy as i64;
            if dx < 0 || dy < 0 || dx >= dest_w || dy >= dest_h {
                continue;
            }

            let src_pixel = *src.get_pixel(sx, sy);
            let dst_pixel = *dest.get_pixel(dx as u32, dy as u32);
            dest.put_pixel(dx as u32, dy as u32, alpha_blend(src_pixel, dst_pixel));
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cover_crop_wider_image_crops_sides() {
        // 200x100 into a square: keep the middle 100x100.
        let (x, y, w, h) = cover_crop(200, 100, 50, 50);
        assert_eq!((x, y, w, h), (50, 0, 100, 100));
    }

    #[test]
    fn cover_crop_taller_image_crops_top_and_bottom() {
        let (x, y, w, h) = cover_crop(100, 300, 100, 100);
        assert_eq!((x, y, w, h), (0, 100, 100, 100));
    }

    #[test]
    fn cover_crop_matching_aspect_is_full_frame() {
        let (x, y, w, h) = cover_crop(400, 200, 200, 100);
        assert_eq!((x, y, w, h), (0, 0, 400, 200));
    }

    #[test]
    fn composite_opaque_replaces_and_clips() {
        let mut dest = RgbaImage::from_pixel(10, 10, Rgba([255, 0, 0, 255]));
        let src = RgbaImage::from_pixel(4, 4, Rgba([0, 0, 255, 255]));

        composite_over(&mut dest, &src, 8, 8);

        assert_eq!(dest.get_pixel(9, 9).0, [0, 0, 255, 255]);
        assert_eq!(dest.get_pixel(0, 0).0, [255, 0, 0, 255]);
    }

    #[test]
    fn composite_semitransparent_mixes() {
        let mut dest = RgbaImage::from_pixel(4, 4, Rgba([255, 0, 0, 255]));
        let src = RgbaImage::from_pixel(4, 4, Rgba([0, 0, 255, 128]));

        composite_over(&mut dest, &src, 0, 0);

        let px = dest.get_pixel(1, 1);
        assert!(px[0] > 0, "some red should remain");
        assert!(px[2] > 0, "some blue should land");
        assert_eq!(px[3], 255);
    }
}
