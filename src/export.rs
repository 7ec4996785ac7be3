//! Raster export: re-derives the on-screen composition into a Letter-page
//! JPEG.
//!
//! The exporter never copies screen pixels; it recomputes them from the same
//! state and geometry the live view uses (fractional grid rects, the effect
//! descriptor table, the paint/texture compositing routines), so screen and
//! export stay consistent by construction.
//!
//! IO is front-loaded behind [`AssetProvider`]: every referenced image is
//! resolved to a loaded-or-failed terminal state before compositing begins,
//! and a decode failure skips that image without aborting the export.

use ab_glyph::FontArc;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, Rgba, RgbaImage};
use image::imageops::{self, FilterType};
use tracing::{debug, warn};

use crate::composer::CollageComposer;
use crate::error::{CollageError, CollageResult};
use crate::layer::text::{self, TextLayer};
use crate::layer::{cover_crop, composite_over, effects, paint, texture};

/// Export width: a Letter page at 96 DPI.
pub const PAGE_WIDTH: u32 = 816;

/// Export height: a Letter page at 96 DPI.
pub const PAGE_HEIGHT: u32 = 1056;

/// JPEG quality used for the downloadable file.
const JPEG_QUALITY: u8 = 98;

// ============================================================================
// AssetProvider
// ============================================================================

/// Supplies decoded assets to the exporter.
///
/// Implementations own all IO and decoding (the browser image cache, a
/// filesystem loader, a test fixture). Returning an error marks that asset
/// failed; the exporter logs and skips it.
pub trait AssetProvider {
    /// Decodes the image at `path`.
    fn load_image(&self, path: &str) -> CollageResult<RgbaImage>;

    /// Resolves a font for the text overlay. The default implementation
    /// resolves nothing, in which case overlay text is skipped.
    fn load_font(&self, _family: &str, _bold: bool, _italic: bool) -> Option<FontArc> {
        None
    }
}

// ============================================================================
// ExportOutput
// ============================================================================

/// The finished export: encoded bytes plus a suggested download filename.
#[derive(Debug, Clone)]
pub struct ExportOutput {
    /// JPEG-encoded page.
    pub bytes: Vec<u8>,

    /// Timestamp-based filename, e.g. `collage_1733839200000.jpg`.
    pub filename: String,
}

/// The filename for an export triggered at `timestamp_millis`.
pub fn suggested_filename(timestamp_millis: i64) -> String {
    format!("collage_{timestamp_millis}.jpg")
}

// ============================================================================
// Rendering
// ============================================================================

/// Renders the composer's full visual state into an 816x1056 page.
///
/// Fails with [`CollageError::ExportNoContent`] when nothing is composed;
/// individual image decode failures are logged and skipped.
pub fn render_raster(
    composer: &CollageComposer,
    assets: &dyn AssetProvider,
) -> CollageResult<RgbaImage> {
    let placed = composer.placed();
    if placed.is_empty() {
        return Err(CollageError::ExportNoContent);
    }
    let rects = composer.page_rects();

    // Resolve every referenced image to a terminal state up front.
    let resolved: Vec<Option<RgbaImage>> = placed
        .iter()
        .map(|p| match assets.load_image(p.image.path()) {
            Ok(img) => Some(img),
            Err(err) => {
                warn!(path = p.image.path(), %err, "skipping undecodable image");
                None
            }
        })
        .collect();
    debug!(
        total = placed.len(),
        loaded = resolved.iter().filter(|r| r.is_some()).count(),
        "export join complete"
    );

    let mut page = RgbaImage::from_pixel(PAGE_WIDTH, PAGE_HEIGHT, Rgba([255, 255, 255, 255]));

    let paint_active = composer.layers.paint.is_active();
    let ops = composer.effects.export_ops(paint_active);

    for (rect, img) in rects.iter().zip(&resolved) {
        let Some(img) = img else { continue };
        let (dx, dy, dw, dh) = rect.to_pixels(PAGE_WIDTH, PAGE_HEIGHT);
        draw_cover(&mut page, img, dx, dy, dw, dh, &ops);
    }

    // Texture overlay above the grid.
    let texture_cfg = &composer.layers.texture;
    if texture_cfg.is_active() {
        let path = texture_cfg.path.as_deref().unwrap_or_default();
        match assets.load_image(path) {
            Ok(tex) => texture::composite_texture(&mut page, &tex, texture_cfg.opacity_pct),
            Err(err) => warn!(path, %err, "skipping undecodable overlay texture"),
        }
    }

    // Text sits between the overlay and the paint wash unless raised.
    let text_cfg = &composer.layers.text;
    if text_cfg.is_visible() && text_cfg.layer == TextLayer::BelowPaint {
        draw_overlay_text(&mut page, assets, composer);
    }

    paint::apply_wash(&mut page, &composer.layers.paint);

    if text_cfg.is_visible() && text_cfg.layer == TextLayer::AbovePaint {
        draw_overlay_text(&mut page, assets, composer);
    }

    Ok(page)
}

/// Renders and JPEG-encodes the page with a timestamped filename.
pub fn export(
    composer: &CollageComposer,
    assets: &dyn AssetProvider,
) -> CollageResult<ExportOutput> {
    let page = render_raster(composer, assets)?;

    let rgb = DynamicImage::ImageRgba8(page).to_rgb8();
    let mut bytes = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut bytes, JPEG_QUALITY);
    rgb.write_with_encoder(encoder)?;

    Ok(ExportOutput {
        bytes,
        filename: suggested_filename(chrono::Utc::now().timestamp_millis()),
    })
}

impl CollageComposer {
    /// Renders the current visual state into a raw 816x1056 raster.
    pub fn render_raster(&self, assets: &dyn AssetProvider) -> CollageResult<RgbaImage> {
        render_raster(self, assets)
    }

    /// Produces the downloadable JPEG plus its suggested filename.
    pub fn export(&self, assets: &dyn AssetProvider) -> CollageResult<ExportOutput> {
        export(self, assets)
    }
}

/// Draws one image cover-fit into its cell, with the filter chain applied.
fn draw_cover(
    page: &mut RgbaImage,
    img: &RgbaImage,
    dx: u32,
    dy: u32,
    dw: u32,
    dh: u32,
    ops: &[effects::FilterOp],
) {
    if img.width() == 0 || img.height() == 0 || dw == 0 || dh == 0 {
        return;
    }

    let (cx, cy, cw, ch) = cover_crop(img.width(), img.height(), dw, dh);
    let cropped = imageops::crop_imm(img, cx, cy, cw, ch).to_image();
    let mut cell = imageops::resize(&cropped, dw, dh, FilterType::Triangle);

    effects::apply_ops(&mut cell, ops);
    composite_over(page, &cell, i64::from(dx), i64::from(dy));
}

/// Draws the overlay text, unfiltered, if a font can be resolved.
fn draw_overlay_text(
    page: &mut RgbaImage,
    assets: &dyn AssetProvider,
    composer: &CollageComposer,
) {
    let cfg = &composer.layers.text;
    match assets.load_font(&cfg.font_family, cfg.bold, cfg.italic) {
        Some(font) => text::draw_text(page, &font, cfg),
        None => warn!(family = %cfg.font_family, "no font available; skipping overlay text"),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Catalog, CellSpan, Image, LayoutTemplate};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    /// Serves solid-color fixtures keyed by path; unknown paths fail.
    struct FixtureAssets;

    impl AssetProvider for FixtureAssets {
        fn load_image(&self, path: &str) -> CollageResult<RgbaImage> {
            let color = match path {
                "img/red.png" => [255, 0, 0, 255],
                "img/green.png" => [0, 255, 0, 255],
                "img/blue.png" => [0, 0, 255, 255],
                "img/tall.png" => return Ok(gradient(40, 160)),
                "img/wide.png" => return Ok(gradient(160, 40)),
                _ => return Err(CollageError::image_decode(path)),
            };
            Ok(RgbaImage::from_pixel(64, 64, Rgba(color)))
        }
    }

    /// Horizontal-and-vertical gradient so crops are distinguishable.
    fn gradient(w: u32, h: u32) -> RgbaImage {
        RgbaImage::from_fn(w, h, |x, y| {
            Rgba([
                (x * 255 / w.max(1)) as u8,
                (y * 255 / h.max(1)) as u8,
                128,
                255,
            ])
        })
    }

    fn catalog() -> Catalog {
        Catalog::new(
            vec![
                Image::new(0, "img/red.png", &["Solid"]),
                Image::new(1, "img/green.png", &["Solid"]),
                Image::new(2, "img/blue.png", &["Solid"]),
                Image::new(3, "img/broken.png", &["Broken"]),
            ],
            vec![LayoutTemplate::new(
                "half-and-quarters",
                vec![CellSpan::new(2, 2), CellSpan::new(1, 1), CellSpan::new(1, 1)],
            )],
        )
        .unwrap()
    }

    fn composed() -> CollageComposer {
        let mut composer = CollageComposer::new(catalog());
        composer.set_tags(vec!["Solid".to_string()]);
        composer
            .generate(&mut StdRng::seed_from_u64(1))
            .unwrap();
        composer
    }

    #[test]
    fn export_with_no_composition_is_rejected() {
        let composer = CollageComposer::new(catalog());
        let err = render_raster(&composer, &FixtureAssets).unwrap_err();
        assert!(matches!(err, CollageError::ExportNoContent));
        assert!(composer.export(&FixtureAssets).is_err());
    }

    #[test]
    fn page_has_exact_letter_dimensions() {
        let composer = composed();
        let page = composer.render_raster(&FixtureAssets).unwrap();
        assert_eq!(page.dimensions(), (PAGE_WIDTH, PAGE_HEIGHT));
    }

    #[test]
    fn grid_cells_are_painted_with_their_images() {
        let composer = composed();
        let page = composer.render_raster(&FixtureAssets).unwrap();

        // Three solid images in a 3-cell layout: every grid pixel belongs to
        // exactly one of the fixture colors.
        let rects = composer.page_rects();
        let placed = composer.placed();
        for (rect, p) in rects.iter().zip(&placed) {
            let (x, y, w, h) = rect.to_pixels(PAGE_WIDTH, PAGE_HEIGHT);
            let px = page.get_pixel(x + w / 2, y + h / 2);
            let expected = match p.image.path() {
                "img/red.png" => [255, 0, 0, 255],
                "img/green.png" => [0, 255, 0, 255],
                "img/blue.png" => [0, 0, 255, 255],
                other => panic!("unexpected fixture {other}"),
            };
            assert_eq!(px.0, expected, "cell for {}", p.image.path());
        }
    }

    #[test]
    fn decode_failures_skip_the_image_but_not_the_export() {
        let mut composer = CollageComposer::new(catalog());
        composer
            .generate(&mut StdRng::seed_from_u64(2))
            .unwrap();
        // Ensure the broken image is on the page.
        let has_broken = composer
            .placed()
            .iter()
            .any(|p| p.image.path() == "img/broken.png");
        let page = composer.render_raster(&FixtureAssets).unwrap();
        assert_eq!(page.dimensions(), (PAGE_WIDTH, PAGE_HEIGHT));
        // The export succeeded regardless of whether the broken image was
        // drawn; when it was present its cell stayed white.
        if has_broken {
            let idx = composer
                .placed()
                .iter()
                .position(|p| p.image.path() == "img/broken.png")
                .unwrap();
            let rect = composer.page_rects()[idx];
            let (x, y, w, h) = rect.to_pixels(PAGE_WIDTH, PAGE_HEIGHT);
            assert_eq!(page.get_pixel(x + w / 2, y + h / 2).0, [255, 255, 255, 255]);
        }
    }

    #[test]
    fn paint_desaturates_grid_images_in_export() {
        let mut composer = composed();
        composer.set_paint_enabled(true);
        composer.set_paint_opacity(50);
        composer.set_paint_color("#FF0000");

        let page = composer.render_raster(&FixtureAssets).unwrap();

        // A pure green cell desaturates to gray before the red wash lands,
        // so its red channel must now dominate its green channel's excess.
        let rect = composer
            .page_rects()
            .into_iter()
            .zip(composer.placed())
            .find(|(_, p)| p.image.path() == "img/green.png")
            .map(|(r, _)| r)
            .unwrap();
        let (x, y, w, h) = rect.to_pixels(PAGE_WIDTH, PAGE_HEIGHT);
        let px = page.get_pixel(x + w / 2, y + h / 2);
        assert!(
            px[0] >= px[1],
            "desaturated + red wash should not stay green-dominant, got {:?}",
            px.0
        );
    }

    #[test]
    fn effect_chain_changes_the_export() {
        let composer = composed();
        let plain = composer.render_raster(&FixtureAssets).unwrap();

        let mut inverted = composed();
        inverted.toggle_effect(crate::EffectKind::Invert);
        let page = inverted.render_raster(&FixtureAssets).unwrap();

        let rect = inverted.page_rects()[0];
        let (x, y, w, h) = rect.to_pixels(PAGE_WIDTH, PAGE_HEIGHT);
        let before = plain.get_pixel(x + w / 2, y + h / 2);
        let after = page.get_pixel(x + w / 2, y + h / 2);
        for c in 0..3 {
            assert_eq!(255 - before[c], after[c]);
        }
    }

    #[test]
    fn cover_fit_crops_the_longer_axis() {
        // A tall gradient into a wide cell keeps full width and crops
        // vertically: the cell's top row should not be the gradient's top.
        let catalog = Catalog::new(
            vec![Image::new(0, "img/tall.png", &[])],
            vec![LayoutTemplate::new("single", vec![CellSpan::new(2, 1)])],
        )
        .unwrap();
        let mut composer = CollageComposer::new(catalog);
        composer
            .generate(&mut StdRng::seed_from_u64(3))
            .unwrap();
        // Only one catalog image: the composition is that image alone.
        assert_eq!(composer.placed().len(), 1);

        let page = composer.render_raster(&FixtureAssets).unwrap();
        // Top edge of the page: green channel encodes source y. A centered
        // vertical crop means the top of the cell starts well below y=0.
        let top = page.get_pixel(PAGE_WIDTH / 2, 0);
        assert!(top[1] > 40, "expected a centered crop, got {:?}", top.0);
    }

    #[test]
    fn texture_overlay_tints_the_page() {
        let mut composer = composed();
        composer.set_texture("img/blue.png");
        composer.set_texture_opacity(100);

        let page = composer.render_raster(&FixtureAssets).unwrap();
        // Full-opacity blue texture covers everything.
        assert_eq!(page.get_pixel(10, 10).0, [0, 0, 255, 255]);
    }

    #[test]
    fn missing_texture_is_skipped() {
        let mut composer = composed();
        composer.set_texture("img/not-there.jpg");
        let page = composer.render_raster(&FixtureAssets).unwrap();
        assert_eq!(page.dimensions(), (PAGE_WIDTH, PAGE_HEIGHT));
    }

    #[test]
    fn text_without_a_font_is_skipped() {
        let mut composer = composed();
        composer.set_text_content("hello");
        // FixtureAssets resolves no fonts; the export must still succeed.
        let page = composer.render_raster(&FixtureAssets).unwrap();
        assert_eq!(page.dimensions(), (PAGE_WIDTH, PAGE_HEIGHT));
    }

    #[test]
    fn export_encodes_jpeg_with_timestamped_name() {
        let composer = composed();
        let output = composer.export(&FixtureAssets).unwrap();
        // JPEG SOI marker.
        assert_eq!(&output.bytes[..2], &[0xFF, 0xD8]);
        assert!(output.filename.starts_with("collage_"));
        assert!(output.filename.ends_with(".jpg"));
    }

    #[test]
    fn suggested_filename_embeds_the_timestamp() {
        assert_eq!(suggested_filename(1733839200000), "collage_1733839200000.jpg");
    }
}
