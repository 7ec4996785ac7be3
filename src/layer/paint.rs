//! Paint wash: a full-bleed color layer composited in "color" blend mode.
//!
//! The wash derives hue and saturation from its hex color and replaces the
//! backdrop's hue/chroma while preserving its luminosity, then mixes by
//! opacity. While the wash is active, grid images render fully desaturated
//! (wired through the effect chain, see `effects::EffectState::export_ops`).

use image::RgbaImage;
use palette::{Hsl, IntoColor, Srgb};

// ============================================================================
// PaintConfig
// ============================================================================

/// Paint wash settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaintConfig {
    /// Master toggle.
    pub enabled: bool,

    /// Wash color as `#RRGGBB`.
    pub color: String,

    /// Wash opacity in percent, 0..=100.
    pub opacity_pct: u8,
}

impl Default for PaintConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            color: "#FFFF00".to_string(),
            opacity_pct: 50,
        }
    }
}

impl PaintConfig {
    /// True when the wash actually renders (enabled with nonzero opacity).
    /// This is also the condition that forces grid images to desaturate.
    pub fn is_active(&self) -> bool {
        self.enabled && self.opacity_pct > 0
    }

    /// Sets the wash color; returns whether it changed.
    pub fn set_color(&mut self, color: &str) -> bool {
        if self.color == color {
            return false;
        }
        self.color = color.to_string();
        true
    }

    /// Sets the opacity, clamped to 0..=100; returns whether it changed.
    pub fn set_opacity(&mut self, pct: u8) -> bool {
        let pct = pct.min(100);
        if pct == self.opacity_pct {
            return false;
        }
        self.opacity_pct = pct;
        true
    }

    /// The wash color as RGB components. Unparseable colors fall back to
    /// black, mirroring the original hex parser.
    pub fn rgb(&self) -> (u8, u8, u8) {
        parse_hex(&self.color).unwrap_or((0, 0, 0))
    }

    /// Derived hue in whole degrees (0..360).
    pub fn hue_deg(&self) -> u32 {
        let (h, _) = hue_saturation(self.rgb());
        h
    }

    /// Derived saturation in whole percent (0..=100).
    pub fn saturation_pct(&self) -> u32 {
        let (_, s) = hue_saturation(self.rgb());
        s
    }
}

// ============================================================================
// Color math
// ============================================================================

/// Parses `#RRGGBB` (leading `#` optional).
pub fn parse_hex(hex: &str) -> Option<(u8, u8, u8)> {
    let digits = hex.strip_prefix('#').unwrap_or(hex);
    if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let r = u8::from_str_radix(&digits[0..2], 16).ok()?;
    let g = u8::from_str_radix(&digits[2..4], 16).ok()?;
    let b = u8::from_str_radix(&digits[4..6], 16).ok()?;
    Some((r, g, b))
}

/// Standard RGB→HSL hue (whole degrees) and saturation (whole percent).
pub fn hue_saturation((r, g, b): (u8, u8, u8)) -> (u32, u32) {
    let rgb = Srgb::new(
        f32::from(r) / 255.0,
        f32::from(g) / 255.0,
        f32::from(b) / 255.0,
    );
    let hsl: Hsl = rgb.into_color();
    let hue = hsl.hue.into_positive_degrees().round() as u32 % 360;
    let saturation = (hsl.saturation * 100.0).round() as u32;
    (hue, saturation)
}

/// Applies the wash to the page: per pixel, keep the backdrop lightness,
/// adopt the paint hue/saturation, then mix by opacity.
pub fn apply_wash(page: &mut RgbaImage, config: &PaintConfig) {
    if !config.is_active() {
        return;
    }

    let (pr, pg, pb) = config.rgb();
    let paint_hsl: Hsl = Srgb::new(
        f32::from(pr) / 255.0,
        f32::from(pg) / 255.0,
        f32::from(pb) / 255.0,
    )
    .into_color();
    let opacity = f32::from(config.opacity_pct.min(100)) / 100.0;

    for pixel in page.pixels_mut() {
        let [r, g, b, a] = pixel.0;
        let backdrop: Hsl = Srgb::new(
            f32::from(r) / 255.0,
            f32::from(g) / 255.0,
            f32::from(b) / 255.0,
        )
        .into_color();

        let washed: Srgb =
            Hsl::new(paint_hsl.hue, paint_hsl.saturation, backdrop.lightness).into_color();

        let mix = |base: u8, wash: f32| -> u8 {
            let base = f32::from(base) / 255.0;
            ((base * (1.0 - opacity) + wash * opacity) * 255.0).round() as u8
        };

        pixel.0 = [
            mix(r, washed.red),
            mix(g, washed.green),
            mix(b, washed.blue),
            a,
        ];
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn hex_parsing_accepts_optional_hash() {
        assert_eq!(parse_hex("#FF8000"), Some((255, 128, 0)));
        assert_eq!(parse_hex("ff8000"), Some((255, 128, 0)));
        assert_eq!(parse_hex("#FFF"), None);
        assert_eq!(parse_hex("#GGGGGG"), None);
    }

    #[test]
    fn white_and_black_have_zero_saturation() {
        assert_eq!(hue_saturation((255, 255, 255)).1, 0);
        assert_eq!(hue_saturation((0, 0, 0)).1, 0);
    }

    #[test]
    fn pure_red_is_hue_zero_fully_saturated() {
        assert_eq!(hue_saturation((255, 0, 0)), (0, 100));
    }

    #[test]
    fn pure_green_and_blue_hues() {
        assert_eq!(hue_saturation((0, 255, 0)).0, 120);
        assert_eq!(hue_saturation((0, 0, 255)).0, 240);
    }

    #[test]
    fn config_defaults_match_the_documented_values() {
        let config = PaintConfig::default();
        assert!(!config.enabled);
        assert_eq!(config.color, "#FFFF00");
        assert_eq!(config.opacity_pct, 50);
        assert!(!config.is_active());
    }

    #[test]
    fn unparseable_color_falls_back_to_black() {
        let mut config = PaintConfig::default();
        config.set_color("oops");
        assert_eq!(config.rgb(), (0, 0, 0));
    }

    #[test]
    fn full_opacity_wash_preserves_lightness_and_adopts_hue() {
        let mut page = RgbaImage::from_pixel(2, 2, Rgba([128, 128, 128, 255]));
        let config = PaintConfig {
            enabled: true,
            color: "#FF0000".to_string(),
            opacity_pct: 100,
        };
        apply_wash(&mut page, &config);

        let px = page.get_pixel(0, 0);
        // Mid-gray backdrop at lightness ~0.5 with red hue/saturation.
        assert!(px[0] > 200, "red channel should dominate, got {:?}", px.0);
        assert!(px[1] < 60);
        assert!(px[2] < 60);

        let (_, _, lightness) = {
            let hsl: Hsl = Srgb::new(
                f32::from(px[0]) / 255.0,
                f32::from(px[1]) / 255.0,
                f32::from(px[2]) / 255.0,
            )
            .into_color();
            (hsl.hue, hsl.saturation, hsl.lightness)
        };
        assert!((lightness - 128.0 / 255.0).abs() < 0.02);
    }

    #[test]
    fn disabled_or_zero_opacity_wash_is_a_noop() {
        let mut page = RgbaImage::from_pixel(2, 2, Rgba([10, 200, 30, 255]));
        let before = page.clone();

        let mut config = PaintConfig {
            enabled: false,
            color: "#FF0000".to_string(),
            opacity_pct: 100,
        };
        apply_wash(&mut page, &config);
        assert_eq!(page, before);

        config.enabled = true;
        config.opacity_pct = 0;
        apply_wash(&mut page, &config);
        assert_eq!(page, before);
    }

    #[test]
    fn half_opacity_only_shifts_halfway() {
        let mut page = RgbaImage::from_pixel(1, 1, Rgba([128, 128, 128, 255]));
        let config = PaintConfig {
            enabled: true,
            color: "#FF0000".to_string(),
            opacity_pct: 50,
        };
        apply_wash(&mut page, &config);
        let px = page.get_pixel(0, 0);
        assert!(px[0] > 128 && px[0] < 255);
        assert!(px[1] < 128 && px[1] > 0);
    }
}
