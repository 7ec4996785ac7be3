//! Per-image filter chain: effect kinds, live/export descriptors, raster ops.
//!
//! Each [`EffectKind`] maps through one explicit table to a *live
//! descriptor* (the CSS token the DOM adapter puts on every grid image) and
//! an *export descriptor* (a list of [`FilterOp`]s the exporter applies to
//! pixels). Effects compose additively in insertion order, so the chain
//! output is deterministic for a given active set. When the paint wash is
//! active, full desaturation is appended unconditionally last; that is the
//! only coupling between the effect pipeline and paint.

use image::RgbaImage;
use serde::{Deserialize, Serialize};

/// Luma weights used by the CSS `grayscale`/`sepia`/`saturate` matrices.
const LUMA: [f32; 3] = [0.2126, 0.7152, 0.0722];

// ============================================================================
// EffectKind
// ============================================================================

/// The closed set of selectable effects.
///
/// Definition order is the canonical order of the effects panel; the active
/// chain itself preserves user insertion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
#[serde(rename_all = "lowercase")]
pub enum EffectKind {
    /// Gaussian blur with a user-set radius.
    Blur,
    /// Edge punch approximated as contrast + brightness.
    Sharpen,
    /// Full sepia toning.
    Sepia,
    /// Doubled contrast and saturation.
    HighContrast,
    /// Faded warm look.
    Vintage,
    /// Flattened tones via contrast + saturation.
    Posterize,
    /// Relief look via contrast + partial desaturation.
    Emboss,
    /// Channel-shift look with a user-set magnitude.
    Glitch,
    /// Full color inversion.
    Invert,
}

impl EffectKind {
    /// Every kind, in definition order.
    pub const ALL: [EffectKind; 9] = [
        EffectKind::Blur,
        EffectKind::Sharpen,
        EffectKind::Sepia,
        EffectKind::HighContrast,
        EffectKind::Vintage,
        EffectKind::Posterize,
        EffectKind::Emboss,
        EffectKind::Glitch,
        EffectKind::Invert,
    ];

    /// The stable token used by snapshots and the live SVG filter ids.
    pub fn token(&self) -> &'static str {
        match self {
            EffectKind::Blur => "blur",
            EffectKind::Sharpen => "sharpen",
            EffectKind::Sepia => "sepia",
            EffectKind::HighContrast => "highcontrast",
            EffectKind::Vintage => "vintage",
            EffectKind::Posterize => "posterize",
            EffectKind::Emboss => "emboss",
            EffectKind::Glitch => "glitch",
            EffectKind::Invert => "invert",
        }
    }

    /// Parses a stable token back into a kind.
    pub fn parse(token: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|k| k.token() == token)
    }
}

// ============================================================================
// EffectState
// ============================================================================

/// The user's active effect chain plus the two scalar magnitudes.
///
/// Only blur and glitch carry a magnitude; every other kind is a fixed,
/// non-stacking transform.
#[derive(Debug, Clone, PartialEq)]
pub struct EffectState {
    active: Vec<EffectKind>,

    /// Blur radius in page pixels, clamped to 0..=10.
    pub blur_px: u32,

    /// Glitch displacement magnitude, clamped to 0..=20. Consumed by the
    /// live SVG displacement filter; the export approximation is fixed.
    pub glitch: u32,
}

impl Default for EffectState {
    fn default() -> Self {
        Self {
            active: Vec::new(),
            blur_px: 3,
            glitch: 10,
        }
    }
}

impl EffectState {
    /// The active chain in insertion order.
    pub fn active(&self) -> &[EffectKind] {
        &self.active
    }

    /// True if `kind` is in the chain.
    pub fn is_active(&self, kind: EffectKind) -> bool {
        self.active.contains(&kind)
    }

    /// Adds or removes `kind`; returns whether it is active afterwards.
    /// Adding an already-active kind is a no-op (no duplicate chain links).
    pub fn toggle(&mut self, kind: EffectKind) -> bool {
        if let Some(pos) = self.active.iter().position(|k| *k == kind) {
            self.active.remove(pos);
            false
        } else {
            self.active.push(kind);
            true
        }
    }

    /// Replaces the chain wholesale, preserving the given order and
    /// dropping duplicates.
    pub fn set_active(&mut self, kinds: &[EffectKind]) {
        self.active.clear();
        for &k in kinds {
            if !self.active.contains(&k) {
                self.active.push(k);
            }
        }
    }

    /// Sets the blur radius, clamped to 0..=10.
    pub fn set_blur_px(&mut self, px: u32) {
        self.blur_px = px.min(10);
    }

    /// Sets the glitch magnitude, clamped to 0..=20.
    pub fn set_glitch(&mut self, magnitude: u32) {
        self.glitch = magnitude.min(20);
    }

    /// CSS filter tokens for the live grid images, in chain order.
    ///
    /// Blur renders inline (`blur(Npx)`); every other kind references its
    /// SVG filter (`url(#svg-<token>)`). When `force_grayscale` is set
    /// (paint active), `grayscale(100%)` is appended last.
    pub fn live_filter_parts(&self, force_grayscale: bool) -> Vec<String> {
        let mut parts: Vec<String> = self
            .active
            .iter()
            .map(|kind| match kind {
                EffectKind::Blur => format!("blur({}px)", self.blur_px),
                other => format!("url(#svg-{})", other.token()),
            })
            .collect();
        if force_grayscale {
            parts.push("grayscale(100%)".to_string());
        }
        parts
    }

    /// The joined live filter string, or an empty string for no filters.
    pub fn live_filter(&self, force_grayscale: bool) -> String {
        self.live_filter_parts(force_grayscale).join(" ")
    }

    /// Raster ops for the exporter, in chain order, with the forced
    /// desaturation appended last when paint is active.
    pub fn export_ops(&self, force_grayscale: bool) -> Vec<FilterOp> {
        let mut ops = Vec::new();
        for kind in &self.active {
            match kind {
                EffectKind::Blur => ops.push(FilterOp::Blur {
                    radius_px: self.blur_px,
                }),
                EffectKind::Sharpen => {
                    ops.push(FilterOp::Contrast(1.5));
                    ops.push(FilterOp::Brightness(1.1));
                }
                EffectKind::Sepia => ops.push(FilterOp::Sepia(1.0)),
                EffectKind::HighContrast => {
                    ops.push(FilterOp::Contrast(2.0));
                    ops.push(FilterOp::Saturate(2.0));
                }
                EffectKind::Vintage => {
                    ops.push(FilterOp::Sepia(0.6));
                    ops.push(FilterOp::Contrast(0.8));
                    ops.push(FilterOp::Brightness(0.9));
                }
                EffectKind::Posterize => {
                    ops.push(FilterOp::Contrast(1.5));
                    ops.push(FilterOp::Saturate(1.5));
                }
                EffectKind::Emboss => {
                    ops.push(FilterOp::Contrast(2.0));
                    ops.push(FilterOp::Grayscale(0.3));
                }
                EffectKind::Glitch => {
                    ops.push(FilterOp::HueRotate(45.0));
                    ops.push(FilterOp::Saturate(1.5));
                }
                EffectKind::Invert => ops.push(FilterOp::Invert(1.0)),
            }
        }
        if force_grayscale {
            ops.push(FilterOp::Grayscale(1.0));
        }
        ops
    }
}

// ============================================================================
// FilterOp
// ============================================================================

/// One raster-level filter primitive with CSS filter-function semantics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FilterOp {
    /// Separable gaussian blur; radius in pixels.
    Blur {
        /// Kernel radius; 0 is the identity.
        radius_px: u32,
    },
    /// Channel multiplier.
    Brightness(f32),
    /// Contrast around mid-gray.
    Contrast(f32),
    /// Saturation scale; 0 is full desaturation, 1 identity.
    Saturate(f32),
    /// Sepia toning amount in 0..=1.
    Sepia(f32),
    /// Desaturation amount in 0..=1.
    Grayscale(f32),
    /// Hue rotation in degrees.
    HueRotate(f32),
    /// Inversion amount in 0..=1.
    Invert(f32),
}

impl FilterOp {
    /// The op as a 3x3 color matrix plus offset, if it is a color op.
    /// Returns `None` for [`FilterOp::Blur`].
    fn color_matrix(&self) -> Option<([f32; 9], [f32; 3])> {
        let [lr, lg, lb] = LUMA;
        match *self {
            FilterOp::Blur { .. } => None,
            FilterOp::Brightness(a) => Some(([a, 0.0, 0.0, 0.0, a, 0.0, 0.0, 0.0, a], [0.0; 3])),
            FilterOp::Contrast(a) => {
                let off = 0.5 - 0.5 * a;
                Some(([a, 0.0, 0.0, 0.0, a, 0.0, 0.0, 0.0, a], [off, off, off]))
            }
            FilterOp::Invert(a) => {
                let d = 1.0 - 2.0 * a;
                Some(([d, 0.0, 0.0, 0.0, d, 0.0, 0.0, 0.0, d], [a, a, a]))
            }
            FilterOp::Grayscale(a) => {
                let s = 1.0 - a.clamp(0.0, 1.0);
                Some((
                    [
                        lr + (1.0 - lr) * s,
                        lg - lg * s,
                        lb - lb * s,
                        lr - lr * s,
                        lg + (1.0 - lg) * s,
                        lb - lb * s,
                        lr - lr * s,
                        lg - lg * s,
                        lb + (1.0 - lb) * s,
                    ],
                    [0.0; 3],
                ))
            }
            FilterOp::Saturate(sat) => Some((
                [
                    lr + (1.0 - lr) * sat,
                    lg - lg * sat,
                    lb - lb * sat,
                    lr - lr * sat,
                    lg + (1.0 - lg) * sat,
                    lb - lb * sat,
                    lr - lr * sat,
                    lg - lg * sat,
                    lb + (1.0 - lb) * sat,
                ],
                [0.0; 3],
            )),
            FilterOp::Sepia(a) => {
                let s = 1.0 - a.clamp(0.0, 1.0);
                Some((
                    [
                        0.393 + 0.607 * s,
                        0.769 - 0.769 * s,
                        0.189 - 0.189 * s,
                        0.349 - 0.349 * s,
                        0.686 + 0.314 * s,
                        0.168 - 0.168 * s,
                        0.272 - 0.272 * s,
                        0.534 - 0.534 * s,
                        0.131 + 0.869 * s,
                    ],
                    [0.0; 3],
                ))
            }
            FilterOp::HueRotate(deg) => {
                let (sin, cos) = deg.to_radians().sin_cos();
                Some((
                    [
                        0.213 + cos * 0.787 - sin * 0.213,
                        0.715 - cos * 0.715 - sin * 0.715,
                        0.072 - cos * 0.072 + sin * 0.928,
                        0.213 - cos * 0.213 + sin * 0.143,
                        0.715 + cos * 0.285 + sin * 0.140,
                        0.072 - cos * 0.072 - sin * 0.283,
                        0.213 - cos * 0.213 - sin * 0.787,
                        0.715 - cos * 0.715 + sin * 0.715,
                        0.072 + cos * 0.928 + sin * 0.072,
                    ],
                    [0.0; 3],
                ))
            }
        }
    }
}

/// Applies a filter chain to an image in order, clamping after every op the
/// way stacked CSS filter functions do.
pub fn apply_ops(img: &mut RgbaImage, ops: &[FilterOp]) {
    for op in ops {
        if let FilterOp::Blur { radius_px } = op {
            blur_in_place(img, *radius_px);
        } else if let Some((m, off)) = op.color_matrix() {
            apply_color_matrix(img, m, off);
        }
    }
}

fn apply_color_matrix(img: &mut RgbaImage, m: [f32; 9], off: [f32; 3]) {
    for pixel in img.pixels_mut() {
        let [r, g, b, a] = pixel.0;
        let rf = r as f32 / 255.0;
        let gf = g as f32 / 255.0;
        let bf = b as f32 / 255.0;

        let nr = m[0] * rf + m[1] * gf + m[2] * bf + off[0];
        let ng = m[3] * rf + m[4] * gf + m[5] * bf + off[1];
        let nb = m[6] * rf + m[7] * gf + m[8] * bf + off[2];

        pixel.0 = [
            (nr.clamp(0.0, 1.0) * 255.0).round() as u8,
            (ng.clamp(0.0, 1.0) * 255.0).round() as u8,
            (nb.clamp(0.0, 1.0) * 255.0).round() as u8,
            a,
        ];
    }
}

// ============================================================================
// Gaussian blur
// ============================================================================

/// Separable gaussian blur with a fixed-point Q16 kernel, sigma = radius/2.
fn blur_in_place(img: &mut RgbaImage, radius: u32) {
    if radius == 0 || img.width() == 0 || img.height() == 0 {
        return;
    }

    let kernel = gaussian_kernel_q16(radius, radius as f32 / 2.0);
    let (width, height) = img.dimensions();
    let src = img.as_raw().clone();
    let mut tmp = vec![0u8; src.len()];
    let mut out = vec![0u8; src.len()];

    horizontal_pass(&src, &mut tmp, width, height, &kernel);
    vertical_pass(&tmp, &mut out, width, height, &kernel);
    img.copy_from_slice(&out);
}

fn gaussian_kernel_q16(radius: u32, sigma: f32) -> Vec<u32> {
    let r = radius as i32;
    let sigma = f64::from(sigma.max(0.01));
    let denom = 2.0 * sigma * sigma;

    let mut weights_f = Vec::with_capacity((2 * r + 1) as usize);
    let mut sum = 0.0f64;
    for i in -r..=r {
        let x = f64::from(i);
        let w = (-x * x / denom).exp();
        weights_f.push(w);
        sum += w;
    }

    let mut weights = Vec::with_capacity(weights_f.len());
    let mut acc: i64 = 0;
    for &wf in &weights_f {
        let q = ((wf / sum) * 65536.0).round() as i64;
        let q = q.clamp(0, 65536);
        weights.push(q as u32);
        acc += q;
    }

    // Push any rounding error into the center tap so the kernel sums to 1.
    let delta = 65536 - acc;
    if delta != 0 {
        let mid = weights.len() / 2;
        weights[mid] = (i64::from(weights[mid]) + delta).clamp(0, 65536) as u32;
    }

    weights
}

fn horizontal_pass(src: &[u8], dst: &mut [u8], width: u32, height: u32, k: &[u32]) {
    let radius = (k.len() / 2) as i32;
    let w = width as i32;
    for y in 0..height as i32 {
        for x in 0..w {
            let mut acc = [0u64; 4];
            for (ki, &kw) in k.iter().enumerate() {
                let sx = (x + ki as i32 - radius).clamp(0, w - 1);
                let idx = ((y * w + sx) as usize) * 4;
                for c in 0..4 {
                    acc[c] += u64::from(kw) * u64::from(src[idx + c]);
                }
            }
            let out = ((y * w + x) as usize) * 4;
            for c in 0..4 {
                dst[out + c] = q16_to_u8(acc[c]);
            }
        }
    }
}

fn vertical_pass(src: &[u8], dst: &mut [u8], width: u32, height: u32, k: &[u32]) {
    let radius = (k.len() / 2) as i32;
    let w = width as i32;
    let h = height as i32;
    for y in 0..h {
        for x in 0..w {
            let mut acc = [0u64; 4];
            for (ki, &kw) in k.iter().enumerate() {
                let sy = (y + ki as i32 - radius).clamp(0, h - 1);
                let idx = ((sy * w + x) as usize) * 4;
                for c in 0..4 {
                    acc[c] += u64::from(kw) * u64::from(src[idx + c]);
                }
            }
            let out = ((y * w + x) as usize) * 4;
            for c in 0..4 {
                dst[out + c] = q16_to_u8(acc[c]);
            }
        }
    }
}

fn q16_to_u8(acc: u64) -> u8 {
    (((acc + 32768) >> 16).min(255)) as u8
}

// ============================================================================
// Tests
// ============================================================================
