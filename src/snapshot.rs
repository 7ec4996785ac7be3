//! Serializable snapshot of the full composer state.
//!
//! A [`CollageSnapshot`] captures everything a persistence collaborator
//! (saves, favorites, URL codec) needs to reconstruct the screen exactly:
//! the composition as a layout name plus stable image ids, the active tag
//! filter, the effect chain, and the overlay/paint/text settings.
//!
//! Serialization uses camelCase JSON. Deserialization is partial-failure
//! tolerant: inside a valid JSON object, any missing or wrong-typed field
//! falls back to its documented default instead of failing the restore.
//!
//! # Example
//!
//! ```
//! use collage_composer::CollageSnapshot;
//!
//! let snapshot = CollageSnapshot::default();
//! let json = snapshot.to_json().unwrap();
//! let restored = CollageSnapshot::from_json(&json).unwrap();
//! assert_eq!(snapshot, restored);
//! ```

use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::error::{CollageError, CollageResult};
use crate::layer::effects::EffectKind;
use crate::layer::text::TextLayer;

// ============================================================================
// CollageSnapshot
// ============================================================================

/// A full, serializable picture of the composer state.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
pub struct CollageSnapshot {
    /// The pinned layout name, when the user explicitly chose one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_layout: Option<String>,

    /// The current layout name for unpinned compositions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layout: Option<String>,

    /// Composition images by stable catalog id, in slot order. Custom
    /// slots have no id and are omitted; the custom URL survives in
    /// `custom_image`.
    pub images: Vec<u32>,

    /// Active filter tags.
    pub tags: Vec<String>,

    /// Active effect chain, in insertion order.
    pub effects: Vec<EffectKind>,

    /// Blur radius in pixels (default 3).
    pub blur: u32,

    /// Glitch magnitude (default 10).
    pub glitch: u32,

    /// The user-supplied custom image URL, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_image: Option<String>,

    /// Text overlay content; empty means no text.
    pub text: String,

    /// Text font family (default "Arial, sans-serif").
    pub text_font: String,

    /// Text size in page pixels (default 24).
    pub text_size: u32,

    /// Text color (default "#212529").
    pub text_color: String,

    /// Bold toggle.
    pub text_bold: bool,

    /// Italic toggle.
    pub text_italic: bool,

    /// Underline toggle.
    pub text_underline: bool,

    /// Drag offset from page center, in page pixels.
    pub text_x: f32,

    /// Drag offset from page center, in page pixels.
    pub text_y: f32,

    /// Text stacking relative to the paint wash.
    pub text_layer: TextLayer,

    /// Texture overlay path, if one is selected.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overlay: Option<String>,

    /// Texture overlay opacity in percent (default 100).
    pub overlay_opacity: u8,

    /// Paint wash toggle.
    pub paint: bool,

    /// Paint wash color (default "#FFFF00").
    pub paint_color: String,

    /// Paint wash opacity in percent (default 50).
    pub paint_opacity: u8,
}

impl Default for CollageSnapshot {
    fn default() -> Self {
        Self {
            selected_layout: None,
            layout: None,
            images: Vec::new(),
            tags: Vec::new(),
            effects: Vec::new(),
            blur: 3,
            glitch: 10,
            custom_image: None,
            text: String::new(),
            text_font: "Arial, sans-serif".to_string(),
            text_size: 24,
            text_color: "#212529".to_string(),
            text_bold: false,
            text_italic: false,
            text_underline: false,
            text_x: 0.0,
            text_y: 0.0,
            text_layer: TextLayer::BelowPaint,
            overlay: None,
            overlay_opacity: 100,
            paint: false,
            paint_color: "#FFFF00".to_string(),
            paint_opacity: 50,
        }
    }
}

impl CollageSnapshot {
    /// Serializes to a JSON string.
    pub fn to_json(&self) -> CollageResult<String> {
        serde_json::to_string(self).map_err(|e| CollageError::snapshot(e.to_string()))
    }

    /// Serializes to pretty-printed JSON.
    pub fn to_json_pretty(&self) -> CollageResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| CollageError::snapshot(e.to_string()))
    }

    /// Deserializes from JSON, tolerantly.
    ///
    /// The blob must be a JSON object; beyond that, every field falls back
    /// to its default when missing or malformed, so a partially corrupted
    /// save still restores as much as it can.
    pub fn from_json(json: &str) -> CollageResult<Self> {
        let value: Value =
            serde_json::from_str(json).map_err(|e| CollageError::snapshot(e.to_string()))?;
        let Value::Object(map) = value else {
            return Err(CollageError::snapshot("snapshot must be a JSON object"));
        };

        let defaults = Self::default();
        Ok(Self {
            selected_layout: get_opt_string(&map, "selectedLayout"),
            layout: get_opt_string(&map, "layout"),
            images: get_ids(&map, "images"),
            tags: get_strings(&map, "tags"),
            effects: get_effects(&map, "effects"),
            blur: get_u32(&map, "blur", defaults.blur),
            glitch: get_u32(&map, "glitch", defaults.glitch),
            custom_image: get_opt_string(&map, "customImage"),
            text: get_string(&map, "text", &defaults.text),
            text_font: get_string(&map, "textFont", &defaults.text_font),
            text_size: get_u32(&map, "textSize", defaults.text_size),
            text_color: get_string(&map, "textColor", &defaults.text_color),
            text_bold: get_bool(&map, "textBold", defaults.text_bold),
            text_italic: get_bool(&map, "textItalic", defaults.text_italic),
            text_underline: get_bool(&map, "textUnderline", defaults.text_underline),
            text_x: get_f32(&map, "textX", defaults.text_x),
            text_y: get_f32(&map, "textY", defaults.text_y),
            text_layer: get_text_layer(&map, "textLayer"),
            overlay: get_opt_string(&map, "overlay"),
            overlay_opacity: get_u8(&map, "overlayOpacity", defaults.overlay_opacity),
            paint: get_bool(&map, "paint", defaults.paint),
            paint_color: get_string(&map, "paintColor", &defaults.paint_color),
            paint_opacity: get_u8(&map, "paintOpacity", defaults.paint_opacity),
        })
    }
}

// ============================================================================
// Tolerant field extraction
// ============================================================================

type Map = serde_json::Map<String, Value>;

fn get_string(map: &Map, key: &str, default: &str) -> String {
    match map.get(key) {
        Some(Value::String(s)) => s.clone(),
        _ => default.to_string(),
    }
}

fn get_opt_string(map: &Map, key: &str) -> Option<String> {
    match map.get(key) {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}

fn get_u32(map: &Map, key: &str, default: u32) -> u32 {
    map.get(key)
        .and_then(Value::as_u64)
        .and_then(|n| u32::try_from(n).ok())
        .unwrap_or(default)
}

fn get_u8(map: &Map, key: &str, default: u8) -> u8 {
    map.get(key)
        .and_then(Value::as_u64)
        .and_then(|n| u8::try_from(n).ok())
        .unwrap_or(default)
}

fn get_f32(map: &Map, key: &str, default: f32) -> f32 {
    map.get(key)
        .and_then(Value::as_f64)
        .map(|n| n as f32)
        .filter(|n| n.is_finite())
        .unwrap_or(default)
}

fn get_bool(map: &Map, key: &str, default: bool) -> bool {
    map.get(key).and_then(Value::as_bool).unwrap_or(default)
}

fn get_ids(map: &Map, key: &str) -> Vec<u32> {
    match map.get(key) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_u64().and_then(|n| u32::try_from(n).ok()))
            .collect(),
        _ => Vec::new(),
    }
}

fn get_strings(map: &Map, key: &str) -> Vec<String> {
    match map.get(key) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    }
}

fn get_effects(map: &Map, key: &str) -> Vec<EffectKind> {
    let tokens = get_strings(map, key);
    let mut kinds = Vec::with_capacity(tokens.len());
    for token in &tokens {
        match EffectKind::parse(token) {
            Some(kind) if !kinds.contains(&kind) => kinds.push(kind),
            Some(_) => {}
            None => warn!(token = %token, "ignoring unknown effect in snapshot"),
        }
    }
    kinds
}

fn get_text_layer(map: &Map, key: &str) -> TextLayer {
    match map.get(key).and_then(Value::as_str) {
        Some("abovePaint") => TextLayer::AbovePaint,
        _ => TextLayer::BelowPaint,
    }
}

// ============================================================================
// Tests
// ============================================================================
