//! The composition engine: one explicit state aggregate plus every
//! user-facing operation.
//!
//! All ambient state of the collage (active tags, effect chain, current
//! composition, pin record, overlay/paint/text settings) lives in a single
//! [`CollageComposer`] owned by the UI layer. Operations mutate it
//! synchronously and return a [`StateChange`] describing what happened, so
//! the caller decides what to re-render; nothing here touches a DOM.
//!
//! Randomized operations take a caller-supplied [`rand::Rng`] so tests can
//! pin exact draws with a seeded generator.

use rand::Rng;
use rand::seq::SliceRandom;
use tracing::debug;

use crate::catalog::{Catalog, Image, LayoutTemplate, SlotImage};
use crate::error::{CollageError, CollageResult};
use crate::grid::{self, GridRect, PlacedImage};
use crate::layer::effects::{EffectKind, EffectState};
use crate::layer::text::TextLayer;
use crate::layer::LayerStack;
use crate::snapshot::CollageSnapshot;

// ============================================================================
// StateChange
// ============================================================================

/// What an operation did to the state, for the caller's re-render decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateChange {
    /// Layout and/or image selection changed; the grid must be rebuilt.
    Recomposed,
    /// A single slot changed; only that cell needs a new image.
    SlotReplaced {
        /// The slot that was replaced.
        index: usize,
    },
    /// The active tag filter changed.
    TagsChanged,
    /// The custom image URL changed.
    CustomImageChanged,
    /// The effect chain or an effect magnitude changed; restyle images.
    EffectsChanged,
    /// The texture overlay changed.
    OverlayChanged,
    /// The paint wash changed (images may need restyling too, since paint
    /// forces desaturation).
    PaintChanged,
    /// The text overlay changed.
    TextChanged,
    /// Nothing observable changed.
    Unchanged,
}

// ============================================================================
// Composition
// ============================================================================

/// The current collage: a layout plus the ordered images filling it.
#[derive(Debug, Clone, PartialEq)]
pub struct Composition {
    /// The layout in use.
    pub layout: LayoutTemplate,

    /// Ordered slot images; never empty while rendered.
    pub images: Vec<SlotImage>,
}

impl Composition {
    /// The derived cell/image pairing for rendering.
    pub fn placed(&self) -> Vec<PlacedImage> {
        grid::render(&self.layout, &self.images)
    }
}

/// The pin record: an explicitly chosen layout plus the image list and count
/// remembered for reuse across refreshes.
#[derive(Debug, Clone, PartialEq)]
struct PinnedLayout {
    layout: LayoutTemplate,
    images: Option<Vec<SlotImage>>,
    image_count: Option<usize>,
}

// ============================================================================
// CollageComposer
// ============================================================================

/// The collage engine.
///
/// # Example
///
/// ```
/// use collage_composer::{Catalog, CellSpan, CollageComposer, Image, LayoutTemplate};
/// use rand::SeedableRng;
///
/// let catalog = Catalog::new(
///     vec![
///         Image::new(0, "img/crane.jpg", &["Vintage", "Bird"]),
///         Image::new(1, "img/heron.png", &["Bird"]),
///         Image::new(2, "img/soda-ad.jpg", &["Advertisement"]),
///     ],
///     vec![LayoutTemplate::new(
///         "half-and-quarters",
///         vec![CellSpan::new(2, 2), CellSpan::new(1, 1), CellSpan::new(1, 1)],
///     )],
/// )
/// .unwrap();
///
/// let mut composer = CollageComposer::new(catalog);
/// let mut rng = rand::rngs::StdRng::seed_from_u64(7);
/// composer.generate(&mut rng).unwrap();
/// assert!(!composer.placed().is_empty());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct CollageComposer {
    catalog: Catalog,
    active_tags: Vec<String>,
    custom_image_url: Option<String>,
    composition: Option<Composition>,
    pinned: Option<PinnedLayout>,

    /// The per-image effect chain. Mutate directly or through the
    /// composer-level operations.
    pub effects: EffectState,

    /// The texture/paint/text decoration stack.
    pub layers: LayerStack,
}

impl CollageComposer {
    /// Creates an engine over a validated catalog, with nothing composed.
    pub fn new(catalog: Catalog) -> Self {
        Self {
            catalog,
            active_tags: Vec::new(),
            custom_image_url: None,
            composition: None,
            pinned: None,
            effects: EffectState::default(),
            layers: LayerStack::default(),
        }
    }

    /// The catalog this engine draws from.
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// The current composition, if one has been generated.
    pub fn composition(&self) -> Option<&Composition> {
        self.composition.as_ref()
    }

    /// Active filter tags.
    pub fn active_tags(&self) -> &[String] {
        &self.active_tags
    }

    /// The custom image URL, if set.
    pub fn custom_image_url(&self) -> Option<&str> {
        self.custom_image_url.as_deref()
    }

    /// True while a layout is explicitly pinned.
    pub fn is_pinned(&self) -> bool {
        self.pinned.is_some()
    }

    /// The pinned layout's name, if pinned.
    pub fn pinned_layout_name(&self) -> Option<&str> {
        self.pinned.as_ref().map(|p| p.layout.name.as_str())
    }

    /// Catalog images passing the active tag filter, in catalog order.
    pub fn filtered_images(&self) -> Vec<&Image> {
        self.catalog.filter_by_tags(&self.active_tags)
    }

    /// The derived cell/image pairing, or empty before the first generate.
    pub fn placed(&self) -> Vec<PlacedImage> {
        self.composition
            .as_ref()
            .map(Composition::placed)
            .unwrap_or_default()
    }

    /// Fractional page rectangles for the current composition's cells,
    /// in slot order.
    pub fn page_rects(&self) -> Vec<GridRect> {
        match &self.composition {
            Some(comp) => {
                let cells = grid::derive_cells(&comp.layout, comp.images.len());
                grid::placed_rects(&cells)
            }
            None => Vec::new(),
        }
    }

    /// The joined CSS filter string for the live grid images.
    pub fn image_filter(&self) -> String {
        self.effects.live_filter(self.layers.paint.is_active())
    }

    /// Catalog images of the current composition, in slot order, for the
    /// attribution/info listing. Custom slots carry no credit and are
    /// omitted.
    pub fn credits(&self) -> Vec<&Image> {
        self.composition
            .as_ref()
            .map(|comp| {
                comp.images
                    .iter()
                    .filter_map(|slot| slot.id().and_then(|id| self.catalog.image_by_id(id)))
                    .collect()
            })
            .unwrap_or_default()
    }

    // ------------------------------------------------------------------
    // Composition selection
    // ------------------------------------------------------------------

    /// Composes (or refreshes) the collage.
    ///
    /// Unpinned: a uniformly random layout, `max(native cell count,
    /// random 3..=6)` distinct images from the filtered catalog, and the
    /// custom image (if any) shuffled into a random position.
    ///
    /// Pinned: the pinned layout; on the first draw since pinning the same
    /// selection is made (honoring a remembered image count) and the custom
    /// image is appended last *without* reshuffling, then the list is
    /// remembered; subsequent refreshes reuse it verbatim.
    ///
    /// Fails with [`CollageError::NoMatchingImages`] when the tag filter
    /// leaves nothing to draw, leaving any prior composition untouched.
    pub fn generate(&mut self, rng: &mut impl Rng) -> CollageResult<StateChange> {
        let filtered: Vec<Image> = self.filtered_images().into_iter().cloned().collect();
        if filtered.is_empty() {
            return Err(CollageError::NoMatchingImages);
        }

        let composition = match &mut self.pinned {
            Some(pin) => {
                if let Some(images) = &pin.images {
                    debug!(layout = %pin.layout.name, count = images.len(), "reusing pinned selection");
                    Composition {
                        layout: pin.layout.clone(),
                        images: images.clone(),
                    }
                } else {
                    let native = pin.layout.cells.len();
                    let count = pin
                        .image_count
                        .unwrap_or_else(|| rng.gen_range(3..=6));
                    let n = native.max(count);

                    let mut images = draw_images(&filtered, n, rng);
                    if let Some(url) = &self.custom_image_url {
                        // Fixed last in pinned mode; no reshuffle.
                        images.push(SlotImage::Custom { url: url.clone() });
                    }

                    debug!(layout = %pin.layout.name, n, "drew pinned selection");
                    pin.images = Some(images.clone());
                    pin.image_count = Some(n);
                    Composition {
                        layout: pin.layout.clone(),
                        images,
                    }
                }
            }
            None => {
                let layout = self
                    .catalog
                    .layouts()
                    .choose(rng)
                    .expect("catalog guarantees at least one layout")
                    .clone();
                let n = layout.cells.len().max(rng.gen_range(3..=6));

                let mut images = draw_images(&filtered, n, rng);
                if let Some(url) = &self.custom_image_url {
                    images.push(SlotImage::Custom { url: url.clone() });
                    // Shuffle so the custom image's position is not fixed last.
                    images.shuffle(rng);
                }

                debug!(layout = %layout.name, n, "drew random selection");
                Composition { layout, images }
            }
        };

        self.composition = Some(composition);
        Ok(StateChange::Recomposed)
    }

    /// The "try again" action: forgets any remembered pinned images (the
    /// pinned layout itself stays pinned) and regenerates.
    pub fn shuffle(&mut self, rng: &mut impl Rng) -> CollageResult<StateChange> {
        if let Some(pin) = &mut self.pinned {
            pin.images = None;
        }
        self.generate(rng)
    }

    /// Pins a layout by name and re-renders.
    ///
    /// The currently displayed images (and their count) carry over as the
    /// pinned selection, so the visible composition survives the mode
    /// switch with only the layout changing.
    pub fn pin_layout(&mut self, name: &str, rng: &mut impl Rng) -> CollageResult<StateChange> {
        let layout = self
            .catalog
            .layout_by_name(name)
            .ok_or_else(|| CollageError::UnknownLayout(name.to_string()))?
            .clone();

        let carried = self
            .composition
            .as_ref()
            .filter(|comp| !comp.images.is_empty())
            .map(|comp| comp.images.clone());
        let count = carried.as_ref().map(Vec::len);

        debug!(layout = %layout.name, carried = carried.is_some(), "pinning layout");
        self.pinned = Some(PinnedLayout {
            layout,
            images: carried,
            image_count: count,
        });
        self.generate(rng)
    }

    /// Returns to fully random mode and re-renders.
    pub fn unpin_layout(&mut self, rng: &mut impl Rng) -> CollageResult<StateChange> {
        self.pinned = None;
        self.generate(rng)
    }

    /// Replaces the image at `index` with a random filtered image not
    /// already on the page (custom slots are exempt from the uniqueness
    /// check). When every candidate is already used, repeats are allowed.
    /// The layout and every other slot are untouched.
    pub fn replace_image(
        &mut self,
        index: usize,
        rng: &mut impl Rng,
    ) -> CollageResult<StateChange> {
        let filtered: Vec<Image> = self.filtered_images().into_iter().cloned().collect();
        if filtered.is_empty() {
            return Err(CollageError::NoMatchingImages);
        }

        let Some(comp) = &mut self.composition else {
            return Ok(StateChange::Unchanged);
        };
        if index >= comp.images.len() {
            debug!(index, "replace index out of range");
            return Ok(StateChange::Unchanged);
        }

        let used: Vec<&str> = comp
            .images
            .iter()
            .filter(|slot| !slot.is_custom())
            .map(SlotImage::path)
            .collect();
        let candidates: Vec<&Image> = filtered
            .iter()
            .filter(|img| !used.contains(&img.path.as_str()))
            .collect();

        let chosen = if candidates.is_empty() {
            filtered
                .choose(rng)
                .expect("filtered is non-empty")
                .clone()
        } else {
            (*candidates.choose(rng).expect("candidates is non-empty")).clone()
        };

        debug!(index, path = %chosen.path, "replacing slot");
        comp.images[index] = SlotImage::Catalog(chosen);

        // Keep the remembered pinned list in step so a pinned refresh does
        // not undo the replacement.
        if let Some(pin) = &mut self.pinned {
            if let Some(images) = &mut pin.images {
                if index < images.len() {
                    images[index] = comp.images[index].clone();
                }
            }
        }

        Ok(StateChange::SlotReplaced { index })
    }

    // ------------------------------------------------------------------
    // Filters and custom image
    // ------------------------------------------------------------------

    /// Replaces the active tag set. A change invalidates any remembered
    /// pinned images so the next refresh redraws from the new filter.
    pub fn set_tags(&mut self, tags: Vec<String>) -> StateChange {
        if self.active_tags == tags {
            return StateChange::Unchanged;
        }
        self.active_tags = tags;
        self.reset_pinned_images();
        StateChange::TagsChanged
    }

    /// Toggles a single tag on or off.
    pub fn toggle_tag(&mut self, tag: &str) -> StateChange {
        match self.active_tags.iter().position(|t| t == tag) {
            Some(pos) => {
                self.active_tags.remove(pos);
            }
            None => self.active_tags.push(tag.to_string()),
        }
        self.reset_pinned_images();
        StateChange::TagsChanged
    }

    /// Sets (or clears, for an empty string) the custom image URL. A change
    /// invalidates any remembered pinned images.
    pub fn set_custom_image(&mut self, url: &str) -> StateChange {
        let next = match url.trim() {
            "" => None,
            trimmed => Some(trimmed.to_string()),
        };
        if next == self.custom_image_url {
            return StateChange::Unchanged;
        }
        self.custom_image_url = next;
        self.reset_pinned_images();
        StateChange::CustomImageChanged
    }

    /// Clears the custom image URL.
    pub fn clear_custom_image(&mut self) -> StateChange {
        self.set_custom_image("")
    }

    fn reset_pinned_images(&mut self) {
        if let Some(pin) = &mut self.pinned {
            pin.images = None;
            pin.image_count = None;
        }
    }

    // ------------------------------------------------------------------
    // Effects
    // ------------------------------------------------------------------

    /// Toggles an effect in the chain.
    pub fn toggle_effect(&mut self, kind: EffectKind) -> StateChange {
        self.effects.toggle(kind);
        StateChange::EffectsChanged
    }

    /// Sets the blur radius (clamped to 0..=10).
    pub fn set_blur_px(&mut self, px: u32) -> StateChange {
        if self.effects.blur_px == px.min(10) {
            return StateChange::Unchanged;
        }
        self.effects.set_blur_px(px);
        StateChange::EffectsChanged
    }

    /// Sets the glitch magnitude (clamped to 0..=20).
    pub fn set_glitch(&mut self, magnitude: u32) -> StateChange {
        if self.effects.glitch == magnitude.min(20) {
            return StateChange::Unchanged;
        }
        self.effects.set_glitch(magnitude);
        StateChange::EffectsChanged
    }

    // ------------------------------------------------------------------
    // Overlay, paint, text
    // ------------------------------------------------------------------

    /// Selects a texture overlay (empty path clears it).
    pub fn set_texture(&mut self, path: &str) -> StateChange {
        if self.layers.texture.set_path(path) {
            StateChange::OverlayChanged
        } else {
            StateChange::Unchanged
        }
    }

    /// Sets the texture overlay opacity.
    pub fn set_texture_opacity(&mut self, pct: u8) -> StateChange {
        if self.layers.texture.set_opacity(pct) {
            StateChange::OverlayChanged
        } else {
            StateChange::Unchanged
        }
    }

    /// Enables or disables the paint wash.
    pub fn set_paint_enabled(&mut self, enabled: bool) -> StateChange {
        if self.layers.paint.enabled == enabled {
            return StateChange::Unchanged;
        }
        self.layers.paint.enabled = enabled;
        StateChange::PaintChanged
    }

    /// Sets the paint wash color.
    pub fn set_paint_color(&mut self, color: &str) -> StateChange {
        if self.layers.paint.set_color(color) {
            StateChange::PaintChanged
        } else {
            StateChange::Unchanged
        }
    }

    /// Sets the paint wash opacity.
    pub fn set_paint_opacity(&mut self, pct: u8) -> StateChange {
        if self.layers.paint.set_opacity(pct) {
            StateChange::PaintChanged
        } else {
            StateChange::Unchanged
        }
    }

    /// Sets the overlay text (trimmed; empty hides it).
    pub fn set_text_content(&mut self, content: &str) -> StateChange {
        if self.layers.text.set_content(content) {
            StateChange::TextChanged
        } else {
            StateChange::Unchanged
        }
    }

    /// Sets the text font family.
    pub fn set_text_font(&mut self, family: &str) -> StateChange {
        if self.layers.text.font_family == family {
            return StateChange::Unchanged;
        }
        self.layers.text.font_family = family.to_string();
        StateChange::TextChanged
    }

    /// Sets the text size in page pixels.
    pub fn set_text_size(&mut self, px: u32) -> StateChange {
        let px = px.max(1);
        if self.layers.text.font_size_px == px {
            return StateChange::Unchanged;
        }
        self.layers.text.font_size_px = px;
        StateChange::TextChanged
    }

    /// Sets the text color.
    pub fn set_text_color(&mut self, color: &str) -> StateChange {
        if self.layers.text.color == color {
            return StateChange::Unchanged;
        }
        self.layers.text.color = color.to_string();
        StateChange::TextChanged
    }

    /// Sets the bold/italic/underline styles.
    pub fn set_text_style(&mut self, bold: bool, italic: bool, underline: bool) -> StateChange {
        let text = &mut self.layers.text;
        if (text.bold, text.italic, text.underline) == (bold, italic, underline) {
            return StateChange::Unchanged;
        }
        text.bold = bold;
        text.italic = italic;
        text.underline = underline;
        StateChange::TextChanged
    }

    /// Moves the text's drag offset (page reference pixels from center).
    pub fn set_text_offset(&mut self, x: f32, y: f32) -> StateChange {
        let text = &mut self.layers.text;
        if (text.offset_x, text.offset_y) == (x, y) {
            return StateChange::Unchanged;
        }
        text.offset_x = x;
        text.offset_y = y;
        StateChange::TextChanged
    }

    /// Moves the text relative to the paint wash. Paint is the reference
    /// plane, so this is a no-op unless paint is enabled.
    pub fn set_text_layer(&mut self, layer: TextLayer) -> StateChange {
        if !self.layers.paint.enabled || self.layers.text.layer == layer {
            return StateChange::Unchanged;
        }
        self.layers.text.layer = layer;
        StateChange::TextChanged
    }

    // ------------------------------------------------------------------
    // Snapshot
    // ------------------------------------------------------------------

    /// Captures the full state for a persistence collaborator.
    pub fn snapshot(&self) -> CollageSnapshot {
        let comp = self.composition.as_ref();
        CollageSnapshot {
            selected_layout: self.pinned_layout_name().map(str::to_string),
            layout: match &self.pinned {
                Some(_) => None,
                None => comp.map(|c| c.layout.name.clone()),
            },
            images: comp
                .map(|c| c.images.iter().filter_map(SlotImage::id).collect())
                .unwrap_or_default(),
            tags: self.active_tags.clone(),
            effects: self.effects.active().to_vec(),
            blur: self.effects.blur_px,
            glitch: self.effects.glitch,
            custom_image: self.custom_image_url.clone(),
            text: self.layers.text.content.clone(),
            text_font: self.layers.text.font_family.clone(),
            text_size: self.layers.text.font_size_px,
            text_color: self.layers.text.color.clone(),
            text_bold: self.layers.text.bold,
            text_italic: self.layers.text.italic,
            text_underline: self.layers.text.underline,
            text_x: self.layers.text.offset_x,
            text_y: self.layers.text.offset_y,
            text_layer: self.layers.text.layer,
            overlay: self.layers.texture.path.clone(),
            overlay_opacity: self.layers.texture.opacity_pct,
            paint: self.layers.paint.enabled,
            paint_color: self.layers.paint.color.clone(),
            paint_opacity: self.layers.paint.opacity_pct,
        }
    }

    /// Restores the full state from a snapshot.
    ///
    /// Image ids unknown to the catalog are skipped; an unknown layout name
    /// drops the composition rather than failing the restore.
    pub fn restore(&mut self, snapshot: &CollageSnapshot) -> StateChange {
        self.active_tags = snapshot.tags.clone();
        self.custom_image_url = snapshot.custom_image.clone();

        self.effects.set_active(&snapshot.effects);
        self.effects.set_blur_px(snapshot.blur);
        self.effects.set_glitch(snapshot.glitch);

        self.layers.texture.path = snapshot.overlay.clone();
        self.layers.texture.opacity_pct = snapshot.overlay_opacity.min(100);
        self.layers.paint.enabled = snapshot.paint;
        self.layers.paint.color = snapshot.paint_color.clone();
        self.layers.paint.opacity_pct = snapshot.paint_opacity.min(100);

        let text = &mut self.layers.text;
        text.content = snapshot.text.clone();
        text.font_family = snapshot.text_font.clone();
        text.font_size_px = snapshot.text_size.max(1);
        text.color = snapshot.text_color.clone();
        text.bold = snapshot.text_bold;
        text.italic = snapshot.text_italic;
        text.underline = snapshot.text_underline;
        text.offset_x = snapshot.text_x;
        text.offset_y = snapshot.text_y;
        text.layer = snapshot.text_layer;

        let images: Vec<SlotImage> = snapshot
            .images
            .iter()
            .filter_map(|id| match self.catalog.image_by_id(*id) {
                Some(img) => Some(SlotImage::Catalog(img.clone())),
                None => {
                    tracing::warn!(id, "snapshot references an unknown image id");
                    None
                }
            })
            .collect();

        let layout_name = snapshot
            .selected_layout
            .as_deref()
            .or(snapshot.layout.as_deref());
        let layout = layout_name.and_then(|name| {
            let found = self.catalog.layout_by_name(name).cloned();
            if found.is_none() {
                tracing::warn!(name, "snapshot references an unknown layout");
            }
            found
        });

        self.pinned = match (&snapshot.selected_layout, &layout) {
            (Some(_), Some(layout)) => Some(PinnedLayout {
                layout: layout.clone(),
                images: (!images.is_empty()).then(|| images.clone()),
                image_count: (!images.is_empty()).then(|| images.len()),
            }),
            _ => None,
        };
        self.composition = match (layout, images) {
            (Some(layout), images) if !images.is_empty() => Some(Composition { layout, images }),
            _ => None,
        };

        StateChange::Recomposed
    }
}

/// Draws up to `n` distinct images uniformly without replacement.
fn draw_images(filtered: &[Image], n: usize, rng: &mut impl Rng) -> Vec<SlotImage> {
    let mut pool: Vec<Image> = filtered.to_vec();
    pool.shuffle(rng);
    pool.truncate(n);
    pool.into_iter().map(SlotImage::Catalog).collect()
}

// ============================================================================
// Tests
// ============================================================================
