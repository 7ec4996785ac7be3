//! Catalog types: the static image and layout datasets the engine draws from.
//!
//! The catalog is supplied read-only at startup by an external provider and
//! never mutated afterwards. Images carry stable ids (persistence
//! collaborators store compositions as id lists, never as paths or array
//! indices) and free-form tags used by the OR-semantics tag filter.

use std::collections::BTreeSet;

use crate::error::{CollageError, CollageResult};

// ============================================================================
// Image
// ============================================================================

/// A selectable catalog image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    /// Stable, unique identifier.
    pub id: u32,

    /// URI the UI and the exporter's asset provider resolve.
    pub path: String,

    /// Tags used by the filter panel. Matching is OR: an image passes if any
    /// of its tags is active.
    pub tags: Vec<String>,

    /// Credit line shown in the image-info listing, if known.
    pub attribution: Option<String>,

    /// Link to the image's source page, if known.
    pub source_link: Option<String>,
}

impl Image {
    /// Creates an image with no attribution metadata.
    pub fn new(id: u32, path: impl Into<String>, tags: &[&str]) -> Self {
        Self {
            id,
            path: path.into(),
            tags: tags.iter().map(|t| (*t).to_string()).collect(),
            attribution: None,
            source_link: None,
        }
    }

    /// Attaches attribution metadata.
    pub fn with_attribution(
        mut self,
        attribution: impl Into<String>,
        source_link: impl Into<String>,
    ) -> Self {
        self.attribution = Some(attribution.into());
        self.source_link = Some(source_link.into());
        self
    }

    /// True if any of this image's tags appears in `active`.
    pub fn has_any_tag(&self, active: &[String]) -> bool {
        self.tags.iter().any(|t| active.contains(t))
    }
}

// ============================================================================
// SlotImage
// ============================================================================

/// One slot of a composition: either a catalog image or the user-supplied
/// custom URL image.
///
/// Custom slots are exempt from the replace-uniqueness check and have no
/// stable id, so they are not persisted in snapshot id lists (the custom URL
/// itself survives separately).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotImage {
    /// An image drawn from the catalog.
    Catalog(Image),

    /// The user-supplied custom image.
    Custom {
        /// URL the user pasted in.
        url: String,
    },
}

impl SlotImage {
    /// The URI to load for this slot.
    pub fn path(&self) -> &str {
        match self {
            Self::Catalog(img) => &img.path,
            Self::Custom { url } => url,
        }
    }

    /// Stable catalog id, if this slot holds a catalog image.
    pub fn id(&self) -> Option<u32> {
        match self {
            Self::Catalog(img) => Some(img.id),
            Self::Custom { .. } => None,
        }
    }

    /// True for the user-supplied custom image.
    pub fn is_custom(&self) -> bool {
        matches!(self, Self::Custom { .. })
    }
}

// ============================================================================
// Layout templates
// ============================================================================

/// A grid cell extent in column/row spans.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellSpan {
    /// Columns covered, at least 1.
    pub col_span: u32,
    /// Rows covered, at least 1.
    pub row_span: u32,
}

impl CellSpan {
    /// The padding cell appended when a layout has fewer cells than images.
    pub const DEFAULT: Self = Self {
        col_span: 1,
        row_span: 1,
    };

    /// Creates a span; zero components are raised to 1.
    pub fn new(col_span: u32, row_span: u32) -> Self {
        Self {
            col_span: col_span.max(1),
            row_span: row_span.max(1),
        }
    }
}

impl Default for CellSpan {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// A named arrangement of grid cells.
///
/// `cells.len()` is the template's native image count, but the list is
/// elastic: it is truncated or padded with `CellSpan::DEFAULT` to match the
/// composition at render time, and the derived list is never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutTemplate {
    /// Unique key; snapshots reference layouts by this name.
    pub name: String,

    /// Ordered cell spans, paired positionally with the composition images.
    pub cells: Vec<CellSpan>,
}

impl LayoutTemplate {
    /// Creates a template.
    pub fn new(name: impl Into<String>, cells: Vec<CellSpan>) -> Self {
        Self {
            name: name.into(),
            cells,
        }
    }
}

// ============================================================================
// Catalog
// ============================================================================

/// The full read-only dataset: images plus layout templates.
#[derive(Debug, Clone, PartialEq)]
pub struct Catalog {
    images: Vec<Image>,
    layouts: Vec<LayoutTemplate>,
}

impl Catalog {
    /// Validates and wraps the provided dataset.
    ///
    /// Fails with [`CollageError::EmptyCatalog`] if either list is empty.
    /// That is the only fatal startup condition, since no composition could
    /// ever be formed.
    pub fn new(images: Vec<Image>, layouts: Vec<LayoutTemplate>) -> CollageResult<Self> {
        if images.is_empty() {
            return Err(CollageError::EmptyCatalog("image"));
        }
        if layouts.is_empty() {
            return Err(CollageError::EmptyCatalog("layout"));
        }
        Ok(Self { images, layouts })
    }

    /// All catalog images, in catalog order.
    pub fn images(&self) -> &[Image] {
        &self.images
    }

    /// All layout templates, in catalog order.
    pub fn layouts(&self) -> &[LayoutTemplate] {
        &self.layouts
    }

    /// Looks an image up by its stable id.
    pub fn image_by_id(&self, id: u32) -> Option<&Image> {
        self.images.iter().find(|img| img.id == id)
    }

    /// Looks a layout template up by name.
    pub fn layout_by_name(&self, name: &str) -> Option<&LayoutTemplate> {
        self.layouts.iter().find(|l| l.name == name)
    }

    /// Filters images by the active tag set.
    ///
    /// An empty tag set returns the whole catalog unchanged (identity, same
    /// order). Otherwise every image with at least one active tag passes, in
    /// catalog order. Pure and deterministic for a given catalog + tags.
    pub fn filter_by_tags(&self, active: &[String]) -> Vec<&Image> {
        if active.is_empty() {
            return self.images.iter().collect();
        }
        self.images
            .iter()
            .filter(|img| img.has_any_tag(active))
            .collect()
    }

    /// The sorted, deduplicated tag universe, for building the filter panel.
    pub fn all_tags(&self) -> Vec<String> {
        let set: BTreeSet<&str> = self
            .images
            .iter()
            .flat_map(|img| img.tags.iter().map(String::as_str))
            .collect();
        set.into_iter().map(str::to_string).collect()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_catalog() -> Catalog {
        Catalog::new(
            vec![
                Image::new(0, "img/advertisement.jpg", &["Antique", "Advertisement"]),
                Image::new(1, "img/crane-2.jpg", &["Vector", "Bird"]),
                Image::new(2, "img/crane.jpg", &["Vintage", "Bird", "Red"]),
                Image::new(3, "img/heron.png", &["Vintage", "Bird"]),
                Image::new(4, "img/soda-ad.jpg", &["Vintage", "Advertisement"]),
                Image::new(5, "img/vintage-cat-poster.png", &["Vintage", "Red"]),
                Image::new(6, "img/vintage-model-1.png", &["Comic", "Vector"]),
            ],
            vec![LayoutTemplate::new(
                "half-and-quarters",
                vec![CellSpan::new(2, 2), CellSpan::new(1, 1), CellSpan::new(1, 1)],
            )],
        )
        .unwrap()
    }

    #[test]
    fn empty_tag_set_is_identity() {
        let catalog = sample_catalog();
        let filtered = catalog.filter_by_tags(&[]);
        assert_eq!(filtered.len(), catalog.images().len());
        let ids: Vec<u32> = filtered.iter().map(|img| img.id).collect();
        assert_eq!(ids, vec![0, 1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn tag_filter_is_or_and_order_preserving() {
        let catalog = sample_catalog();
        let filtered = catalog.filter_by_tags(&["Bird".to_string()]);
        let ids: Vec<u32> = filtered.iter().map(|img| img.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);

        let filtered = catalog.filter_by_tags(&["Bird".to_string(), "Comic".to_string()]);
        let ids: Vec<u32> = filtered.iter().map(|img| img.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 6]);
    }

    #[test]
    fn filter_only_returns_matching_images() {
        let catalog = sample_catalog();
        let active = vec!["Advertisement".to_string()];
        for img in catalog.filter_by_tags(&active) {
            assert!(img.has_any_tag(&active));
        }
    }

    #[test]
    fn all_tags_sorted_and_deduplicated() {
        let catalog = sample_catalog();
        let tags = catalog.all_tags();
        let mut sorted = tags.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(tags, sorted);
        assert!(tags.contains(&"Vintage".to_string()));
    }

    #[test]
    fn empty_catalog_is_fatal() {
        let err = Catalog::new(vec![], vec![LayoutTemplate::new("x", vec![])]).unwrap_err();
        assert!(matches!(err, CollageError::EmptyCatalog("image")));

        let err = Catalog::new(vec![Image::new(0, "a.jpg", &[])], vec![]).unwrap_err();
        assert!(matches!(err, CollageError::EmptyCatalog("layout")));
    }

    #[test]
    fn lookups_by_id_and_name() {
        let catalog = sample_catalog();
        assert_eq!(catalog.image_by_id(3).unwrap().path, "img/heron.png");
        assert!(catalog.image_by_id(99).is_none());
        assert_eq!(
            catalog.layout_by_name("half-and-quarters").unwrap().cells.len(),
            3
        );
        assert!(catalog.layout_by_name("missing").is_none());
    }

    #[test]
    fn cell_span_raises_zero_components() {
        let span = CellSpan::new(0, 0);
        assert_eq!(span, CellSpan::new(1, 1));
    }

    #[test]
    fn slot_image_accessors() {
        let slot = SlotImage::Catalog(Image::new(4, "img/soda-ad.jpg", &[]));
        assert_eq!(slot.path(), "img/soda-ad.jpg");
        assert_eq!(slot.id(), Some(4));
        assert!(!slot.is_custom());

        let custom = SlotImage::Custom {
            url: "https://example.com/pic.png".into(),
        };
        assert_eq!(custom.path(), "https://example.com/pic.png");
        assert_eq!(custom.id(), None);
        assert!(custom.is_custom());
    }
}
