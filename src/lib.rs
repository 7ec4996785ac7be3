//! collage-composer: a browser-agnostic collage composition engine.
//!
//! This crate selects tagged images from a catalog, arranges them into one
//! of several grid layout templates, maintains the current composition
//! across shuffle/replace/pin interactions, computes a composable per-image
//! filter chain plus a texture/paint/text decoration stack, and rasterizes
//! the result into a downloadable Letter-page JPEG (816x1056 at 96 DPI).
//!
//! DOM construction, event wiring and persistence are external
//! collaborators: the engine exposes pure-ish operations that return a
//! [`StateChange`] description, and a [`CollageSnapshot`] the persistence
//! layer can serialize without knowing any internals.
//!
//! # Example
//!
//! ```
//! use collage_composer::{Catalog, CellSpan, CollageComposer, EffectKind, Image, LayoutTemplate};
//! use rand::SeedableRng;
//!
//! let catalog = Catalog::new(
//!     vec![
//!         Image::new(0, "img/crane.jpg", &["Vintage", "Bird"]),
//!         Image::new(1, "img/heron.png", &["Vintage", "Bird"]),
//!         Image::new(2, "img/soda-ad.jpg", &["Vintage", "Advertisement"]),
//!         Image::new(3, "img/open-sign.jpg", &["Moody"]),
//!     ],
//!     vec![LayoutTemplate::new(
//!         "half-and-quarters",
//!         vec![CellSpan::new(2, 2), CellSpan::new(1, 1), CellSpan::new(1, 1)],
//!     )],
//! )
//! .unwrap();
//!
//! let mut composer = CollageComposer::new(catalog);
//! let mut rng = rand::rngs::StdRng::seed_from_u64(7);
//!
//! // Filter to birds, compose, and style the grid.
//! composer.toggle_tag("Bird");
//! composer.generate(&mut rng).unwrap();
//! composer.toggle_effect(EffectKind::Sepia);
//!
//! assert_eq!(composer.placed().len(), 2);
//! assert_eq!(composer.image_filter(), "url(#svg-sepia)");
//!
//! // Hand the state to a persistence collaborator and back.
//! let json = composer.snapshot().to_json().unwrap();
//! assert!(json.contains("\"sepia\""));
//! ```

mod catalog;
mod composer;
mod error;
mod export;
mod grid;
mod layer;
mod snapshot;

pub use catalog::{Catalog, CellSpan, Image, LayoutTemplate, SlotImage};
pub use composer::{CollageComposer, Composition, StateChange};
pub use error::{CollageError, CollageResult};
pub use export::{
    AssetProvider, ExportOutput, PAGE_HEIGHT, PAGE_WIDTH, export, render_raster,
    suggested_filename,
};
pub use grid::{GRID_COLUMNS, GridRect, PlacedImage, derive_cells, place_cells, placed_rects, render};
pub use layer::{
    EffectKind, EffectState, FilterOp, LayerStack, PaintConfig, TextLayer, TextOverlayConfig,
    TextureOverlayConfig, cover_crop,
};
pub use snapshot::CollageSnapshot;
