//! Error taxonomy for the composition engine.
//!
//! Every failure here is local and recoverable except [`CollageError::EmptyCatalog`],
//! which signals that no composition can ever be formed and should halt startup.

/// Convenience alias used throughout the crate.
pub type CollageResult<T> = Result<T, CollageError>;

/// All failure modes the engine can surface.
#[derive(thiserror::Error, Debug)]
pub enum CollageError {
    /// The active tag filter left nothing to draw from. The caller should
    /// surface a message and keep the prior composition on screen.
    #[error("no images match the selected filters")]
    NoMatchingImages,

    /// Export was invoked with zero placed images; no raster is produced.
    #[error("nothing to export: the collage has no images")]
    ExportNoContent,

    /// A single image failed to decode. During export this is logged and the
    /// image is skipped; it never aborts the export join.
    #[error("failed to decode image '{path}'")]
    ImageDecode {
        /// Path of the image that could not be decoded.
        path: String,
    },

    /// A layout was requested by a name the catalog does not know.
    #[error("unknown layout '{0}'")]
    UnknownLayout(String),

    /// A persisted snapshot blob was not valid JSON at all. Field-level
    /// problems inside a valid object fall back to defaults instead.
    #[error("snapshot error: {0}")]
    Snapshot(String),

    /// The catalog provider supplied no images or no layouts at startup.
    #[error("catalog must provide at least one {0}")]
    EmptyCatalog(&'static str),

    /// Raster encoding failed while producing the export bytes.
    #[error("raster encoding failed")]
    Encode(#[from] image::ImageError),
}

impl CollageError {
    /// Decode failure for the image at `path`.
    pub fn image_decode(path: impl Into<String>) -> Self {
        Self::ImageDecode { path: path.into() }
    }

    /// Snapshot-level failure with a free-form message.
    pub fn snapshot(msg: impl Into<String>) -> Self {
        Self::Snapshot(msg.into())
    }
}
