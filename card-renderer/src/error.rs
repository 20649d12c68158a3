//! Renderer error types.

use thiserror::Error;

/// Result type for renderer operations.
pub type RenderResult<T> = Result<T, RenderError>;

/// Errors that can occur while preparing or rasterizing the card.
#[derive(Debug, Error)]
pub enum RenderError {
    /// Resource loading failed.
    #[error("Failed to load resource: {0}")]
    Resource(String),

    /// The scene could not be parsed as SVG.
    #[error("SVG parsing failed: {0}")]
    Svg(String),

    /// The scene references an asset the active profile may not read back.
    #[error("Canvas tainted by cross-origin asset from {origin}")]
    Tainted {
        /// Origin of the offending asset.
        origin: String,
    },

    /// Rasterization failed.
    #[error("Rasterization failed: {0}")]
    Raster(String),

    /// Encoding the raster failed.
    #[error("Encoding failed: {0}")]
    Encode(String),
}
