//! Card rasterization.
//!
//! Renders a [`CardScene`] to PNG through the resvg/tiny-skia pipeline.
//! Rasterization runs under a [`RasterProfile`]: the strict profile refuses
//! scenes that embed cross-origin pixels, the permissive one accepts them.

use card_core::ImageOrigin;

use crate::card::CardScene;
use crate::error::{RenderError, RenderResult};

/// Default device pixel ratio for exported images.
pub const DEFAULT_PIXEL_RATIO: f32 = 2.0;

/// Largest pixel ratio honoured; keeps the pixmap allocation bounded.
pub const MAX_PIXEL_RATIO: f32 = 4.0;

/// Rules applied while rasterizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RasterProfile {
    name: &'static str,
    allow_cross_origin: bool,
}

impl RasterProfile {
    /// Refuses scenes that embed cross-origin images.
    #[must_use]
    pub const fn strict() -> Self {
        Self {
            name: "strict",
            allow_cross_origin: false,
        }
    }

    /// Accepts any embedded image.
    #[must_use]
    pub const fn permissive() -> Self {
        Self {
            name: "permissive",
            allow_cross_origin: true,
        }
    }

    /// Profile name for logs.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Whether cross-origin images may be read back.
    #[must_use]
    pub fn allows_cross_origin(&self) -> bool {
        self.allow_cross_origin
    }

    /// Check a scene against this profile.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Tainted`] if the scene embeds an image the
    /// profile may not read.
    pub fn check(&self, scene: &CardScene) -> RenderResult<()> {
        if self.allow_cross_origin {
            return Ok(());
        }
        match scene.image_origins().iter().find_map(|o| match o {
            ImageOrigin::CrossOrigin(origin) => Some(origin),
            _ => None,
        }) {
            Some(origin) => Err(RenderError::Tainted {
                origin: origin.clone(),
            }),
            None => Ok(()),
        }
    }
}

/// Turns a card scene into encoded image bytes.
pub trait Rasterizer {
    /// Rasterize `scene` to PNG at `pixel_ratio` device pixels per card pixel.
    ///
    /// # Errors
    ///
    /// Returns an error if the profile rejects the scene or rendering fails.
    fn rasterize(
        &self,
        scene: &CardScene,
        profile: RasterProfile,
        pixel_ratio: f32,
    ) -> RenderResult<Vec<u8>>;
}

/// CPU rasterizer backed by resvg.
pub struct SvgRasterizer {
    options: usvg::Options<'static>,
}

impl Default for SvgRasterizer {
    fn default() -> Self {
        Self::new()
    }
}

impl SvgRasterizer {
    /// Create a rasterizer without any fonts loaded.
    ///
    /// Text is skipped unless fonts are added with
    /// [`load_system_fonts`](Self::load_system_fonts) or
    /// [`load_font_data`](Self::load_font_data).
    #[must_use]
    pub fn new() -> Self {
        Self {
            options: usvg::Options::default(),
        }
    }

    /// Make the host's installed fonts available.
    #[must_use]
    pub fn load_system_fonts(mut self) -> Self {
        self.options.fontdb_mut().load_system_fonts();
        tracing::debug!("Loaded {} system font faces", self.options.fontdb.len());
        self
    }

    /// Register a font file (TTF/OTF bytes).
    #[must_use]
    pub fn load_font_data(mut self, data: Vec<u8>) -> Self {
        self.options.fontdb_mut().load_font_data(data);
        self
    }

    /// Render the scene to a pixmap without encoding it.
    ///
    /// # Errors
    ///
    /// Returns an error if the profile rejects the scene or rendering fails.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn render_pixmap(
        &self,
        scene: &CardScene,
        profile: RasterProfile,
        pixel_ratio: f32,
    ) -> RenderResult<tiny_skia::Pixmap> {
        profile.check(scene)?;

        let ratio = normalize_ratio(pixel_ratio);
        let tree = usvg::Tree::from_str(scene.svg(), &self.options)
            .map_err(|e| RenderError::Svg(e.to_string()))?;

        let px_w = (tree.size().width() * ratio).ceil() as u32;
        let px_h = (tree.size().height() * ratio).ceil() as u32;

        let mut pixmap = tiny_skia::Pixmap::new(px_w.max(1), px_h.max(1))
            .ok_or_else(|| RenderError::Raster(format!("Cannot allocate {px_w}x{px_h} pixmap")))?;

        resvg::render(
            &tree,
            tiny_skia::Transform::from_scale(ratio, ratio),
            &mut pixmap.as_mut(),
        );

        Ok(pixmap)
    }
}

impl Rasterizer for SvgRasterizer {
    fn rasterize(
        &self,
        scene: &CardScene,
        profile: RasterProfile,
        pixel_ratio: f32,
    ) -> RenderResult<Vec<u8>> {
        let pixmap = self.render_pixmap(scene, profile, pixel_ratio)?;
        tracing::debug!(
            "Rasterized card at {}x{} ({} profile)",
            pixmap.width(),
            pixmap.height(),
            profile.name()
        );
        pixmap
            .encode_png()
            .map_err(|e| RenderError::Encode(format!("PNG encoding failed: {e}")))
    }
}

fn normalize_ratio(pixel_ratio: f32) -> f32 {
    if pixel_ratio.is_finite() && pixel_ratio > 0.0 {
        pixel_ratio.min(MAX_PIXEL_RATIO)
    } else {
        DEFAULT_PIXEL_RATIO
    }
}
