//! # Daily Log Card Renderer
//!
//! Turns a [`card_core::CardSnapshot`] into a PNG and hands it to the user.
//!
//! ## Export Pipeline
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │              ExportPipeline                 │
//! ├─────────────┬─────────────┬─────────────────┤
//! │ AssetLoader │ Rasterizer  │ SharePlatform   │
//! │ + Timer     │ (resvg)     │ (share/download)│
//! └─────────────┴─────────────┴─────────────────┘
//! ```
//!
//! Every host-specific piece sits behind a trait so the same pipeline runs in
//! the browser and in native tests.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod assets;
pub mod card;
pub mod delivery;
pub mod error;
pub mod export;
pub mod image;
pub mod labels;
pub mod pipeline;

pub use assets::{
    prepare_assets, AssetLoader, AssetStatus, FetchAssetLoader, ImageFetcher, InlineAssetLoader,
    PreparedAsset, PreparedAssets, Timer,
};
pub use card::{CardScene, CARD_HEIGHT, CARD_WIDTH};
pub use delivery::{export_filename, ExportFile, ShareError, ShareLink, SharePlatform};
pub use error::{RenderError, RenderResult};
pub use export::{RasterProfile, Rasterizer, SvgRasterizer};
pub use crate::image::EncodedImage;
pub use labels::Labels;
pub use pipeline::{ExportConfig, ExportPipeline, ExportResult, ExportStatus, SharedAs};
