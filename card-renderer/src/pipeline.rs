//! The export pipeline.
//!
//! ```text
//! export()
//!   │ in-flight? ──yes──▶ None
//!   ▼
//! Preparing ── wait for background (bounded) ──┐
//!   ▼                                          │ timeout / failure:
//! Rendering ── strict ──fail──▶ permissive     │ preset background
//!   ▼            (user image: permissive only) │
//! Delivering ── file share ─▶ link share ─▶ download
//!   ▼
//! Idle | Failed(reason)
//! ```
//!
//! Only one export runs at a time. The pipeline owns its in-flight flag and
//! clears it on every exit path, including when the export future is dropped.

use std::cell::{Cell, RefCell};
use std::time::Duration;

use card_core::CardSnapshot;
use chrono::NaiveDate;
use serde::Deserialize;

use crate::assets::{prepare_assets, AssetLoader, InlineAssetLoader, Timer};
use crate::card::CardScene;
use crate::delivery::{export_filename, ExportFile, ShareError, ShareLink, SharePlatform};
use crate::error::RenderResult;
use crate::export::{RasterProfile, Rasterizer, DEFAULT_PIXEL_RATIO};

/// Largest PNG handed to the share sheet (10 MiB).
pub const DEFAULT_MAX_SHARE_BYTES: usize = 10 * 1024 * 1024;

/// Default wait for the custom background before exporting without it.
pub const DEFAULT_ASSET_TIMEOUT_MS: u64 = 5000;

/// Export settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Device pixels per card pixel.
    pub pixel_ratio: f32,
    /// How long to wait for the custom background.
    pub asset_timeout_ms: u64,
    /// Files larger than this are never offered to the share sheet.
    pub max_share_bytes: usize,
    /// Share sheet title.
    pub share_title: String,
    /// Share message.
    pub share_text: String,
    /// Link shared when the platform cannot take files.
    pub share_url: Option<String>,
    /// Download file name prefix.
    pub filename_prefix: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            pixel_ratio: DEFAULT_PIXEL_RATIO,
            asset_timeout_ms: DEFAULT_ASSET_TIMEOUT_MS,
            max_share_bytes: DEFAULT_MAX_SHARE_BYTES,
            share_title: "Daily Log".to_string(),
            share_text: "My daily health summary".to_string(),
            share_url: None,
            filename_prefix: "summary".to_string(),
        }
    }
}

impl ExportConfig {
    /// Asset wait as a [`Duration`].
    #[must_use]
    pub fn asset_timeout(&self) -> Duration {
        Duration::from_millis(self.asset_timeout_ms)
    }

    /// Share text payload.
    #[must_use]
    pub fn share_link(&self) -> ShareLink {
        ShareLink {
            title: self.share_title.clone(),
            text: self.share_text.clone(),
            url: self.share_url.clone(),
        }
    }
}

/// What the pipeline is doing right now.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ExportStatus {
    /// Ready for an export.
    #[default]
    Idle,
    /// Waiting for assets.
    Preparing,
    /// Rasterizing.
    Rendering,
    /// Sharing or downloading.
    Delivering,
    /// The last export failed; cleared by the next export.
    Failed(String),
}

impl ExportStatus {
    /// Whether an export is in progress.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Preparing | Self::Rendering | Self::Delivering)
    }
}

/// How a share completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SharedAs {
    /// The PNG itself was shared.
    File,
    /// Only the link and text were shared.
    Link,
}

/// Final outcome of an export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportResult {
    /// Handed to the share sheet.
    Shared(SharedAs),
    /// Saved as a download.
    Downloaded {
        /// Name of the saved file.
        filename: String,
    },
    /// Nothing was delivered.
    Failed {
        /// Human-readable cause.
        reason: String,
    },
}

/// Clears the in-flight flag, and any progress status, when dropped.
struct InFlight<'a> {
    flag: &'a Cell<bool>,
    status: &'a RefCell<ExportStatus>,
}

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a Cell<bool>, status: &'a RefCell<ExportStatus>) -> Option<Self> {
        if flag.replace(true) {
            return None;
        }
        Some(Self { flag, status })
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut status = self.status.borrow_mut();
        if status.is_busy() {
            *status = ExportStatus::Idle;
        }
        self.flag.set(false);
    }
}

/// Renders card snapshots and delivers the result.
pub struct ExportPipeline {
    config: ExportConfig,
    rasterizer: Box<dyn Rasterizer>,
    platform: Box<dyn SharePlatform>,
    loader: Box<dyn AssetLoader>,
    timer: Box<dyn Timer>,
    in_flight: Cell<bool>,
    status: RefCell<ExportStatus>,
}

impl ExportPipeline {
    /// Create a pipeline that only loads inline backgrounds.
    #[must_use]
    pub fn new(
        config: ExportConfig,
        rasterizer: Box<dyn Rasterizer>,
        platform: Box<dyn SharePlatform>,
        timer: Box<dyn Timer>,
    ) -> Self {
        Self {
            config,
            rasterizer,
            platform,
            loader: Box::new(InlineAssetLoader),
            timer,
            in_flight: Cell::new(false),
            status: RefCell::new(ExportStatus::Idle),
        }
    }

    /// Replace the background loader.
    #[must_use]
    pub fn with_loader(mut self, loader: Box<dyn AssetLoader>) -> Self {
        self.loader = loader;
        self
    }

    /// Export settings.
    #[must_use]
    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    /// Current status.
    #[must_use]
    pub fn status(&self) -> ExportStatus {
        self.status.borrow().clone()
    }

    /// Whether an export is running.
    #[must_use]
    pub fn is_exporting(&self) -> bool {
        self.in_flight.get()
    }

    /// Dismiss a failure notice.
    pub fn clear_failure(&self) {
        let mut status = self.status.borrow_mut();
        if matches!(*status, ExportStatus::Failed(_)) {
            *status = ExportStatus::Idle;
        }
    }

    /// Render and deliver `snapshot`, naming the file after `today`.
    ///
    /// Returns `None` without doing anything when another export is already
    /// in flight.
    pub async fn export(&self, snapshot: &CardSnapshot, today: NaiveDate) -> Option<ExportResult> {
        let Some(_guard) = InFlight::acquire(&self.in_flight, &self.status) else {
            tracing::debug!("Export already in progress, ignoring request");
            return None;
        };

        self.set_status(ExportStatus::Preparing);
        let background = snapshot.style.custom_background.as_ref();
        let assets = prepare_assets(
            self.loader.as_ref(),
            self.timer.as_ref(),
            background,
            self.config.asset_timeout(),
        )
        .await;

        self.set_status(ExportStatus::Rendering);
        let scene = CardScene::build(snapshot, &assets);
        let user_supplied = background.is_some_and(card_core::CustomBackground::is_user_supplied);
        let result = match self.rasterize(&scene, user_supplied) {
            Ok(png) => {
                self.set_status(ExportStatus::Delivering);
                let filename = export_filename(&self.config.filename_prefix, today);
                self.deliver(ExportFile::png(filename, png)).await
            }
            Err(e) => ExportResult::Failed {
                reason: e.to_string(),
            },
        };

        match &result {
            ExportResult::Failed { reason } => {
                tracing::warn!("Export failed: {reason}");
                self.set_status(ExportStatus::Failed(reason.clone()));
            }
            outcome => {
                tracing::info!("Export finished: {outcome:?}");
                self.set_status(ExportStatus::Idle);
            }
        }
        Some(result)
    }

    fn set_status(&self, status: ExportStatus) {
        *self.status.borrow_mut() = status;
    }

    /// Strict first, then one permissive retry. User-picked images go
    /// straight to the permissive profile.
    fn rasterize(&self, scene: &CardScene, user_supplied: bool) -> RenderResult<Vec<u8>> {
        let ratio = self.config.pixel_ratio;
        if user_supplied {
            return self
                .rasterizer
                .rasterize(scene, RasterProfile::permissive(), ratio);
        }
        match self.rasterizer.rasterize(scene, RasterProfile::strict(), ratio) {
            Ok(png) => Ok(png),
            Err(e) => {
                tracing::warn!("Strict rasterization failed, retrying permissively: {e}");
                self.rasterizer
                    .rasterize(scene, RasterProfile::permissive(), ratio)
            }
        }
    }

    async fn deliver(&self, file: ExportFile) -> ExportResult {
        let link = self.config.share_link();

        if file.len() <= self.config.max_share_bytes && self.platform.can_share_file(&file) {
            match self.platform.share_file(&file, &link).await {
                Ok(()) => return ExportResult::Shared(SharedAs::File),
                Err(e) => {
                    if let Some(failed) = Self::hard_failure(&e) {
                        return failed;
                    }
                    tracing::info!("File share did not complete, downloading instead: {e}");
                }
            }
        } else if self.platform.can_share_link() {
            match self.platform.share_link(&link).await {
                Ok(()) => return ExportResult::Shared(SharedAs::Link),
                Err(e) => {
                    if let Some(failed) = Self::hard_failure(&e) {
                        return failed;
                    }
                    tracing::info!("Link share did not complete, downloading instead: {e}");
                }
            }
        }

        match self.platform.download(&file).await {
            Ok(()) => ExportResult::Downloaded {
                filename: file.filename,
            },
            Err(e) => ExportResult::Failed {
                reason: e.to_string(),
            },
        }
    }

    fn hard_failure(error: &ShareError) -> Option<ExportResult> {
        (!error.falls_back_to_download()).then(|| ExportResult::Failed {
            reason: error.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_clears_flag_and_busy_status() {
        let flag = Cell::new(false);
        let status = RefCell::new(ExportStatus::Idle);
        {
            let guard = InFlight::acquire(&flag, &status);
            assert!(guard.is_some());
            assert!(InFlight::acquire(&flag, &status).is_none());
            *status.borrow_mut() = ExportStatus::Rendering;
        }
        assert!(!flag.get());
        assert_eq!(*status.borrow(), ExportStatus::Idle);
    }

    #[test]
    fn guard_keeps_failure_notice() {
        let flag = Cell::new(false);
        let status = RefCell::new(ExportStatus::Idle);
        {
            let _guard = InFlight::acquire(&flag, &status);
            *status.borrow_mut() = ExportStatus::Failed("boom".into());
        }
        assert_eq!(*status.borrow(), ExportStatus::Failed("boom".into()));
    }

    #[test]
    fn config_deserializes_with_defaults() {
        let config: ExportConfig =
            serde_json::from_str(r#"{"pixel_ratio": 3.0, "share_url": "https://x.example"}"#)
                .expect("config");
        assert!((config.pixel_ratio - 3.0).abs() < f32::EPSILON);
        assert_eq!(config.max_share_bytes, DEFAULT_MAX_SHARE_BYTES);
        assert_eq!(config.asset_timeout(), Duration::from_secs(5));
        assert_eq!(config.share_link().url.as_deref(), Some("https://x.example"));
    }
}
