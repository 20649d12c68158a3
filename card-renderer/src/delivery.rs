//! Handing the exported image to the user.
//!
//! The [`SharePlatform`] trait abstracts the host's share sheet and download
//! mechanism so the export pipeline can run unchanged in the browser and in
//! tests.

use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

/// MIME type of exported cards.
pub const PNG_MIME: &str = "image/png";

/// Why a share or download attempt did not complete.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShareError {
    /// The user dismissed the share sheet.
    #[error("Share cancelled by user")]
    Cancelled,

    /// The platform refused this kind of share.
    #[error("Share not supported: {0}")]
    Unsupported(String),

    /// The payload exceeds what the platform accepts.
    #[error("File too large to share: {size} bytes")]
    TooLarge {
        /// Size of the rejected payload.
        size: usize,
    },

    /// Any other platform failure.
    #[error("Share failed: {0}")]
    Failed(String),
}

impl ShareError {
    /// Whether a download should be attempted instead of reporting failure.
    #[must_use]
    pub fn falls_back_to_download(&self) -> bool {
        !matches!(self, Self::Failed(_))
    }
}

/// An exported image ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportFile {
    /// Suggested file name.
    pub filename: String,
    /// MIME type.
    pub mime: &'static str,
    /// Encoded bytes.
    pub bytes: Vec<u8>,
}

impl ExportFile {
    /// Wrap PNG bytes.
    #[must_use]
    pub fn png(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            mime: PNG_MIME,
            bytes,
        }
    }

    /// Size in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the file is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Text accompanying a share.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ShareLink {
    /// Share sheet title.
    pub title: String,
    /// Message body.
    pub text: String,
    /// Link shared when files are not supported.
    pub url: Option<String>,
}

/// `{prefix}_YYYY-MM-DD.png`
#[must_use]
pub fn export_filename(prefix: &str, date: NaiveDate) -> String {
    format!("{prefix}_{}.png", date.format("%Y-%m-%d"))
}

/// Host share and download facilities.
#[async_trait(?Send)]
pub trait SharePlatform {
    /// Whether the platform can share this file directly.
    fn can_share_file(&self, file: &ExportFile) -> bool;

    /// Whether the platform can share a link and text.
    fn can_share_link(&self) -> bool;

    /// Open the share sheet with the file attached.
    ///
    /// # Errors
    ///
    /// Returns a [`ShareError`] if the share did not complete.
    async fn share_file(&self, file: &ExportFile, link: &ShareLink) -> Result<(), ShareError>;

    /// Open the share sheet with a link and text only.
    ///
    /// # Errors
    ///
    /// Returns a [`ShareError`] if the share did not complete.
    async fn share_link(&self, link: &ShareLink) -> Result<(), ShareError>;

    /// Save the file locally.
    ///
    /// # Errors
    ///
    /// Returns a [`ShareError`] if the download could not be started.
    async fn download(&self, file: &ExportFile) -> Result<(), ShareError>;
}
