//! Custom background images.

use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::{CardError, CardResult};

/// Where a background image is loaded from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "origin", rename_all = "kebab-case")]
pub enum ImageOrigin {
    /// Embedded `data:` URL.
    Inline,
    /// Relative path or the page's own origin.
    SameOrigin,
    /// Another origin; reading its pixels taints a strict raster.
    CrossOrigin(String),
}

/// A background image replacing the preset fill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomBackground {
    href: String,
    origin: ImageOrigin,
    user_supplied: bool,
}

impl CustomBackground {
    /// Build a background from a file picked by the user.
    ///
    /// The bytes are stored as a base64 `data:` URL; nothing is uploaded.
    ///
    /// # Errors
    ///
    /// Returns an error if `mime` is not an `image/*` type or the file is empty.
    pub fn from_file(mime: &str, bytes: &[u8]) -> CardResult<Self> {
        let mime = mime.trim().to_ascii_lowercase();
        if !mime.starts_with("image/") || mime.len() == "image/".len() {
            return Err(CardError::UnsupportedImage(mime));
        }
        if bytes.is_empty() {
            return Err(CardError::UnsupportedImage("empty file".to_string()));
        }
        let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
        Ok(Self {
            href: format!("data:{mime};base64,{encoded}"),
            origin: ImageOrigin::Inline,
            user_supplied: true,
        })
    }

    /// Reference an image by URL, relative to no particular page origin.
    #[must_use]
    pub fn from_url(href: &str) -> Self {
        Self::from_url_on_page(href, None)
    }

    /// Reference an image by URL, classifying it against the page origin
    /// (e.g. `https://app.example`).
    #[must_use]
    pub fn from_url_on_page(href: &str, page_origin: Option<&str>) -> Self {
        Self {
            href: href.to_string(),
            origin: classify(href, page_origin),
            user_supplied: false,
        }
    }

    /// Image reference (`data:` URL, path or absolute URL).
    #[must_use]
    pub fn href(&self) -> &str {
        &self.href
    }

    /// Origin classification.
    #[must_use]
    pub fn origin(&self) -> &ImageOrigin {
        &self.origin
    }

    /// Whether the user picked this image from their device.
    #[must_use]
    pub fn is_user_supplied(&self) -> bool {
        self.user_supplied
    }
}

fn classify(href: &str, page_origin: Option<&str>) -> ImageOrigin {
    if href.starts_with("data:") {
        return ImageOrigin::Inline;
    }
    let Ok(parsed) = url::Url::parse(href) else {
        // Relative references resolve against the page.
        return ImageOrigin::SameOrigin;
    };
    let origin = parsed.origin().ascii_serialization();
    let same = page_origin
        .and_then(|page| url::Url::parse(page).ok())
        .is_some_and(|page| page.origin().ascii_serialization() == origin);
    if same {
        ImageOrigin::SameOrigin
    } else {
        ImageOrigin::CrossOrigin(origin)
    }
}
