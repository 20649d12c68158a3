//! Asset readiness before export.
//!
//! A custom background has to be fully loaded before the card is rasterized,
//! but a slow or broken image must never hang the export. Loading runs
//! against a [`Timer`] and whichever finishes first wins; on timeout or
//! failure the scene is drawn with the preset background instead.

use std::time::Duration;

use async_trait::async_trait;
use card_core::{CustomBackground, ImageOrigin};
use futures::future::{self, Either};

use crate::error::{RenderError, RenderResult};
use crate::image::{decode_data_uri, probe_image, to_data_uri, EncodedImage, ImageFormat};

/// Fetches the bytes behind a background reference.
#[async_trait(?Send)]
pub trait AssetLoader {
    /// Load the image referenced by `background`.
    ///
    /// # Errors
    ///
    /// Returns an error if the image cannot be fetched.
    async fn load(&self, background: &CustomBackground) -> RenderResult<EncodedImage>;
}

/// Host-provided sleep used to bound asset loading.
#[async_trait(?Send)]
pub trait Timer {
    /// Complete after `duration`.
    async fn sleep(&self, duration: Duration);
}

/// Loader that only understands embedded `data:` URLs.
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineAssetLoader;

#[async_trait(?Send)]
impl AssetLoader for InlineAssetLoader {
    async fn load(&self, background: &CustomBackground) -> RenderResult<EncodedImage> {
        match background.origin() {
            ImageOrigin::Inline => decode_data_uri(background.href()),
            _ => Err(RenderError::Resource(format!(
                "No loader for external image {}",
                background.href()
            ))),
        }
    }
}

/// Host transport that retrieves the bytes behind an image URL.
#[async_trait(?Send)]
pub trait ImageFetcher {
    /// Fetch `url`. `mime` carries the response `Content-Type`, empty when
    /// the host reported none.
    ///
    /// # Errors
    ///
    /// Returns an error on network failure or a non-success status.
    async fn fetch(&self, url: &str) -> RenderResult<EncodedImage>;
}

/// Loader for every background origin: `data:` URLs are decoded in place,
/// everything else goes through an [`ImageFetcher`].
#[derive(Debug, Clone, Default)]
pub struct FetchAssetLoader<F> {
    fetcher: F,
}

impl<F: ImageFetcher> FetchAssetLoader<F> {
    /// Wrap a fetcher.
    #[must_use]
    pub fn new(fetcher: F) -> Self {
        Self { fetcher }
    }
}

#[async_trait(?Send)]
impl<F: ImageFetcher> AssetLoader for FetchAssetLoader<F> {
    async fn load(&self, background: &CustomBackground) -> RenderResult<EncodedImage> {
        if matches!(background.origin(), ImageOrigin::Inline) {
            return decode_data_uri(background.href());
        }
        let fetched = self.fetcher.fetch(background.href()).await?;
        let mime = resolve_mime(&fetched.mime, &fetched.bytes).ok_or_else(|| {
            RenderError::Resource(format!(
                "{} is not an image ({})",
                background.href(),
                if fetched.mime.is_empty() { "no content type" } else { &fetched.mime }
            ))
        })?;
        Ok(EncodedImage {
            mime: mime.to_string(),
            bytes: fetched.bytes,
        })
    }
}

/// Trust a known `Content-Type`, otherwise sniff the bytes.
fn resolve_mime(content_type: &str, bytes: &[u8]) -> Option<&'static str> {
    let essence = content_type.split(';').next().unwrap_or_default().trim();
    ImageFormat::from_mime(essence)
        .mime()
        .or_else(|| ImageFormat::from_magic_bytes(bytes).mime())
}

/// A background image decoded and ready to embed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedAsset {
    /// Base64 `data:` URL embedded into the scene.
    pub href: String,
    /// Where the pixels originally came from.
    pub origin: ImageOrigin,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

/// Outcome of preparing the background.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AssetStatus {
    /// No custom background is set.
    #[default]
    NotRequested,
    /// Loaded and decoded.
    Ready(PreparedAsset),
    /// Did not finish before the deadline.
    TimedOut,
    /// Failed to load or decode.
    Failed(String),
}

/// Assets resolved for one export.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PreparedAssets {
    /// Background readiness.
    pub background: AssetStatus,
}

impl PreparedAssets {
    /// No assets requested.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// The background image, if it is ready to draw.
    #[must_use]
    pub fn background(&self) -> Option<&PreparedAsset> {
        match &self.background {
            AssetStatus::Ready(asset) => Some(asset),
            _ => None,
        }
    }
}

/// Resolve every asset the card needs, giving up after `timeout`.
///
/// Never fails: problems are logged and reported through [`AssetStatus`].
pub async fn prepare_assets(
    loader: &dyn AssetLoader,
    timer: &dyn Timer,
    background: Option<&CustomBackground>,
    timeout: Duration,
) -> PreparedAssets {
    let Some(background) = background else {
        return PreparedAssets::none();
    };

    let status = match future::select(loader.load(background), timer.sleep(timeout)).await {
        Either::Left((Ok(encoded), _)) => match decode(background, &encoded) {
            Ok(asset) => {
                tracing::debug!(
                    "Background ready ({}x{}, {} bytes)",
                    asset.width,
                    asset.height,
                    encoded.bytes.len()
                );
                AssetStatus::Ready(asset)
            }
            Err(e) => {
                tracing::warn!("Background could not be decoded, using preset: {e}");
                AssetStatus::Failed(e.to_string())
            }
        },
        Either::Left((Err(e), _)) => {
            tracing::warn!("Background failed to load, using preset: {e}");
            AssetStatus::Failed(e.to_string())
        }
        Either::Right(((), _)) => {
            tracing::warn!("Background not ready after {timeout:?}, using preset");
            AssetStatus::TimedOut
        }
    };

    PreparedAssets { background: status }
}

fn decode(background: &CustomBackground, encoded: &EncodedImage) -> RenderResult<PreparedAsset> {
    let info = probe_image(&encoded.bytes)?;
    let mime = info.format.mime().unwrap_or(&encoded.mime);
    Ok(PreparedAsset {
        href: to_data_uri(mime, &encoded.bytes),
        origin: background.origin().clone(),
        width: info.width,
        height: info.height,
    })
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;

    fn tiny_png() -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(2, 2, image::Rgba([200, 40, 40, 255]));
        let mut buf = std::io::Cursor::new(Vec::new());
        img.write_to(&mut buf, image::ImageFormat::Png).expect("encode");
        buf.into_inner()
    }

    struct RecordingFetcher {
        urls: RefCell<Vec<String>>,
        content_type: &'static str,
        body: Vec<u8>,
    }

    impl RecordingFetcher {
        fn new(content_type: &'static str, body: Vec<u8>) -> Self {
            Self {
                urls: RefCell::new(Vec::new()),
                content_type,
                body,
            }
        }
    }

    #[async_trait(?Send)]
    impl ImageFetcher for RecordingFetcher {
        async fn fetch(&self, url: &str) -> RenderResult<EncodedImage> {
            self.urls.borrow_mut().push(url.to_string());
            Ok(EncodedImage {
                mime: self.content_type.to_string(),
                bytes: self.body.clone(),
            })
        }
    }

    struct NeverTimer;

    #[async_trait(?Send)]
    impl Timer for NeverTimer {
        async fn sleep(&self, _duration: Duration) {
            future::pending::<()>().await;
        }
    }

    #[tokio::test]
    async fn test_fetch_loader_resolves_remote_background() {
        let loader = FetchAssetLoader::new(RecordingFetcher::new("image/png", tiny_png()));
        let background = CustomBackground::from_url_on_page(
            "https://cdn.example/bg.png",
            Some("https://app.example"),
        );

        let assets = prepare_assets(
            &loader,
            &NeverTimer,
            Some(&background),
            Duration::from_secs(5),
        )
        .await;

        let asset = assets.background().expect("ready");
        assert!(asset.href.starts_with("data:image/png;base64,"));
        assert_eq!(asset.origin, ImageOrigin::CrossOrigin("https://cdn.example".to_string()));
        assert_eq!((asset.width, asset.height), (2, 2));
        assert_eq!(*loader.fetcher.urls.borrow(), vec!["https://cdn.example/bg.png"]);
    }

    #[tokio::test]
    async fn test_fetch_loader_decodes_inline_without_fetching() {
        let loader = FetchAssetLoader::new(RecordingFetcher::new("", Vec::new()));
        let background = CustomBackground::from_file("image/png", &tiny_png()).expect("file");

        let encoded = loader.load(&background).await.expect("inline");
        assert_eq!(encoded.mime, "image/png");
        assert!(loader.fetcher.urls.borrow().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_loader_content_type() {
        let with_params = FetchAssetLoader::new(RecordingFetcher::new(
            "image/JPEG; charset=binary",
            tiny_png(),
        ));
        let background = CustomBackground::from_url("/bg/forest.jpg");
        assert_eq!(with_params.load(&background).await.expect("jpeg").mime, "image/jpeg");

        let sniffed = FetchAssetLoader::new(RecordingFetcher::new("", tiny_png()));
        assert_eq!(sniffed.load(&background).await.expect("png").mime, "image/png");

        let html = FetchAssetLoader::new(RecordingFetcher::new(
            "text/html",
            b"<html>not found</html>".to_vec(),
        ));
        let err = html.load(&background).await.expect_err("not an image");
        assert!(matches!(err, RenderError::Resource(ref msg) if msg.contains("text/html")));
    }

    #[test]
    fn test_decode_embeds_detected_format() {
        // Declared JPEG, actually PNG.
        let encoded = EncodedImage {
            mime: "image/jpeg".to_string(),
            bytes: tiny_png(),
        };
        let asset = decode(&CustomBackground::from_url("/bg.jpg"), &encoded).expect("decode");
        assert!(asset.href.starts_with("data:image/png;"));
    }
}
