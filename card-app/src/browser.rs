//! Browser implementations of the renderer's host seams.

use std::time::Duration;

use async_trait::async_trait;
use card_renderer::{
    EncodedImage, ExportFile, ImageFetcher, RenderError, RenderResult, ShareError, ShareLink,
    SharePlatform, Timer,
};
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;

/// Timer backed by `setTimeout`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BrowserTimer;

#[async_trait(?Send)]
impl Timer for BrowserTimer {
    async fn sleep(&self, duration: Duration) {
        gloo_timers::future::sleep(duration).await;
    }
}

/// Fetches background images with the Fetch API.
///
/// Cross-origin images need CORS headers to be read at all; the request
/// fails otherwise and the card falls back to its preset background.
#[derive(Debug, Clone, Copy, Default)]
pub struct BrowserImageFetcher;

#[async_trait(?Send)]
impl ImageFetcher for BrowserImageFetcher {
    async fn fetch(&self, url: &str) -> RenderResult<EncodedImage> {
        let response = gloo_net::http::Request::get(url)
            .send()
            .await
            .map_err(|e| RenderError::Resource(format!("Failed to fetch {url}: {e}")))?;
        if !response.ok() {
            return Err(RenderError::Resource(format!(
                "Failed to fetch {url}: HTTP {}",
                response.status()
            )));
        }
        let mime = response.headers().get("content-type").unwrap_or_default();
        let bytes = response
            .binary()
            .await
            .map_err(|e| RenderError::Resource(format!("Failed to read {url}: {e}")))?;
        Ok(EncodedImage { mime, bytes })
    }
}

/// Web Share API with an anchor-download fallback.
pub struct BrowserSharePlatform {
    window: web_sys::Window,
}

impl BrowserSharePlatform {
    /// Bind to the current window.
    ///
    /// # Errors
    ///
    /// Returns an error outside a browsing context.
    pub fn new() -> Result<Self, JsValue> {
        let window = web_sys::window().ok_or_else(|| JsValue::from_str("No window object"))?;
        Ok(Self { window })
    }

    fn navigator(&self) -> JsValue {
        self.window.navigator().into()
    }

    /// `navigator[name]` if it is callable.
    fn navigator_fn(&self, name: &str) -> Option<js_sys::Function> {
        js_sys::Reflect::get(&self.navigator(), &JsValue::from_str(name))
            .ok()?
            .dyn_into::<js_sys::Function>()
            .ok()
    }

    async fn call_share(&self, data: &js_sys::Object) -> Result<(), ShareError> {
        let share = self
            .navigator_fn("share")
            .ok_or_else(|| ShareError::Unsupported("navigator.share missing".to_string()))?;
        let promise = share
            .call1(&self.navigator(), data)
            .map_err(share_error_from_js)?
            .dyn_into::<js_sys::Promise>()
            .map_err(|_| ShareError::Failed("navigator.share did not return a promise".into()))?;
        JsFuture::from(promise)
            .await
            .map(|_| ())
            .map_err(share_error_from_js)
    }
}

#[async_trait(?Send)]
impl SharePlatform for BrowserSharePlatform {
    fn can_share_file(&self, file: &ExportFile) -> bool {
        let Some(can_share) = self.navigator_fn("canShare") else {
            return false;
        };
        let Ok(data) = file_share_data(file, None) else {
            return false;
        };
        can_share
            .call1(&self.navigator(), &data)
            .is_ok_and(|v| v.is_truthy())
    }

    fn can_share_link(&self) -> bool {
        self.navigator_fn("share").is_some()
    }

    async fn share_file(&self, file: &ExportFile, link: &ShareLink) -> Result<(), ShareError> {
        let data = file_share_data(file, Some(link)).map_err(share_error_from_js)?;
        self.call_share(&data).await
    }

    async fn share_link(&self, link: &ShareLink) -> Result<(), ShareError> {
        let data = js_sys::Object::new();
        set_link_fields(&data, link).map_err(share_error_from_js)?;
        self.call_share(&data).await
    }

    async fn download(&self, file: &ExportFile) -> Result<(), ShareError> {
        let url = start_download(&self.window, file).map_err(share_error_from_js)?;
        tracing::info!("Downloading {} ({} bytes)", file.filename, file.len());
        // Some browsers read the object URL after `click()` returns.
        gloo_timers::future::sleep(Duration::from_secs(1)).await;
        web_sys::Url::revoke_object_url(&url).ok();
        Ok(())
    }
}

fn byte_parts(bytes: &[u8]) -> js_sys::Array {
    let parts = js_sys::Array::new();
    parts.push(&js_sys::Uint8Array::from(bytes));
    parts
}

fn file_share_data(file: &ExportFile, link: Option<&ShareLink>) -> Result<js_sys::Object, JsValue> {
    let options = web_sys::FilePropertyBag::new();
    options.set_type(file.mime);
    let js_file = web_sys::File::new_with_u8_array_sequence_and_options(
        &byte_parts(&file.bytes),
        &file.filename,
        &options,
    )?;
    let files = js_sys::Array::new();
    files.push(&js_file);

    let data = js_sys::Object::new();
    js_sys::Reflect::set(&data, &"files".into(), &files)?;
    if let Some(link) = link {
        // The file already carries the card; a url would replace it on some targets.
        js_sys::Reflect::set(&data, &"title".into(), &link.title.as_str().into())?;
        js_sys::Reflect::set(&data, &"text".into(), &link.text.as_str().into())?;
    }
    Ok(data)
}

fn set_link_fields(data: &js_sys::Object, link: &ShareLink) -> Result<(), JsValue> {
    js_sys::Reflect::set(data, &"title".into(), &link.title.as_str().into())?;
    js_sys::Reflect::set(data, &"text".into(), &link.text.as_str().into())?;
    if let Some(url) = &link.url {
        js_sys::Reflect::set(data, &"url".into(), &url.as_str().into())?;
    }
    Ok(())
}

/// Click a temporary anchor pointing at an object URL. Returns the URL so
/// the caller can revoke it.
fn start_download(window: &web_sys::Window, file: &ExportFile) -> Result<String, JsValue> {
    let document = window
        .document()
        .ok_or_else(|| JsValue::from_str("No document object"))?;

    let options = web_sys::BlobPropertyBag::new();
    options.set_type(file.mime);
    let blob = web_sys::Blob::new_with_u8_array_sequence_and_options(&byte_parts(&file.bytes), &options)?;
    let url = web_sys::Url::create_object_url_with_blob(&blob)?;

    let anchor = document
        .create_element("a")?
        .dyn_into::<web_sys::HtmlAnchorElement>()
        .map_err(|_| JsValue::from_str("Failed to cast to anchor"))?;
    anchor.set_href(&url);
    anchor.set_download(&file.filename);
    anchor.click();

    Ok(url)
}

/// Classify a rejected share promise.
fn share_error_from_js(error: JsValue) -> ShareError {
    if let Some(exception) = error.dyn_ref::<web_sys::DomException>() {
        return share_error_from_name(&exception.name(), &exception.message());
    }
    if let Some(js_error) = error.dyn_ref::<js_sys::Error>() {
        let name: String = js_error.name().into();
        let message: String = js_error.message().into();
        return share_error_from_name(&name, &message);
    }
    ShareError::Failed(format!("{error:?}"))
}

/// Map a DOM exception name onto a share outcome.
pub(crate) fn share_error_from_name(name: &str, message: &str) -> ShareError {
    match name {
        "AbortError" => ShareError::Cancelled,
        "NotAllowedError" | "TypeError" | "DataError" => {
            ShareError::Unsupported(format!("{name}: {message}"))
        }
        _ => ShareError::Failed(format!("{name}: {message}")),
    }
}
