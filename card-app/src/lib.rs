//! # Daily Log Card WASM Application
//!
//! Browser bindings for the daily log card editor.
//!
//! ## Usage
//!
//! Build for WASM:
//! ```bash
//! wasm-pack build --target web card-app
//! ```
//!
//! Then import in JavaScript:
//! ```javascript
//! import init, { CardApp } from './pkg/card_app.js';
//!
//! await init();
//! const app = new CardApp();
//! app.loadUserData(location.search, decryptedJson);
//!
//! card.addEventListener('pointermove', (e) => {
//!     const r = app.handlePointer('move', e.pointerId, e.offsetX, e.offsetY, e.timeStamp);
//!     if (r.preventDefault) e.preventDefault();
//!     if (r.changed) card.innerHTML = app.previewSvg();
//! });
//! setInterval(() => app.tick(performance.now()), 500);
//!
//! shareButton.onclick = async () => console.log(await app.exportCard());
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod browser;

use std::rc::Rc;

use card_core::{
    AccentTheme, CardNote, CardResult, CardSnapshot, CardState, ContactPoint, CustomBackground,
    FontStyle, GestureConfig, GestureResponse, InputEvent, InteractionMode, Language,
    NumberColor, PayloadDecryptor, PointerEvent, PointerPhase, ReflectionAnswer, SecureRequest,
};
use card_renderer::{
    AssetStatus, CardScene, ExportConfig, ExportPipeline, ExportResult, ExportStatus,
    FetchAssetLoader, ImageFetcher, PreparedAsset, PreparedAssets, SharePlatform, SharedAs,
    SvgRasterizer, Timer,
};
use chrono::{DateTime, NaiveDate};
use serde::Deserialize;
use wasm_bindgen::prelude::*;

use crate::browser::{BrowserImageFetcher, BrowserSharePlatform, BrowserTimer};

/// Initialize the WASM module.
#[wasm_bindgen(start)]
pub fn init_wasm() {
    console_error_panic_hook::set_once();
    tracing::info!("Daily log card WASM initialized");
}

/// Options accepted by the [`CardApp`] constructor as JSON.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct AppConfig {
    gestures: GestureConfig,
    export: ExportConfig,
}

impl AppConfig {
    fn from_json(json: Option<&str>) -> Result<Self, serde_json::Error> {
        match json.map(str::trim) {
            None | Some("") => Ok(Self::default()),
            Some(json) => serde_json::from_str(json),
        }
    }
}

/// Hands back an envelope that JavaScript already decrypted.
struct PreDecrypted(Option<serde_json::Value>);

impl PayloadDecryptor for PreDecrypted {
    fn decrypt(&self, _request: &SecureRequest) -> CardResult<serde_json::Value> {
        self.0.clone().ok_or_else(|| {
            card_core::CardError::Decryption("no decrypted payload supplied".to_string())
        })
    }
}

/// The card editor.
#[wasm_bindgen]
pub struct CardApp {
    state: CardState,
    pipeline: Rc<ExportPipeline>,
    page_origin: Option<String>,
}

#[wasm_bindgen]
impl CardApp {
    /// Create an editor showing sample data.
    ///
    /// `config_json` may set `gestures` and `export` options.
    ///
    /// # Errors
    ///
    /// Returns an error if the config is not valid JSON or no window exists.
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: Option<String>) -> Result<CardApp, JsValue> {
        let config = AppConfig::from_json(config_json.as_deref())
            .map_err(|e| JsValue::from_str(&format!("Config parse error: {e}")))?;

        let platform = BrowserSharePlatform::new()?;
        let page_origin = web_sys::window().and_then(|w| w.location().origin().ok());

        let pipeline = export_pipeline(
            config.export,
            Box::new(platform),
            Box::new(BrowserTimer),
            BrowserImageFetcher,
        );

        Ok(Self {
            state: CardState::new(today(), config.gestures),
            pipeline: Rc::new(pipeline),
            page_origin,
        })
    }

    // ---------------------------------------------------------------------
    // Data
    // ---------------------------------------------------------------------

    /// Load the daily log from the page query string.
    ///
    /// For the secure form, pass the envelope JavaScript decrypted as
    /// `decrypted_json`. Returns where the data came from (`sample`,
    /// `legacy` or `secure`).
    #[wasm_bindgen(js_name = loadUserData)]
    pub fn load_user_data(&mut self, query: &str, decrypted_json: Option<String>) -> String {
        let decrypted = decrypted_json.and_then(|json| match serde_json::from_str(&json) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!("Ignoring undecodable decrypted payload: {e}");
                None
            }
        });
        let decryptor = PreDecrypted(decrypted);
        let loaded = card_core::load_daily_log(query, Some(&decryptor), today(), now_ms());
        self.state.data = loaded.data;
        format!("{:?}", loaded.origin).to_lowercase()
    }

    /// Current data as JSON.
    #[wasm_bindgen(js_name = dataJson)]
    #[must_use]
    pub fn data_json(&self) -> String {
        serde_json::to_string(&self.state.data).unwrap_or_default()
    }

    // ---------------------------------------------------------------------
    // Gestures
    // ---------------------------------------------------------------------

    /// Feed a pointer event (`down`, `move`, `up`, `cancel`).
    ///
    /// Returns `{ preventDefault, changed }`.
    #[wasm_bindgen(js_name = handlePointer)]
    pub fn handle_pointer(&mut self, phase: &str, id: u32, x: f32, y: f32, timestamp: f64) -> JsValue {
        let event = InputEvent::Pointer(PointerEvent::new(
            PointerPhase::from_name(phase),
            ContactPoint::new(id, x, y),
            to_ms(timestamp),
        ));
        response_to_js(self.state.process_event(&event))
    }

    /// Feed a wheel event. Returns `{ preventDefault, changed }`.
    #[wasm_bindgen(js_name = handleWheel)]
    pub fn handle_wheel(&mut self, delta_y: f32, timestamp: f64) -> JsValue {
        let event = InputEvent::Wheel {
            delta_y,
            timestamp_ms: to_ms(timestamp),
        };
        response_to_js(self.state.process_event(&event))
    }

    /// Advance the inactivity timer. Returns `true` if edit mode ended.
    pub fn tick(&mut self, timestamp: f64) -> bool {
        self.state.gestures_mut().tick(to_ms(timestamp))
    }

    /// Current zoom scale.
    #[must_use]
    pub fn scale(&self) -> f32 {
        self.state.gestures().scale()
    }

    /// Set the zoom scale (zoom slider).
    #[wasm_bindgen(js_name = setScale)]
    pub fn set_scale(&mut self, value: f32) {
        self.state.gestures_mut().set_scale(value);
    }

    /// Horizontal pan offset.
    #[wasm_bindgen(js_name = offsetX)]
    #[must_use]
    pub fn offset_x(&self) -> f32 {
        self.state.gestures().offset().x
    }

    /// Vertical pan offset.
    #[wasm_bindgen(js_name = offsetY)]
    #[must_use]
    pub fn offset_y(&self) -> f32 {
        self.state.gestures().offset().y
    }

    /// `view` or `edit`.
    #[must_use]
    pub fn mode(&self) -> String {
        match self.state.mode() {
            InteractionMode::View => "view".to_string(),
            InteractionMode::Edit => "edit".to_string(),
        }
    }

    /// Reset pan and zoom.
    #[wasm_bindgen(js_name = resetLayout)]
    pub fn reset_layout(&mut self) {
        self.state.gestures_mut().reset();
    }

    /// Leave edit mode now.
    #[wasm_bindgen(js_name = finishEditing)]
    pub fn finish_editing(&mut self) {
        self.state.gestures_mut().finish_editing();
    }

    // ---------------------------------------------------------------------
    // Style
    // ---------------------------------------------------------------------

    /// Select a font style by id.
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown id.
    #[wasm_bindgen(js_name = setFont)]
    pub fn set_font(&mut self, id: &str) -> Result<(), JsValue> {
        self.state.style.font = FontStyle::from_id(id)
            .ok_or_else(|| JsValue::from_str(&format!("Unknown font style: {id}")))?;
        Ok(())
    }

    /// Select a number color by id (`auto` follows the background).
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown id.
    #[wasm_bindgen(js_name = setNumberColor)]
    pub fn set_number_color(&mut self, id: &str) -> Result<(), JsValue> {
        self.state.style.number_color = NumberColor::from_id(id)
            .ok_or_else(|| JsValue::from_str(&format!("Unknown number color: {id}")))?;
        Ok(())
    }

    /// Advance the accent theme. Returns its color.
    #[wasm_bindgen(js_name = cycleAccent)]
    pub fn cycle_accent(&mut self) -> String {
        self.state.style.cycle_accent();
        self.accent_color()
    }

    /// Current accent color.
    #[wasm_bindgen(js_name = accentColor)]
    #[must_use]
    pub fn accent_color(&self) -> String {
        let accent: AccentTheme = self.state.style.accent;
        accent.hex().to_string()
    }

    /// Advance the background preset. Returns `false` while a custom image is set.
    #[wasm_bindgen(js_name = cycleBackground)]
    pub fn cycle_background(&mut self) -> bool {
        self.state.style.cycle_background()
    }

    /// Switch between English and Japanese labels.
    #[wasm_bindgen(js_name = toggleLanguage)]
    pub fn toggle_language(&mut self) -> String {
        self.state.style.language = self.state.style.language.toggled();
        match self.state.style.language {
            Language::En => "en".to_string(),
            Language::Ja => "ja".to_string(),
        }
    }

    /// Show the date as `MM/DD/YYYY`.
    #[wasm_bindgen(js_name = setNumericDate)]
    pub fn set_numeric_date(&mut self, numeric: bool) {
        self.state.style.numeric_date = numeric;
    }

    /// Mask the weight reading.
    #[wasm_bindgen(js_name = setHideWeight)]
    pub fn set_hide_weight(&mut self, hide: bool) {
        self.state.style.hide_weight = hide;
    }

    /// Set overlay darkness over a custom background (clamped to `[0, 0.95]`).
    #[wasm_bindgen(js_name = setOverlayOpacity)]
    pub fn set_overlay_opacity(&mut self, value: f32) {
        self.state.style.set_overlay_opacity(value);
    }

    /// Show a preset reflection answer (e.g. `pretty-good`).
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown answer id.
    #[wasm_bindgen(js_name = setReflection)]
    pub fn set_reflection(&mut self, id: &str) -> Result<(), JsValue> {
        let answer: ReflectionAnswer = serde_json::from_value(serde_json::Value::from(id))
            .map_err(|_| JsValue::from_str(&format!("Unknown reflection answer: {id}")))?;
        self.state.style.note = Some(CardNote::Preset(answer));
        Ok(())
    }

    /// Show free text as the note.
    #[wasm_bindgen(js_name = setCustomNote)]
    pub fn set_custom_note(&mut self, text: &str) {
        self.state.style.note = Some(CardNote::Custom(text.to_string()));
    }

    /// Hide the note.
    #[wasm_bindgen(js_name = clearNote)]
    pub fn clear_note(&mut self) {
        self.state.style.note = None;
    }

    /// Style as JSON.
    #[wasm_bindgen(js_name = styleJson)]
    #[must_use]
    pub fn style_json(&self) -> String {
        serde_json::to_string(&self.state.style).unwrap_or_default()
    }

    // ---------------------------------------------------------------------
    // Background
    // ---------------------------------------------------------------------

    /// Use a file picked by the user as the background.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is not an image.
    #[wasm_bindgen(js_name = setCustomImageBytes)]
    pub fn set_custom_image_bytes(&mut self, mime: &str, bytes: &[u8]) -> Result<(), JsValue> {
        self.state
            .set_background_file(mime, bytes)
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }

    /// Use an image URL as the background.
    #[wasm_bindgen(js_name = setCustomImageUrl)]
    pub fn set_custom_image_url(&mut self, href: &str) {
        self.state.style.custom_background = Some(CustomBackground::from_url_on_page(
            href,
            self.page_origin.as_deref(),
        ));
    }

    /// Remove the custom background.
    #[wasm_bindgen(js_name = clearCustomImage)]
    pub fn clear_custom_image(&mut self) {
        self.state.clear_background();
    }

    // ---------------------------------------------------------------------
    // Rendering and export
    // ---------------------------------------------------------------------

    /// SVG markup of the card as currently laid out.
    #[wasm_bindgen(js_name = previewSvg)]
    #[must_use]
    pub fn preview_svg(&self) -> String {
        let snapshot = self.state.snapshot();
        CardScene::build(&snapshot, &preview_assets(&snapshot))
            .svg()
            .to_string()
    }

    /// Render the card to PNG and share or download it.
    ///
    /// Resolves to `null` if an export is already running, otherwise to
    /// `{ kind, filename?, reason? }` with `kind` one of `shared-file`,
    /// `shared-link`, `downloaded` or `failed`.
    #[wasm_bindgen(js_name = exportCard)]
    pub fn export_card(&self) -> js_sys::Promise {
        let pipeline = Rc::clone(&self.pipeline);
        let snapshot = self.state.snapshot();
        let today = today();
        wasm_bindgen_futures::future_to_promise(async move {
            Ok(pipeline
                .export(&snapshot, today)
                .await
                .map_or(JsValue::NULL, |result| result_to_js(&result)))
        })
    }

    /// `idle`, `preparing`, `rendering`, `delivering` or `failed`.
    #[wasm_bindgen(js_name = exportStatus)]
    #[must_use]
    pub fn export_status(&self) -> String {
        match self.pipeline.status() {
            ExportStatus::Idle => "idle",
            ExportStatus::Preparing => "preparing",
            ExportStatus::Rendering => "rendering",
            ExportStatus::Delivering => "delivering",
            ExportStatus::Failed(_) => "failed",
        }
        .to_string()
    }

    /// Whether an export is running.
    #[wasm_bindgen(js_name = isExporting)]
    #[must_use]
    pub fn is_exporting(&self) -> bool {
        self.pipeline.is_exporting()
    }

    /// Dismiss the export failure notice.
    #[wasm_bindgen(js_name = dismissExportError)]
    pub fn dismiss_export_error(&self) {
        self.pipeline.clear_failure();
    }
}

/// Export pipeline with the renderer and a loader that resolves every
/// background origin through `fetcher`.
fn export_pipeline(
    config: ExportConfig,
    platform: Box<dyn SharePlatform>,
    timer: Box<dyn Timer>,
    fetcher: impl ImageFetcher + 'static,
) -> ExportPipeline {
    ExportPipeline::new(config, Box::new(SvgRasterizer::new()), platform, timer)
        .with_loader(Box::new(FetchAssetLoader::new(fetcher)))
}

/// The browser paints the background `<img>` itself, so the preview embeds
/// the reference as-is without waiting for it.
fn preview_assets(snapshot: &CardSnapshot) -> PreparedAssets {
    let Some(background) = snapshot.style.custom_background.as_ref() else {
        return PreparedAssets::none();
    };
    PreparedAssets {
        background: AssetStatus::Ready(PreparedAsset {
            href: background.href().to_string(),
            origin: background.origin().clone(),
            width: 0,
            height: 0,
        }),
    }
}

fn response_to_js(response: GestureResponse) -> JsValue {
    let obj = js_sys::Object::new();
    let _ = js_sys::Reflect::set(
        &obj,
        &JsValue::from_str("preventDefault"),
        &JsValue::from_bool(response.prevent_default),
    );
    let _ = js_sys::Reflect::set(
        &obj,
        &JsValue::from_str("changed"),
        &JsValue::from_bool(response.changed),
    );
    obj.into()
}

fn result_to_js(result: &ExportResult) -> JsValue {
    let obj = js_sys::Object::new();
    let (kind, key, value) = match result {
        ExportResult::Shared(SharedAs::File) => ("shared-file", None, None),
        ExportResult::Shared(SharedAs::Link) => ("shared-link", None, None),
        ExportResult::Downloaded { filename } => ("downloaded", Some("filename"), Some(filename)),
        ExportResult::Failed { reason } => ("failed", Some("reason"), Some(reason)),
    };
    let _ = js_sys::Reflect::set(&obj, &JsValue::from_str("kind"), &JsValue::from_str(kind));
    if let (Some(key), Some(value)) = (key, value) {
        let _ = js_sys::Reflect::set(&obj, &JsValue::from_str(key), &JsValue::from_str(value));
    }
    obj.into()
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_ms(timestamp: f64) -> u64 {
    if timestamp.is_finite() && timestamp > 0.0 {
        timestamp as u64
    } else {
        0
    }
}

#[allow(clippy::cast_possible_truncation)]
fn now_ms() -> i64 {
    js_sys::Date::now() as i64
}

/// Calendar date in the user's time zone.
fn today() -> NaiveDate {
    let now = js_sys::Date::new_0();
    local_date(now.get_full_year(), now.get_month(), now.get_date()).unwrap_or_else(|| {
        DateTime::from_timestamp_millis(now_ms()).map_or(NaiveDate::MIN, |dt| dt.date_naive())
    })
}

/// `month0` is zero-based, as `Date.prototype.getMonth` returns it.
#[allow(clippy::cast_possible_wrap)]
fn local_date(year: u32, month0: u32, day: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year as i32, month0 + 1, day)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let config = AppConfig::from_json(None).expect("config");
        assert_eq!(config.gestures, GestureConfig::default());
        assert_eq!(config.export, ExportConfig::default());
        assert!(AppConfig::from_json(Some("  ")).is_ok());
    }

    #[test]
    fn partial_config_is_merged() {
        let config = AppConfig::from_json(Some(
            r#"{"gestures": {"max_scale": 2.0}, "export": {"filename_prefix": "daylog"}}"#,
        ))
        .expect("config");
        assert!((config.gestures.max_scale - 2.0).abs() < f32::EPSILON);
        assert!((config.gestures.min_scale - 0.3).abs() < f32::EPSILON);
        assert_eq!(config.export.filename_prefix, "daylog");
    }

    #[test]
    fn invalid_config_is_rejected() {
        assert!(AppConfig::from_json(Some("{not json")).is_err());
    }

    #[test]
    fn pre_decrypted_payload_is_returned() {
        let request = SecureRequest {
            ciphertext: "x".to_string(),
            timestamp: 1,
            user_id: "u".to_string(),
        };
        let value = serde_json::json!({"userId": "u"});
        assert_eq!(
            PreDecrypted(Some(value.clone())).decrypt(&request).expect("value"),
            value
        );
        assert!(PreDecrypted(None).decrypt(&request).is_err());
    }

    #[test]
    fn timestamps_are_clamped() {
        assert_eq!(to_ms(1234.9), 1234);
        assert_eq!(to_ms(-5.0), 0);
        assert_eq!(to_ms(f64::NAN), 0);
    }

    #[test]
    fn local_date_uses_zero_based_month() {
        // 08:30 JST on Nov 13 is still Nov 12 in UTC.
        assert_eq!(
            local_date(2024, 10, 13),
            NaiveDate::from_ymd_opt(2024, 11, 13)
        );
        assert_eq!(local_date(2024, 11, 31), NaiveDate::from_ymd_opt(2024, 12, 31));
        assert_eq!(local_date(2024, 12, 1), None);
    }

    mod export {
        use std::cell::RefCell;
        use std::time::Duration;

        use async_trait::async_trait;
        use card_renderer::{EncodedImage, ExportFile, RenderResult, ShareError, ShareLink};

        use super::*;

        fn red_png() -> Vec<u8> {
            let img = image::RgbaImage::from_pixel(4, 4, image::Rgba([200, 40, 40, 255]));
            let mut buf = std::io::Cursor::new(Vec::new());
            img.write_to(&mut buf, image::ImageFormat::Png).expect("encode");
            buf.into_inner()
        }

        /// Serves one image for any URL and remembers what was asked for.
        struct ServedImage {
            requests: Rc<RefCell<Vec<String>>>,
        }

        #[async_trait(?Send)]
        impl ImageFetcher for ServedImage {
            async fn fetch(&self, url: &str) -> RenderResult<EncodedImage> {
                self.requests.borrow_mut().push(url.to_string());
                Ok(EncodedImage {
                    mime: "image/png".to_string(),
                    bytes: red_png(),
                })
            }
        }

        struct NeverTimer;

        #[async_trait(?Send)]
        impl Timer for NeverTimer {
            async fn sleep(&self, _duration: Duration) {
                futures::future::pending::<()>().await;
            }
        }

        /// No share targets; keeps the downloaded PNG.
        struct DownloadOnly {
            downloaded: Rc<RefCell<Vec<u8>>>,
        }

        #[async_trait(?Send)]
        impl SharePlatform for DownloadOnly {
            fn can_share_file(&self, _file: &ExportFile) -> bool {
                false
            }

            fn can_share_link(&self) -> bool {
                false
            }

            async fn share_file(
                &self,
                _file: &ExportFile,
                _link: &ShareLink,
            ) -> Result<(), ShareError> {
                Err(ShareError::Unsupported("files".to_string()))
            }

            async fn share_link(&self, _link: &ShareLink) -> Result<(), ShareError> {
                Err(ShareError::Unsupported("links".to_string()))
            }

            async fn download(&self, file: &ExportFile) -> Result<(), ShareError> {
                *self.downloaded.borrow_mut() = file.bytes.clone();
                Ok(())
            }
        }

        fn export_with_background(background: CustomBackground) -> (Vec<String>, Vec<u8>) {
            let requests = Rc::new(RefCell::new(Vec::new()));
            let downloaded = Rc::new(RefCell::new(Vec::new()));
            let pipeline = export_pipeline(
                ExportConfig::default(),
                Box::new(DownloadOnly {
                    downloaded: Rc::clone(&downloaded),
                }),
                Box::new(NeverTimer),
                ServedImage {
                    requests: Rc::clone(&requests),
                },
            );

            let date = NaiveDate::from_ymd_opt(2024, 11, 12).expect("date");
            let mut state = CardState::new(date, GestureConfig::default());
            state.style.custom_background = Some(background);

            let result = futures::executor::block_on(pipeline.export(&state.snapshot(), date));
            assert_eq!(
                result,
                Some(ExportResult::Downloaded {
                    filename: "summary_2024-11-12.png".to_string()
                })
            );
            let requests = requests.borrow().clone();
            let png = downloaded.borrow().clone();
            (requests, png)
        }

        fn assert_background_drawn(png: &[u8]) {
            let decoded = image::load_from_memory(png).expect("png").to_rgba8();
            let pixel = decoded.get_pixel(0, decoded.height() - 1);
            // Red image under the overlay; the dark preset would be near black.
            assert!(pixel[0] > pixel[1], "corner pixel {pixel:?}");
            assert!(pixel[0] > 20, "corner pixel {pixel:?}");
        }

        #[test]
        fn same_origin_url_background_is_fetched_for_export() {
            let (requests, png) = export_with_background(CustomBackground::from_url_on_page(
                "/bg/forest.jpg",
                Some("https://app.example"),
            ));
            assert_eq!(requests, vec!["/bg/forest.jpg"]);
            assert_background_drawn(&png);
        }

        #[test]
        fn cross_origin_url_background_survives_strict_rejection() {
            let (requests, png) = export_with_background(CustomBackground::from_url_on_page(
                "https://cdn.example/bg.png",
                Some("https://app.example"),
            ));
            assert_eq!(requests, vec!["https://cdn.example/bg.png"]);
            assert_background_drawn(&png);
        }
    }

    #[test]
    fn preview_embeds_background_reference() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).expect("date");
        let mut state = CardState::new(date, GestureConfig::default());
        state.style.custom_background = Some(CustomBackground::from_url("/bg/forest.jpg"));
        let assets = preview_assets(&state.snapshot());
        assert_eq!(
            assets.background().map(|a| a.href.as_str()),
            Some("/bg/forest.jpg")
        );
    }
}
