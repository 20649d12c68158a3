//! Card scene as SVG.
//!
//! The card is a fixed 375x640 canvas made of two layers:
//!
//! ```text
//! ┌───────────────────────────┐
//! │ background (static)       │  preset fill + glow, or image + overlay
//! │  ┌─────────────────────┐  │
//! │  │ content (movable)   │  │  translate(offset) · scale about center
//! │  │  date / stats / PFC │  │
//! │  └─────────────────────┘  │
//! └───────────────────────────┘
//! ```

use std::fmt::Write;

use card_core::{CardNote, CardSnapshot, DailyLogData, ImageOrigin, MacroAmount};

use crate::assets::{PreparedAsset, PreparedAssets};
use crate::labels::Labels;

/// Card width in CSS pixels.
pub const CARD_WIDTH: f32 = 375.0;
/// Card height in CSS pixels.
pub const CARD_HEIGHT: f32 = 640.0;

const PADDING: f32 = 24.0;

const TREND_DOWN: &str = "#22c55e";
const TREND_UP: &str = "#ef4444";
const PROTEIN_COLOR: &str = "#ef4444";
const FAT_COLOR: &str = "#facc15";
const CARBS_COLOR: &str = "#22c55e";

struct Palette {
    primary: &'static str,
    secondary: &'static str,
    tertiary: &'static str,
    muted: &'static str,
    border: &'static str,
    track: &'static str,
    glow: &'static str,
}

const DARK: Palette = Palette {
    primary: "#ffffff",
    secondary: "rgba(255,255,255,0.8)",
    tertiary: "rgba(255,255,255,0.2)",
    muted: "rgba(255,255,255,0.7)",
    border: "rgba(255,255,255,0.1)",
    track: "rgba(255,255,255,0.1)",
    glow: "rgba(39,39,42,0.2)",
};

const LIGHT: Palette = Palette {
    primary: "#18181b",
    secondary: "#3f3f46",
    tertiary: "#d4d4d8",
    muted: "#27272a",
    border: "#e4e4e7",
    track: "#f4f4f5",
    glow: "rgba(228,228,231,0.4)",
};

/// A rendered card ready for rasterization.
#[derive(Debug, Clone, PartialEq)]
pub struct CardScene {
    svg: String,
    origins: Vec<ImageOrigin>,
}

impl CardScene {
    /// Build the scene for a snapshot using whatever assets are ready.
    ///
    /// A custom background that is not ready falls back to the preset.
    #[must_use]
    pub fn build(snapshot: &CardSnapshot, assets: &PreparedAssets) -> Self {
        let background = snapshot
            .style
            .custom_background
            .as_ref()
            .and(assets.background());
        let builder = SceneBuilder::new(snapshot, background);
        let svg = builder.render();
        let origins = background.map(|a| a.origin.clone()).into_iter().collect();
        Self { svg, origins }
    }

    /// SVG document text.
    #[must_use]
    pub fn svg(&self) -> &str {
        &self.svg
    }

    /// Origins of every image embedded in the scene.
    #[must_use]
    pub fn image_origins(&self) -> &[ImageOrigin] {
        &self.origins
    }

    /// Whether any embedded image comes from another origin.
    #[must_use]
    pub fn has_cross_origin_assets(&self) -> bool {
        self.origins
            .iter()
            .any(|o| matches!(o, ImageOrigin::CrossOrigin(_)))
    }
}

struct SceneBuilder<'a> {
    snapshot: &'a CardSnapshot,
    background: Option<&'a PreparedAsset>,
    palette: &'static Palette,
    labels: &'static Labels,
    number_color: &'static str,
    svg: String,
}

impl<'a> SceneBuilder<'a> {
    fn new(snapshot: &'a CardSnapshot, background: Option<&'a PreparedAsset>) -> Self {
        let dark = background.is_some() || snapshot.style.background.is_dark();
        let palette = if dark { &DARK } else { &LIGHT };
        Self {
            snapshot,
            background,
            palette,
            labels: Labels::for_language(snapshot.style.language),
            number_color: snapshot.style.number_color.hex().unwrap_or(palette.primary),
            svg: String::with_capacity(8192),
        }
    }

    fn render(mut self) -> String {
        let _ = write!(
            self.svg,
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{CARD_WIDTH}\" height=\"{CARD_HEIGHT}\" viewBox=\"0 0 {CARD_WIDTH} {CARD_HEIGHT}\">",
        );
        self.background_layer();
        self.content_layer();
        self.svg.push_str("</svg>");
        self.svg
    }

    fn background_layer(&mut self) {
        if let Some(asset) = self.background {
            let opacity = self.snapshot.style.overlay_opacity();
            let _ = write!(
                self.svg,
                "<rect width=\"100%\" height=\"100%\" fill=\"#000000\"/>\
                 <image x=\"0\" y=\"0\" width=\"{CARD_WIDTH}\" height=\"{CARD_HEIGHT}\" preserveAspectRatio=\"xMidYMid slice\" href=\"{}\"/>\
                 <rect width=\"100%\" height=\"100%\" fill=\"#000000\" fill-opacity=\"{opacity}\"/>",
                escape_xml(&asset.href),
            );
            return;
        }

        let style = &self.snapshot.style;
        let _ = write!(
            self.svg,
            "<defs><radialGradient id=\"glow\" cx=\"1\" cy=\"0\" r=\"1\">\
             <stop offset=\"0\" stop-color=\"{glow}\"/>\
             <stop offset=\"1\" stop-color=\"{fill}\" stop-opacity=\"0\"/>\
             </radialGradient></defs>\
             <rect width=\"100%\" height=\"100%\" fill=\"{fill}\"/>\
             <rect width=\"100%\" height=\"100%\" fill=\"url(#glow)\"/>\
             <circle cx=\"{cx}\" cy=\"64\" r=\"128\" fill=\"{accent}\" fill-opacity=\"0.05\"/>",
            glow = self.palette.glow,
            fill = style.background.fill(),
            cx = CARD_WIDTH - 64.0,
            accent = style.accent.hex(),
        );
    }

    fn content_layer(&mut self) {
        let transform = self.snapshot.transform;
        let (cx, cy) = (CARD_WIDTH / 2.0, CARD_HEIGHT / 2.0);
        let _ = write!(
            self.svg,
            "<g transform=\"translate({},{}) translate({cx},{cy}) scale({}) translate({},{})\">",
            transform.offset.x, transform.offset.y, transform.scale, -cx, -cy,
        );

        let snapshot = self.snapshot;
        let data = &snapshot.data;
        self.header(data);
        self.stats_row(data);
        let mut y = self.macro_section(data);

        if let Some(note) = snapshot.style.note.as_ref().and_then(CardNote::text) {
            y += 40.0;
            self.label(PADDING, y, 10.0, self.labels.reflection_prompt, "start");
            y += 26.0;
            self.value_text(PADDING, y, 15.0, note, "start", self.palette.primary, false);
        }

        y += 44.0;
        self.label(CARD_WIDTH / 2.0, y, 9.0, self.labels.mascot, "middle");
        self.svg.push_str("</g>");
    }

    fn header(&mut self, data: &DailyLogData) {
        self.label(PADDING, 40.0, 10.0, self.labels.date, "start");
        let date = if self.snapshot.style.numeric_date {
            data.date.format("%m/%d/%Y").to_string()
        } else {
            data.date.format("%b %-d").to_string().to_uppercase()
        };
        self.value_text(PADDING, 74.0, 30.0, &date, "start", self.number_color, true);
        let _ = write!(
            self.svg,
            "<line x1=\"{PADDING}\" y1=\"92\" x2=\"{}\" y2=\"92\" stroke=\"{}\" stroke-width=\"1\"/>",
            CARD_WIDTH - PADDING,
            self.palette.border,
        );
    }

    fn stats_row(&mut self, data: &DailyLogData) {
        let (left, center, right) = (PADDING, CARD_WIDTH / 2.0, CARD_WIDTH - PADDING);
        let (caption_y, value_y, sub_y) = (124.0, 152.0, 170.0);

        self.label(left, caption_y, 8.0, self.labels.weight, "start");
        if self.snapshot.style.hide_weight {
            self.value_text(left, value_y, 18.0, "●●●", "start", self.palette.tertiary, true);
            self.value_text(left, sub_y, 9.0, self.labels.private, "start", self.palette.muted, false);
        } else {
            let weight = format!("{} KG", format_number(data.weight.current));
            self.value_text(left, value_y, 24.0, &weight, "start", self.number_color, true);
            let diff = data.weight.diff;
            let (arrow, color) = if diff < 0.0 {
                ("▼", TREND_DOWN)
            } else if diff > 0.0 {
                ("▲", TREND_UP)
            } else {
                ("–", self.palette.secondary)
            };
            let text = format!("{arrow} {} kg", format_number(diff.abs()));
            self.value_text(left, sub_y, 10.0, &text, "start", color, false);
        }

        self.label(center, caption_y, 8.0, self.labels.intake, "middle");
        let intake = format_number(data.calories.current);
        self.value_text(center, value_y, 24.0, &intake, "middle", self.number_color, true);
        let target = format!("/ {} KCAL", format_number(data.calories.target));
        self.value_text(center, sub_y, 10.0, &target, "middle", self.palette.secondary, false);

        self.label(right, caption_y, 8.0, self.labels.burned, "end");
        let burned = format_number(data.exercise.calories_burned);
        self.value_text(right, value_y, 24.0, &burned, "end", self.number_color, true);
        self.value_text(right, sub_y, 10.0, "KCAL", "end", self.palette.secondary, false);
    }

    /// Returns the y coordinate below the last bar.
    fn macro_section(&mut self, data: &DailyLogData) -> f32 {
        self.label(PADDING, 224.0, 10.0, self.labels.macro_title, "start");
        let bars = [
            (self.labels.protein, &data.pfc.p, PROTEIN_COLOR),
            (self.labels.fat, &data.pfc.f, FAT_COLOR),
            (self.labels.carbs, &data.pfc.c, CARBS_COLOR),
        ];
        let mut y = 256.0;
        for (caption, amount, color) in bars {
            self.macro_bar(y, caption, amount, color);
            y += 52.0;
        }
        // Bottom of the last track.
        y - 36.0
    }

    #[allow(clippy::cast_possible_truncation)]
    fn macro_bar(&mut self, y: f32, caption: &str, amount: &MacroAmount, color: &str) {
        let width = CARD_WIDTH - PADDING * 2.0;
        self.label(PADDING, y, 9.0, caption, "start");
        let value = format!(
            "{} / {} {}",
            format_number(amount.current),
            format_number(amount.target),
            amount.unit
        );
        self.value_text(CARD_WIDTH - PADDING, y, 11.0, &value, "end", self.number_color, false);
        let filled = width * amount.progress() as f32;
        let _ = write!(
            self.svg,
            "<rect x=\"{PADDING}\" y=\"{ty}\" width=\"{width}\" height=\"6\" rx=\"3\" fill=\"{track}\"/>\
             <rect x=\"{PADDING}\" y=\"{ty}\" width=\"{filled}\" height=\"6\" rx=\"3\" fill=\"{color}\"/>",
            ty = y + 10.0,
            track = self.palette.track,
        );
    }

    fn label(&mut self, x: f32, y: f32, size: f32, text: &str, anchor: &str) {
        let font = self.snapshot.style.font;
        let weight = if font.bold_labels() { "bold" } else { "normal" };
        let _ = write!(
            self.svg,
            "<text x=\"{x}\" y=\"{y}\" font-size=\"{size}\" font-family=\"{}\" font-weight=\"{weight}\" letter-spacing=\"{}\" text-anchor=\"{anchor}\" fill=\"{}\">{}</text>",
            escape_xml(font.label_family()),
            font.label_tracking() * size,
            self.palette.secondary,
            escape_xml(&text.to_uppercase()),
        );
    }

    #[allow(clippy::too_many_arguments)]
    fn value_text(
        &mut self,
        x: f32,
        y: f32,
        size: f32,
        text: &str,
        anchor: &str,
        color: &str,
        bold: bool,
    ) {
        let weight = if bold { "bold" } else { "normal" };
        let _ = write!(
            self.svg,
            "<text x=\"{x}\" y=\"{y}\" font-size=\"{size}\" font-family=\"{}\" font-weight=\"{weight}\" text-anchor=\"{anchor}\" fill=\"{}\">{}</text>",
            escape_xml(self.snapshot.style.font.value_family()),
            escape_xml(color),
            escape_xml(text),
        );
    }
}

/// Format a reading the way it is typed: no trailing zeros, at most two
/// decimals.
fn format_number(value: f64) -> String {
    let rounded = (value * 100.0).round() / 100.0;
    if rounded.abs() < f64::EPSILON {
        // Avoid "-0".
        return "0".to_string();
    }
    format!("{rounded}")
}

/// Escape XML special characters.
#[must_use]
pub fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}
