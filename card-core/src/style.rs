//! Visual customization of the card.

use serde::{Deserialize, Serialize};

use crate::background::CustomBackground;

/// Highest overlay darkness allowed over a custom background.
pub const MAX_OVERLAY_OPACITY: f32 = 0.95;
/// Overlay darkness applied when a custom background is first set.
pub const DEFAULT_OVERLAY_OPACITY: f32 = 0.7;

/// Typeface family used for labels and numbers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontStyle {
    /// Digital look: sans labels, monospace numbers.
    #[default]
    Standard,
    /// Hand-drawn.
    Sketch,
    /// Felt marker.
    Marker,
    /// Fountain pen.
    Pen,
    /// Mincho serif.
    Novel,
    /// Bitmap pixel font.
    Pixel,
    /// Rounded playful.
    Cute,
    /// Refined serif.
    Elegant,
}

impl FontStyle {
    /// All styles in picker order.
    pub const ALL: [FontStyle; 8] = [
        Self::Standard,
        Self::Sketch,
        Self::Marker,
        Self::Pen,
        Self::Novel,
        Self::Pixel,
        Self::Cute,
        Self::Elegant,
    ];

    /// Parse a style id, e.g. `"marker"`.
    #[must_use]
    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.id() == id)
    }

    /// Stable id.
    #[must_use]
    pub fn id(self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Sketch => "sketch",
            Self::Marker => "marker",
            Self::Pen => "pen",
            Self::Novel => "novel",
            Self::Pixel => "pixel",
            Self::Cute => "cute",
            Self::Elegant => "elegant",
        }
    }

    /// Font family stack for labels.
    #[must_use]
    pub fn label_family(self) -> &'static str {
        match self {
            Self::Standard => "Inter, 'Noto Sans JP', sans-serif",
            _ => self.value_family(),
        }
    }

    /// Font family stack for numbers and values.
    #[must_use]
    pub fn value_family(self) -> &'static str {
        match self {
            Self::Standard => "'JetBrains Mono', monospace",
            Self::Sketch => "'Zen Kurenaido', sans-serif",
            Self::Marker => "Yomogi, cursive",
            Self::Pen => "'Klee One', cursive",
            Self::Novel => "'Shippori Mincho', serif",
            Self::Pixel => "DotGothic16, sans-serif",
            Self::Cute => "'Potta One', cursive",
            Self::Elegant => "'Kaisei Opti', serif",
        }
    }

    /// Label letter spacing in em.
    #[must_use]
    pub fn label_tracking(self) -> f32 {
        match self {
            Self::Standard | Self::Novel => 0.2,
            Self::Elegant => 0.15,
            Self::Sketch | Self::Pixel => 0.1,
            Self::Marker | Self::Pen | Self::Cute => 0.05,
        }
    }

    /// Whether labels are drawn bold.
    #[must_use]
    pub fn bold_labels(self) -> bool {
        !matches!(self, Self::Pixel | Self::Cute)
    }
}

/// Color of the numeric values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NumberColor {
    /// Follow the background's primary text color.
    #[default]
    Auto,
    /// White.
    White,
    /// Gray.
    Gray,
    /// Red.
    Red,
    /// Orange.
    Orange,
    /// Yellow.
    Yellow,
    /// Lime.
    Lime,
    /// Green.
    Green,
    /// Cyan.
    Cyan,
    /// Blue.
    Blue,
    /// Purple.
    Purple,
    /// Pink.
    Pink,
}

impl NumberColor {
    /// All colors in swatch order.
    pub const ALL: [NumberColor; 12] = [
        Self::Auto,
        Self::White,
        Self::Gray,
        Self::Red,
        Self::Orange,
        Self::Yellow,
        Self::Lime,
        Self::Green,
        Self::Cyan,
        Self::Blue,
        Self::Purple,
        Self::Pink,
    ];

    /// Parse a color id, e.g. `"lime"`.
    #[must_use]
    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.id() == id)
    }

    /// Stable id.
    #[must_use]
    pub fn id(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::White => "white",
            Self::Gray => "gray",
            Self::Red => "red",
            Self::Orange => "orange",
            Self::Yellow => "yellow",
            Self::Lime => "lime",
            Self::Green => "green",
            Self::Cyan => "cyan",
            Self::Blue => "blue",
            Self::Purple => "purple",
            Self::Pink => "pink",
        }
    }

    /// Explicit hex color, or `None` for [`NumberColor::Auto`].
    #[must_use]
    pub fn hex(self) -> Option<&'static str> {
        match self {
            Self::Auto => None,
            Self::White => Some("#ffffff"),
            Self::Gray => Some("#a1a1aa"),
            Self::Red => Some("#ef4444"),
            Self::Orange => Some("#f97316"),
            Self::Yellow => Some("#facc15"),
            Self::Lime => Some("#a3e635"),
            Self::Green => Some("#10b981"),
            Self::Cyan => Some("#22d3ee"),
            Self::Blue => Some("#3b82f6"),
            Self::Purple => Some("#8b5cf6"),
            Self::Pink => Some("#ec4899"),
        }
    }
}

/// Accent color used for the background glow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccentTheme {
    /// Emerald.
    #[default]
    Emerald,
    /// Cyan.
    Cyan,
    /// Indigo.
    Indigo,
}

impl AccentTheme {
    /// The next accent in the cycle.
    #[must_use]
    pub fn next(self) -> Self {
        match self {
            Self::Emerald => Self::Cyan,
            Self::Cyan => Self::Indigo,
            Self::Indigo => Self::Emerald,
        }
    }

    /// Hex color.
    #[must_use]
    pub fn hex(self) -> &'static str {
        match self {
            Self::Emerald => "#34d399",
            Self::Cyan => "#22d3ee",
            Self::Indigo => "#818cf8",
        }
    }
}

/// Built-in background presets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackgroundPreset {
    /// Near-black.
    #[default]
    Dark,
    /// White.
    Light,
}

impl BackgroundPreset {
    /// The next preset in the cycle.
    #[must_use]
    pub fn next(self) -> Self {
        match self {
            Self::Dark => Self::Light,
            Self::Light => Self::Dark,
        }
    }

    /// Whether text should be light on this preset.
    #[must_use]
    pub fn is_dark(self) -> bool {
        matches!(self, Self::Dark)
    }

    /// Fill color.
    #[must_use]
    pub fn fill(self) -> &'static str {
        match self {
            Self::Dark => "#09090b",
            Self::Light => "#ffffff",
        }
    }
}

/// Label language.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// English.
    En,
    /// Japanese.
    #[default]
    Ja,
}

impl Language {
    /// The other language.
    #[must_use]
    pub fn toggled(self) -> Self {
        match self {
            Self::En => Self::Ja,
            Self::Ja => Self::En,
        }
    }
}

/// Preset answers to "Did you have a good day?".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReflectionAnswer {
    /// Yes, absolutely.
    YesAbsolutely,
    /// Pretty good.
    PrettyGood,
    /// It was okay.
    ItWasOkay,
    /// Amazing day.
    AmazingDay,
    /// Not really.
    NotReally,
}

impl ReflectionAnswer {
    /// Text shown on the card.
    #[must_use]
    pub fn text(self) -> &'static str {
        match self {
            Self::YesAbsolutely => "Yes, absolutely!",
            Self::PrettyGood => "Pretty good!",
            Self::ItWasOkay => "It was okay",
            Self::AmazingDay => "Amazing day!",
            Self::NotReally => "Not really...",
        }
    }
}

/// Optional personal note shown under the macro balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum CardNote {
    /// One of the preset reflection answers.
    Preset(ReflectionAnswer),
    /// Free text.
    Custom(String),
}

impl CardNote {
    /// Text to draw, or `None` if nothing would be shown.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Preset(answer) => Some(answer.text()),
            Self::Custom(text) => {
                let trimmed = text.trim();
                (!trimmed.is_empty()).then_some(trimmed)
            }
        }
    }
}

/// Every user-adjustable aspect of the card's appearance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CardStyle {
    /// Typeface.
    pub font: FontStyle,
    /// Color of numeric values.
    pub number_color: NumberColor,
    /// Accent glow color.
    pub accent: AccentTheme,
    /// Background preset (ignored while a custom background is set).
    pub background: BackgroundPreset,
    /// User-supplied background image.
    pub custom_background: Option<CustomBackground>,
    /// Black overlay darkness over the custom background.
    overlay_opacity: f32,
    /// Label language.
    pub language: Language,
    /// Show the date as `MM/DD/YYYY` instead of `NOV 12`.
    pub numeric_date: bool,
    /// Mask the weight reading.
    pub hide_weight: bool,
    /// Personal note.
    pub note: Option<CardNote>,
}

impl Default for CardStyle {
    fn default() -> Self {
        Self {
            font: FontStyle::default(),
            number_color: NumberColor::default(),
            accent: AccentTheme::default(),
            background: BackgroundPreset::default(),
            custom_background: None,
            overlay_opacity: DEFAULT_OVERLAY_OPACITY,
            language: Language::default(),
            numeric_date: false,
            hide_weight: false,
            note: None,
        }
    }
}

impl CardStyle {
    /// Overlay darkness in `[0, MAX_OVERLAY_OPACITY]`.
    #[must_use]
    pub fn overlay_opacity(&self) -> f32 {
        self.overlay_opacity.clamp(0.0, MAX_OVERLAY_OPACITY)
    }

    /// Set overlay darkness, clamped. Non-finite values are ignored.
    pub fn set_overlay_opacity(&mut self, value: f32) {
        if value.is_finite() {
            self.overlay_opacity = value.clamp(0.0, MAX_OVERLAY_OPACITY);
        }
    }

    /// Whether text should be rendered light.
    ///
    /// A custom background is always treated as dark because of its overlay.
    #[must_use]
    pub fn is_dark(&self) -> bool {
        self.custom_background.is_some() || self.background.is_dark()
    }

    /// Advance the background preset.
    ///
    /// Returns `false` (and does nothing) while a custom background is set.
    pub fn cycle_background(&mut self) -> bool {
        if self.custom_background.is_some() {
            return false;
        }
        self.background = self.background.next();
        true
    }

    /// Advance the accent color.
    pub fn cycle_accent(&mut self) {
        self.accent = self.accent.next();
    }
}
