//! # Daily Log Card Core
//!
//! Platform-neutral logic behind the daily health summary card.
//! Compiles natively and to WASM; it never touches the DOM or a clock.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                 card-core                   │
//! ├─────────────────────────────────────────────┤
//! │  Data            │  Gesture Controller      │
//! │  - Daily log     │  - Contact tracking      │
//! │  - Query payload │  - Pan / pinch / wheel   │
//! │  - Sample data   │  - Double-tap reset      │
//! ├─────────────────────────────────────────────┤
//! │  Style           │  State                   │
//! │  - Fonts, colors │  - Editor state          │
//! │  - Backgrounds   │  - Export snapshots      │
//! └─────────────────────────────────────────────┘
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod background;
pub mod data;
pub mod error;
pub mod event;
pub mod gesture;
pub mod payload;
pub mod state;
pub mod style;

pub use background::{CustomBackground, ImageOrigin};
pub use data::{
    CalorieIntake, DailyLogData, ExerciseSummary, MacroAmount, MacroBalance, WeightReading,
};
pub use error::{CardError, CardResult};
pub use event::{ContactPoint, InputEvent, PointerEvent, PointerPhase};
pub use gesture::{
    GestureConfig, GestureController, GestureResponse, InteractionMode, LayoutOffset,
    LayoutTransform,
};
pub use payload::{
    load_daily_log, DataOrigin, LoadedLog, PayloadDecryptor, PayloadSource, SecureEnvelope,
    SecureRequest,
};
pub use state::{CardSnapshot, CardState};
pub use style::{
    AccentTheme, BackgroundPreset, CardNote, CardStyle, FontStyle, Language, NumberColor,
    ReflectionAnswer,
};

/// Card core version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
