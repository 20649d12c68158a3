//! Card editor state.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{
    CardResult, CardStyle, CustomBackground, DailyLogData, GestureConfig, GestureController,
    GestureResponse, InputEvent, InteractionMode, LayoutTransform,
};

/// Everything needed to draw one frame of the card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardSnapshot {
    /// Displayed data.
    pub data: DailyLogData,
    /// Appearance.
    pub style: CardStyle,
    /// Pan and zoom of the content layer.
    pub transform: LayoutTransform,
}

/// The complete editor state.
#[derive(Debug, Clone)]
pub struct CardState {
    /// Displayed data.
    pub data: DailyLogData,
    /// Appearance.
    pub style: CardStyle,
    gestures: GestureController,
}

impl CardState {
    /// Create a state showing the sample data for `today`.
    #[must_use]
    pub fn new(today: NaiveDate, config: GestureConfig) -> Self {
        Self::with_data(DailyLogData::sample(today), config)
    }

    /// Create a state showing the given data.
    #[must_use]
    pub fn with_data(data: DailyLogData, config: GestureConfig) -> Self {
        Self {
            data,
            style: CardStyle::default(),
            gestures: GestureController::new(config),
        }
    }

    /// Route an input event to the gesture controller.
    pub fn process_event(&mut self, event: &InputEvent) -> GestureResponse {
        self.gestures.handle(event)
    }

    /// Gesture controller.
    #[must_use]
    pub fn gestures(&self) -> &GestureController {
        &self.gestures
    }

    /// Mutable gesture controller (zoom slider, reset button).
    pub fn gestures_mut(&mut self) -> &mut GestureController {
        &mut self.gestures
    }

    /// Current interaction mode.
    #[must_use]
    pub fn mode(&self) -> InteractionMode {
        self.gestures.mode()
    }

    /// Replace the custom background with a file picked by the user.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is not an image.
    pub fn set_background_file(&mut self, mime: &str, bytes: &[u8]) -> CardResult<()> {
        let background = CustomBackground::from_file(mime, bytes)?;
        tracing::debug!("Custom background set ({} bytes)", bytes.len());
        self.style.custom_background = Some(background);
        Ok(())
    }

    /// Remove the custom background, restoring the preset.
    pub fn clear_background(&mut self) {
        self.style.custom_background = None;
    }

    /// Capture the current frame for drawing or export.
    #[must_use]
    pub fn snapshot(&self) -> CardSnapshot {
        CardSnapshot {
            data: self.data.clone(),
            style: self.style.clone(),
            transform: self.gestures.transform(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ContactPoint, PointerEvent, PointerPhase};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 11, 12).expect("date")
    }

    #[test]
    fn snapshot_reflects_gestures() {
        let mut state = CardState::new(today(), GestureConfig::default());
        state.process_event(&InputEvent::Pointer(PointerEvent::new(
            PointerPhase::Down,
            ContactPoint::new(1, 0.0, 0.0),
            0,
        )));
        state.process_event(&InputEvent::Pointer(PointerEvent::new(
            PointerPhase::Move,
            ContactPoint::new(1, 12.0, -4.0),
            10,
        )));
        let snapshot = state.snapshot();
        assert!((snapshot.transform.offset.x - 12.0).abs() < f32::EPSILON);
        assert!((snapshot.transform.offset.y + 4.0).abs() < f32::EPSILON);
        assert_eq!(state.mode(), InteractionMode::Edit);
    }

    #[test]
    fn background_file_round_trip() {
        let mut state = CardState::new(today(), GestureConfig::default());
        assert!(state.set_background_file("application/pdf", b"%PDF").is_err());
        assert!(state.style.custom_background.is_none());

        state.set_background_file("image/jpeg", &[0xFF, 0xD8, 0xFF]).expect("jpeg");
        assert!(state.style.custom_background.is_some());
        state.clear_background();
        assert!(state.style.custom_background.is_none());
    }
}
