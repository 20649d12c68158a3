//! Input events for card interaction.

use serde::{Deserialize, Serialize};

/// Phase of a pointer contact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointerPhase {
    /// Contact started (finger down, mouse button pressed).
    Down,
    /// Contact moved.
    Move,
    /// Contact released.
    Up,
    /// Contact cancelled by the platform (e.g., palm rejection).
    Cancel,
}

impl PointerPhase {
    /// Parse a phase name as delivered by browser event handlers.
    ///
    /// Unknown names map to `Down`.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        match name {
            "move" | "pointermove" | "touchmove" => Self::Move,
            "up" | "pointerup" | "touchend" => Self::Up,
            "cancel" | "pointercancel" | "touchcancel" => Self::Cancel,
            _ => Self::Down,
        }
    }
}

/// A single active contact point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContactPoint {
    /// Contact identifier (pointer id / touch identifier).
    pub id: u32,
    /// X position in card coordinates.
    pub x: f32,
    /// Y position in card coordinates.
    pub y: f32,
}

impl ContactPoint {
    /// Create a contact point.
    #[must_use]
    pub fn new(id: u32, x: f32, y: f32) -> Self {
        Self { id, x, y }
    }

    /// Whether both coordinates are finite.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Euclidean distance to another contact.
    #[must_use]
    pub fn distance_to(&self, other: &ContactPoint) -> f32 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// A pointer event for one contact.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointerEvent {
    /// Phase of this event.
    pub phase: PointerPhase,
    /// The contact this event refers to.
    pub contact: ContactPoint,
    /// Timestamp in milliseconds.
    pub timestamp_ms: u64,
}

impl PointerEvent {
    /// Create a new pointer event.
    #[must_use]
    pub fn new(phase: PointerPhase, contact: ContactPoint, timestamp_ms: u64) -> Self {
        Self {
            phase,
            contact,
            timestamp_ms,
        }
    }
}

/// All input events the card surface can receive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum InputEvent {
    /// Pointer, touch or mouse contact.
    Pointer(PointerEvent),

    /// Wheel scroll.
    Wheel {
        /// Vertical wheel delta (positive scrolls down / zooms out).
        delta_y: f32,
        /// Timestamp in milliseconds.
        timestamp_ms: u64,
    },

    /// Clock tick used to expire edit mode.
    Tick {
        /// Timestamp in milliseconds.
        timestamp_ms: u64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_names_from_browser_events() {
        assert_eq!(PointerPhase::from_name("pointerdown"), PointerPhase::Down);
        assert_eq!(PointerPhase::from_name("touchmove"), PointerPhase::Move);
        assert_eq!(PointerPhase::from_name("pointerup"), PointerPhase::Up);
        assert_eq!(PointerPhase::from_name("touchcancel"), PointerPhase::Cancel);
        assert_eq!(PointerPhase::from_name("whatever"), PointerPhase::Down);
    }

    #[test]
    fn contact_distance() {
        let a = ContactPoint::new(0, 0.0, 0.0);
        let b = ContactPoint::new(1, 3.0, 4.0);
        assert!((a.distance_to(&b) - 5.0).abs() < f32::EPSILON);
    }

    #[test]
    fn input_event_serializes_with_tag() {
        let event = InputEvent::Wheel {
            delta_y: 10.0,
            timestamp_ms: 5,
        };
        let json = serde_json::to_string(&event).expect("serialize");
        assert!(json.contains("\"type\":\"Wheel\""));
    }
}
