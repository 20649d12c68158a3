//! Direct-manipulation gestures for the card content layer.
//!
//! The controller tracks every active contact by identifier and derives a
//! [`LayoutTransform`] (pan offset plus zoom scale) from them:
//!
//! - one contact in edit mode pans by its delta since the last move
//! - two contacts pinch relative to the baseline captured when the second
//!   contact landed
//! - wheel deltas nudge the scale linearly
//! - two single-contact starts inside the double-tap window reset everything
//!
//! The controller never reads a clock. Callers pass millisecond timestamps
//! and drive inactivity expiry through [`GestureController::tick`].

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::event::{ContactPoint, InputEvent, PointerPhase};

/// Default lower zoom bound.
pub const DEFAULT_MIN_SCALE: f32 = 0.3;
/// Default upper zoom bound.
pub const DEFAULT_MAX_SCALE: f32 = 3.0;
/// Default scale change per unit of wheel delta.
pub const DEFAULT_WHEEL_SENSITIVITY: f32 = 0.002;
/// Default double-tap window in milliseconds.
pub const DEFAULT_DOUBLE_TAP_WINDOW_MS: u64 = 300;
/// Default inactivity timeout before edit mode reverts to view.
pub const DEFAULT_INACTIVITY_TIMEOUT_MS: u64 = 3000;

/// Baselines shorter than this are treated as coincident contacts.
const MIN_PINCH_DISTANCE: f32 = 1e-3;

/// Tunable gesture parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureConfig {
    /// Lowest allowed scale.
    pub min_scale: f32,
    /// Highest allowed scale.
    pub max_scale: f32,
    /// Scale change per unit of wheel `delta_y`.
    pub wheel_sensitivity: f32,
    /// Two contact starts closer together than this count as a double tap.
    pub double_tap_window_ms: u64,
    /// Idle time after which edit mode reverts to view.
    pub inactivity_timeout_ms: u64,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            min_scale: DEFAULT_MIN_SCALE,
            max_scale: DEFAULT_MAX_SCALE,
            wheel_sensitivity: DEFAULT_WHEEL_SENSITIVITY,
            double_tap_window_ms: DEFAULT_DOUBLE_TAP_WINDOW_MS,
            inactivity_timeout_ms: DEFAULT_INACTIVITY_TIMEOUT_MS,
        }
    }
}

impl GestureConfig {
    /// Return a copy whose scale bounds are finite, positive and ordered.
    ///
    /// Invalid bounds fall back to the defaults.
    #[must_use]
    pub fn normalized(&self) -> Self {
        let mut config = self.clone();
        let valid = |v: f32| v.is_finite() && v > 0.0;
        if !valid(config.min_scale) {
            config.min_scale = DEFAULT_MIN_SCALE;
        }
        if !valid(config.max_scale) {
            config.max_scale = DEFAULT_MAX_SCALE;
        }
        if config.min_scale > config.max_scale {
            std::mem::swap(&mut config.min_scale, &mut config.max_scale);
        }
        if !config.wheel_sensitivity.is_finite() {
            config.wheel_sensitivity = DEFAULT_WHEEL_SENSITIVITY;
        }
        config
    }

    /// Clamp a scale into the configured bounds.
    #[must_use]
    pub fn clamp_scale(&self, value: f32) -> f32 {
        value.clamp(self.min_scale, self.max_scale)
    }
}

/// Pan translation applied to the content layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LayoutOffset {
    /// Horizontal offset in card pixels.
    pub x: f32,
    /// Vertical offset in card pixels.
    pub y: f32,
}

impl LayoutOffset {
    /// The untranslated position.
    pub const ORIGIN: Self = Self { x: 0.0, y: 0.0 };

    /// Create an offset.
    #[must_use]
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Combined pan and zoom applied when the card is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LayoutTransform {
    /// Pan offset.
    pub offset: LayoutOffset,
    /// Zoom scale about the card center.
    pub scale: f32,
}

impl Default for LayoutTransform {
    fn default() -> Self {
        Self {
            offset: LayoutOffset::ORIGIN,
            scale: 1.0,
        }
    }
}

/// Interaction mode of the card surface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InteractionMode {
    /// Passive display.
    #[default]
    View,
    /// Layout is being manipulated.
    Edit,
}

/// What the host should do after an event was handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GestureResponse {
    /// Suppress the platform's default scroll/zoom handling.
    pub prevent_default: bool,
    /// The layout transform changed and the card should be redrawn.
    pub changed: bool,
}

#[derive(Debug, Clone, Copy)]
struct PinchBaseline {
    ids: (u32, u32),
    distance: f32,
    scale: f32,
}

impl PinchBaseline {
    fn involves(&self, id: u32) -> bool {
        self.ids.0 == id || self.ids.1 == id
    }
}

/// Translates contact and wheel input into layout updates.
#[derive(Debug, Clone)]
pub struct GestureController {
    config: GestureConfig,
    offset: LayoutOffset,
    scale: f32,
    mode: InteractionMode,
    contacts: HashMap<u32, ContactPoint>,
    pinch: Option<PinchBaseline>,
    last_tap_ms: Option<u64>,
    last_interaction_ms: u64,
}

impl Default for GestureController {
    fn default() -> Self {
        Self::new(GestureConfig::default())
    }
}

impl GestureController {
    /// Create a controller with the given configuration.
    #[must_use]
    pub fn new(config: GestureConfig) -> Self {
        let config = config.normalized();
        let scale = config.clamp_scale(1.0);
        Self {
            config,
            offset: LayoutOffset::ORIGIN,
            scale,
            mode: InteractionMode::View,
            contacts: HashMap::new(),
            pinch: None,
            last_tap_ms: None,
            last_interaction_ms: 0,
        }
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &GestureConfig {
        &self.config
    }

    /// Current pan offset.
    #[must_use]
    pub fn offset(&self) -> LayoutOffset {
        self.offset
    }

    /// Current zoom scale.
    #[must_use]
    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// Current interaction mode.
    #[must_use]
    pub fn mode(&self) -> InteractionMode {
        self.mode
    }

    /// Number of tracked contacts.
    #[must_use]
    pub fn active_contacts(&self) -> usize {
        self.contacts.len()
    }

    /// Whether a two-finger pinch is in progress.
    #[must_use]
    pub fn is_pinching(&self) -> bool {
        self.pinch.is_some()
    }

    /// Current offset and scale.
    #[must_use]
    pub fn transform(&self) -> LayoutTransform {
        LayoutTransform {
            offset: self.offset,
            scale: self.scale,
        }
    }

    /// Dispatch a generic input event.
    pub fn handle(&mut self, event: &InputEvent) -> GestureResponse {
        match event {
            InputEvent::Pointer(pointer) => match pointer.phase {
                PointerPhase::Down => self.pointer_down(pointer.contact, pointer.timestamp_ms),
                PointerPhase::Move => self.pointer_move(pointer.contact, pointer.timestamp_ms),
                PointerPhase::Up => self.pointer_up(pointer.contact.id, pointer.timestamp_ms),
                PointerPhase::Cancel => {
                    self.pointer_cancel(pointer.contact.id, pointer.timestamp_ms)
                }
            },
            InputEvent::Wheel {
                delta_y,
                timestamp_ms,
            } => self.wheel(*delta_y, *timestamp_ms),
            InputEvent::Tick { timestamp_ms } => GestureResponse {
                prevent_default: false,
                changed: self.tick(*timestamp_ms),
            },
        }
    }

    /// A contact landed on the card.
    pub fn pointer_down(&mut self, contact: ContactPoint, now_ms: u64) -> GestureResponse {
        if !contact.is_finite() {
            return GestureResponse::default();
        }

        self.record_interaction(now_ms);
        self.contacts.insert(contact.id, contact);

        let mut changed = false;
        match self.contacts.len() {
            1 => {
                let is_double_tap = self
                    .last_tap_ms
                    .is_some_and(|last| now_ms.saturating_sub(last) < self.config.double_tap_window_ms);
                if is_double_tap {
                    tracing::debug!("Double tap, resetting layout");
                    changed = self.transform() != LayoutTransform::default();
                    self.reset();
                    // Consume the tap so a third tap starts a new pair.
                    self.last_tap_ms = None;
                } else {
                    self.last_tap_ms = Some(now_ms);
                }
            }
            2 => self.begin_pinch(),
            _ => {}
        }

        GestureResponse {
            prevent_default: self.contacts.len() >= 2,
            changed,
        }
    }

    /// A tracked contact moved.
    pub fn pointer_move(&mut self, contact: ContactPoint, now_ms: u64) -> GestureResponse {
        if !contact.is_finite() {
            return GestureResponse::default();
        }
        // Hover moves from a mouse that is not pressed.
        let Some(previous) = self.contacts.insert(contact.id, contact) else {
            self.contacts.remove(&contact.id);
            return GestureResponse::default();
        };

        if let Some(pinch) = self.pinch {
            if !pinch.involves(contact.id) {
                return GestureResponse {
                    prevent_default: true,
                    changed: false,
                };
            }
            self.record_interaction(now_ms);
            return GestureResponse {
                prevent_default: true,
                changed: self.update_pinch(pinch),
            };
        }

        if self.contacts.len() == 1 && self.mode == InteractionMode::Edit {
            self.record_interaction(now_ms);
            let next = LayoutOffset::new(
                self.offset.x + (contact.x - previous.x),
                self.offset.y + (contact.y - previous.y),
            );
            let changed = next.x.is_finite() && next.y.is_finite() && next != self.offset;
            if changed {
                self.offset = next;
            }
            return GestureResponse {
                prevent_default: false,
                changed,
            };
        }

        GestureResponse {
            prevent_default: self.contacts.len() >= 2,
            changed: false,
        }
    }

    /// A contact was released.
    pub fn pointer_up(&mut self, id: u32, now_ms: u64) -> GestureResponse {
        let was_multi = self.contacts.len() >= 2;
        if self.contacts.remove(&id).is_none() {
            return GestureResponse::default();
        }
        self.record_interaction(now_ms);

        if self.pinch.is_some_and(|p| p.involves(id)) {
            self.pinch = None;
            if self.contacts.len() >= 2 {
                self.begin_pinch();
            }
        }

        GestureResponse {
            prevent_default: was_multi,
            changed: false,
        }
    }

    /// The platform cancelled a contact.
    pub fn pointer_cancel(&mut self, id: u32, now_ms: u64) -> GestureResponse {
        self.pointer_up(id, now_ms)
    }

    /// Wheel scroll over the card.
    pub fn wheel(&mut self, delta_y: f32, now_ms: u64) -> GestureResponse {
        if !delta_y.is_finite() {
            return GestureResponse::default();
        }
        self.record_interaction(now_ms);

        let next = self
            .config
            .clamp_scale(self.scale - delta_y * self.config.wheel_sensitivity);
        let changed = next != self.scale;
        self.scale = next;

        GestureResponse {
            prevent_default: true,
            changed,
        }
    }

    /// Expire edit mode after inactivity.
    ///
    /// Returns `true` when the mode reverted to view.
    pub fn tick(&mut self, now_ms: u64) -> bool {
        if self.mode != InteractionMode::Edit || !self.contacts.is_empty() {
            return false;
        }
        if now_ms.saturating_sub(self.last_interaction_ms) < self.config.inactivity_timeout_ms {
            return false;
        }
        tracing::debug!("Edit mode idle, returning to view");
        self.mode = InteractionMode::View;
        true
    }

    /// Leave edit mode immediately.
    pub fn finish_editing(&mut self) {
        self.mode = InteractionMode::View;
        self.pinch = None;
    }

    /// Reset offset to the origin and scale to 1.
    pub fn reset(&mut self) {
        self.offset = LayoutOffset::ORIGIN;
        self.scale = self.config.clamp_scale(1.0);
        if let Some(pinch) = self.pinch.as_mut() {
            pinch.scale = self.scale;
        }
    }

    /// Set the scale directly (e.g. from a zoom slider).
    pub fn set_scale(&mut self, value: f32) {
        if value.is_finite() {
            self.scale = self.config.clamp_scale(value);
        }
    }

    /// Set the offset directly.
    pub fn set_offset(&mut self, offset: LayoutOffset) {
        if offset.x.is_finite() && offset.y.is_finite() {
            self.offset = offset;
        }
    }

    fn record_interaction(&mut self, now_ms: u64) {
        if self.mode == InteractionMode::View {
            tracing::debug!("Entering edit mode");
            self.mode = InteractionMode::Edit;
        }
        self.last_interaction_ms = now_ms;
    }

    fn begin_pinch(&mut self) {
        let mut ids: Vec<u32> = self.contacts.keys().copied().collect();
        ids.sort_unstable();
        self.pinch = match (ids.first(), ids.get(1)) {
            (Some(&a), Some(&b)) => {
                let distance = self.contacts[&a].distance_to(&self.contacts[&b]);
                (distance.is_finite() && distance > MIN_PINCH_DISTANCE).then_some(PinchBaseline {
                    ids: (a, b),
                    distance,
                    scale: self.scale,
                })
            }
            _ => None,
        };
    }

    fn update_pinch(&mut self, pinch: PinchBaseline) -> bool {
        let (Some(a), Some(b)) = (self.contacts.get(&pinch.ids.0), self.contacts.get(&pinch.ids.1))
        else {
            return false;
        };
        let distance = a.distance_to(b);
        if !distance.is_finite() {
            return false;
        }
        let next = self
            .config
            .clamp_scale(pinch.scale * (distance / pinch.distance));
        if !next.is_finite() {
            return false;
        }
        let changed = next != self.scale;
        self.scale = next;
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn down(controller: &mut GestureController, id: u32, x: f32, y: f32, t: u64) -> GestureResponse {
        controller.pointer_down(ContactPoint::new(id, x, y), t)
    }

    fn moved(controller: &mut GestureController, id: u32, x: f32, y: f32, t: u64) -> GestureResponse {
        controller.pointer_move(ContactPoint::new(id, x, y), t)
    }

    #[test]
    fn first_contact_enters_edit_mode() {
        let mut controller = GestureController::default();
        assert_eq!(controller.mode(), InteractionMode::View);
        down(&mut controller, 1, 10.0, 10.0, 100);
        assert_eq!(controller.mode(), InteractionMode::Edit);
    }

    #[test]
    fn single_contact_drag_pans() {
        let mut controller = GestureController::default();
        down(&mut controller, 1, 10.0, 10.0, 0);
        let response = moved(&mut controller, 1, 25.0, 5.0, 16);
        assert!(response.changed);
        assert!(!response.prevent_default);
        assert_eq!(controller.offset(), LayoutOffset::new(15.0, -5.0));

        moved(&mut controller, 1, 30.0, 5.0, 32);
        assert_eq!(controller.offset(), LayoutOffset::new(20.0, -5.0));
    }

    #[test]
    fn hover_move_without_contact_is_ignored() {
        let mut controller = GestureController::default();
        let response = moved(&mut controller, 7, 50.0, 50.0, 0);
        assert_eq!(response, GestureResponse::default());
        assert_eq!(controller.active_contacts(), 0);
        assert_eq!(controller.mode(), InteractionMode::View);
    }

    #[test]
    fn pinch_halving_distance_halves_scale() {
        let mut controller = GestureController::default();
        down(&mut controller, 1, 0.0, 0.0, 0);
        let response = down(&mut controller, 2, 200.0, 0.0, 1000);
        assert!(response.prevent_default);
        assert!(controller.is_pinching());

        let response = moved(&mut controller, 2, 100.0, 0.0, 1016);
        assert!(response.prevent_default);
        assert!(response.changed);
        assert!((controller.scale() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn pinch_is_clamped_to_bounds() {
        let mut controller = GestureController::default();
        down(&mut controller, 1, 0.0, 0.0, 0);
        down(&mut controller, 2, 10.0, 0.0, 1000);
        moved(&mut controller, 2, 1000.0, 0.0, 1016);
        assert!((controller.scale() - DEFAULT_MAX_SCALE).abs() < f32::EPSILON);

        moved(&mut controller, 2, 0.5, 0.0, 1032);
        assert!((controller.scale() - DEFAULT_MIN_SCALE).abs() < f32::EPSILON);
    }

    #[test]
    fn coincident_contacts_do_not_start_pinch() {
        let mut controller = GestureController::default();
        down(&mut controller, 1, 50.0, 50.0, 0);
        down(&mut controller, 2, 50.0, 50.0, 1000);
        assert!(!controller.is_pinching());

        moved(&mut controller, 2, 80.0, 50.0, 1016);
        assert!(controller.scale().is_finite());
        assert!((controller.scale() - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn third_finger_does_not_break_pinch() {
        let mut controller = GestureController::default();
        down(&mut controller, 1, 0.0, 0.0, 0);
        down(&mut controller, 2, 100.0, 0.0, 1000);
        down(&mut controller, 3, 500.0, 500.0, 1010);
        assert_eq!(controller.active_contacts(), 3);

        let response = moved(&mut controller, 3, 600.0, 600.0, 1020);
        assert!(!response.changed);

        controller.pointer_up(3, 1030);
        moved(&mut controller, 2, 200.0, 0.0, 1040);
        assert!((controller.scale() - 2.0).abs() < 1e-6);
    }

    #[test]
    fn releasing_baseline_finger_rebaselines_remaining_pair() {
        let mut controller = GestureController::default();
        down(&mut controller, 1, 0.0, 0.0, 0);
        down(&mut controller, 2, 100.0, 0.0, 1000);
        down(&mut controller, 3, 0.0, 50.0, 1010);
        moved(&mut controller, 2, 200.0, 0.0, 1020);
        assert!((controller.scale() - 2.0).abs() < 1e-6);

        controller.pointer_up(1, 1030);
        assert!(controller.is_pinching());
        // Contacts 2 (200,0) and 3 (0,50) now form the baseline at scale 2.
        let baseline = ContactPoint::new(2, 200.0, 0.0).distance_to(&ContactPoint::new(3, 0.0, 50.0));
        let target_x = baseline * 0.5;
        moved(&mut controller, 3, 200.0 - target_x, 0.0, 1040);
        assert!((controller.scale() - 1.0).abs() < 1e-3);
    }

    #[test]
    fn wheel_zooms_and_clamps() {
        let mut controller = GestureController::default();
        let response = controller.wheel(-100.0, 0);
        assert!(response.prevent_default);
        assert!(response.changed);
        assert!((controller.scale() - 1.2).abs() < 1e-6);

        controller.wheel(100_000.0, 10);
        assert!((controller.scale() - DEFAULT_MIN_SCALE).abs() < f32::EPSILON);
        assert_eq!(controller.mode(), InteractionMode::Edit);
    }

    #[test]
    fn non_finite_input_is_ignored() {
        let mut controller = GestureController::default();
        controller.wheel(f32::NAN, 0);
        down(&mut controller, 1, f32::INFINITY, 0.0, 0);
        assert_eq!(controller.active_contacts(), 0);
        controller.set_scale(f32::NAN);
        assert!((controller.scale() - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn pan_never_overflows_offset() {
        let mut controller = GestureController::default();
        down(&mut controller, 1, -f32::MAX, 0.0, 0);
        let response = moved(&mut controller, 1, f32::MAX, 0.0, 16);
        assert!(!response.changed);
        assert_eq!(controller.offset(), LayoutOffset::ORIGIN);

        controller.set_offset(LayoutOffset::new(f32::MAX, 0.0));
        moved(&mut controller, 1, -f32::MAX, 0.0, 32);
        down(&mut controller, 2, 0.0, 0.0, 40);
        controller.pointer_up(2, 48);
        moved(&mut controller, 1, 0.0, 0.0, 64);
        let offset = controller.offset();
        assert!(offset.x.is_finite() && offset.y.is_finite());
    }

    #[test]
    fn double_tap_resets_layout() {
        let mut controller = GestureController::default();
        down(&mut controller, 1, 0.0, 0.0, 0);
        moved(&mut controller, 1, 40.0, 30.0, 50);
        controller.pointer_up(1, 60);
        controller.wheel(-200.0, 100);
        assert!(controller.scale() > 1.0);

        // Two taps 200ms apart.
        down(&mut controller, 1, 5.0, 5.0, 1000);
        controller.pointer_up(1, 1050);
        let response = down(&mut controller, 1, 5.0, 5.0, 1200);
        assert!(response.changed);
        assert_eq!(controller.offset(), LayoutOffset::ORIGIN);
        assert!((controller.scale() - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn slow_taps_do_not_reset() {
        let mut controller = GestureController::default();
        controller.set_offset(LayoutOffset::new(10.0, 10.0));
        down(&mut controller, 1, 0.0, 0.0, 0);
        controller.pointer_up(1, 10);
        down(&mut controller, 1, 0.0, 0.0, 500);
        assert_eq!(controller.offset(), LayoutOffset::new(10.0, 10.0));
    }

    #[test]
    fn inactivity_reverts_to_view() {
        let mut controller = GestureController::default();
        down(&mut controller, 1, 0.0, 0.0, 0);
        controller.pointer_up(1, 100);

        assert!(!controller.tick(2000));
        assert_eq!(controller.mode(), InteractionMode::Edit);

        // Further interaction refreshes the countdown.
        controller.wheel(1.0, 2500);
        assert!(!controller.tick(5000));
        assert!(controller.tick(5500));
        assert_eq!(controller.mode(), InteractionMode::View);
        assert!(!controller.tick(9000));
    }

    #[test]
    fn held_contact_keeps_edit_mode() {
        let mut controller = GestureController::default();
        down(&mut controller, 1, 0.0, 0.0, 0);
        assert!(!controller.tick(10_000));
        assert_eq!(controller.mode(), InteractionMode::Edit);
    }

    #[test]
    fn normalized_config_orders_bounds() {
        let config = GestureConfig {
            min_scale: 5.0,
            max_scale: 0.2,
            ..GestureConfig::default()
        }
        .normalized();
        assert!((config.min_scale - 0.2).abs() < f32::EPSILON);
        assert!((config.max_scale - 5.0).abs() < f32::EPSILON);

        let config = GestureConfig {
            min_scale: f32::NAN,
            max_scale: -1.0,
            ..GestureConfig::default()
        }
        .normalized();
        assert!((config.min_scale - DEFAULT_MIN_SCALE).abs() < f32::EPSILON);
        assert!((config.max_scale - DEFAULT_MAX_SCALE).abs() < f32::EPSILON);
    }

    #[test]
    fn config_deserializes_with_defaults() {
        let config: GestureConfig =
            serde_json::from_str(r#"{"min_scale":0.2,"max_scale":5.0}"#).expect("config");
        assert!((config.max_scale - 5.0).abs() < f32::EPSILON);
        assert_eq!(config.inactivity_timeout_ms, DEFAULT_INACTIVITY_TIMEOUT_MS);
    }
}
