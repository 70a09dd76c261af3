//! Interaction classifiers.
//!
//! Each classifier is a finite-state machine over the shared
//! [`InputType`] alphabet that turns one hand's [`Positions`] stream into
//! [`InputAction`]s. Classifiers never block and never see other hands;
//! the engine keeps one instance per hand slot.
//!
//! # Shared conventions
//!
//! - Not pressed: MOVE when the cursor changed since the last emitted
//!   action, HOVER otherwise.
//! - Pressed: HOLD until the cursor leaves the drag start distance around
//!   the click position, then DRAG (when dragging is enabled).
//! - `ProgressToClick` is 1 while pressed and resets to 0 on UP/CANCEL.
//! - [`InteractionClassifier::hand_lost`] emits exactly one CANCEL from an
//!   active state and returns the machine to its start-up state.

mod grab;
mod hover;
mod plane;

pub use grab::{GrabClassifier, grab_strength};
pub use hover::HoverAndHoldClassifier;
pub use plane::PlaneClassifier;

use handcursor_proto::{Chirality, HandType, InputAction, InputType, InteractionType, Vector2};
use nalgebra::Vector2 as Pixel;

use crate::{config::InteractionConfig, hand::Hand, positioning::Positions};

/// Everything a classifier sees for one hand on one tick.
#[derive(Debug, Clone, Copy)]
pub struct ClassifierInput<'a> {
    /// Sensor clock, microseconds.
    pub timestamp_us: i64,
    /// Role of the hand.
    pub hand_type: HandType,
    /// Which hand.
    pub chirality: Chirality,
    /// Stabilised, projected position.
    pub positions: Positions,
    /// The hand itself; `None` during a tolerated dropout frame.
    pub hand: Option<&'a Hand>,
}

/// A gesture state machine.
pub trait InteractionClassifier: Send {
    /// Mode this classifier implements.
    fn interaction_type(&self) -> InteractionType;

    /// Advance one tick, returning the action for this tick if any.
    fn update(
        &mut self,
        input: &ClassifierInput<'_>,
        config: &InteractionConfig,
    ) -> Option<InputAction>;

    /// The tracked hand disappeared. Returns one CANCEL if a gesture was in
    /// progress and resets to the start-up state.
    fn hand_lost(&mut self, timestamp_us: i64) -> Option<InputAction>;

    /// Whether a press is currently held.
    fn is_pressed(&self) -> bool;

    /// Whether the machine is anywhere but idle.
    fn is_active(&self) -> bool;
}

/// Fresh classifier for `kind`.
pub fn classifier_for(kind: InteractionType) -> Box<dyn InteractionClassifier> {
    match kind {
        InteractionType::Push | InteractionType::TouchPlane => Box::new(PlaneClassifier::new(kind)),
        InteractionType::Hover => Box::new(HoverAndHoldClassifier::new()),
        InteractionType::Grab => Box::new(GrabClassifier::new()),
    }
}

fn to_wire(pixel: Pixel<f32>) -> Vector2 {
    Vector2::new(pixel.x, pixel.y)
}

#[derive(Debug, Clone, Copy)]
struct LastSeen {
    hand_type: HandType,
    chirality: Chirality,
    positions: Positions,
}

/// Cursor bookkeeping shared by every classifier: MOVE/HOVER and
/// HOLD/DRAG selection, click latching and the context needed to build a
/// CANCEL after the hand has gone.
#[derive(Debug, Clone)]
struct PressTracker {
    kind: InteractionType,
    last_cursor: Option<Pixel<f32>>,
    click: Option<Pixel<f32>>,
    dragging: bool,
    last_seen: Option<LastSeen>,
}

impl PressTracker {
    fn new(kind: InteractionType) -> Self {
        Self { kind, last_cursor: None, click: None, dragging: false, last_seen: None }
    }

    fn reset(&mut self) {
        *self = Self::new(self.kind);
    }

    fn is_pressed(&self) -> bool {
        self.click.is_some()
    }

    fn build(
        &mut self,
        input: &ClassifierInput<'_>,
        input_type: InputType,
        cursor: Pixel<f32>,
        progress: f32,
    ) -> InputAction {
        self.last_seen = Some(LastSeen {
            hand_type: input.hand_type,
            chirality: input.chirality,
            positions: input.positions,
        });
        self.last_cursor = Some(cursor);
        InputAction {
            timestamp: input.timestamp_us,
            interaction_type: self.kind,
            hand_type: input.hand_type,
            chirality: input.chirality,
            input_type,
            cursor_position: to_wire(cursor),
            click_position: to_wire(self.click.unwrap_or(cursor)),
            distance_from_screen: input.positions.distance_from_screen,
            progress_to_click: progress.clamp(0.0, 1.0),
        }
    }

    /// MOVE or HOVER with the given progress.
    fn idle(&mut self, input: &ClassifierInput<'_>, progress: f32) -> InputAction {
        let cursor = input.positions.cursor_position;
        let input_type =
            if self.last_cursor == Some(cursor) { InputType::Hover } else { InputType::Move };
        self.build(input, input_type, cursor, progress)
    }

    /// DOWN, latching the click position.
    fn down(&mut self, input: &ClassifierInput<'_>) -> InputAction {
        let cursor = input.positions.cursor_position;
        self.click = Some(cursor);
        self.dragging = false;
        self.build(input, InputType::Down, cursor, 1.0)
    }

    /// HOLD or DRAG while pressed.
    fn held(&mut self, input: &ClassifierInput<'_>, config: &InteractionConfig) -> InputAction {
        let cursor = input.positions.cursor_position;
        let click = self.click.unwrap_or(cursor);

        if !config.use_scrolling_or_dragging {
            return self.build(input, InputType::Hold, click, 1.0);
        }
        if !self.dragging && (cursor - click).norm() >= config.drag_start_distance_px {
            self.dragging = true;
        }
        let input_type = if self.dragging { InputType::Drag } else { InputType::Hold };
        self.build(input, input_type, cursor, 1.0)
    }

    /// UP, clearing the press.
    fn up(&mut self, input: &ClassifierInput<'_>, config: &InteractionConfig) -> InputAction {
        let cursor = match self.click {
            Some(click) if !config.use_scrolling_or_dragging => click,
            _ => input.positions.cursor_position,
        };
        let action = self.build(input, InputType::Up, cursor, 0.0);
        self.click = None;
        self.dragging = false;
        action
    }

    /// CANCEL built from the last emitted context; clears the press.
    fn cancel_from_last(&mut self, timestamp_us: i64) -> Option<InputAction> {
        let last = self.last_seen?;
        let cursor = self.last_cursor.unwrap_or(last.positions.cursor_position);
        let action = InputAction {
            timestamp: timestamp_us,
            interaction_type: self.kind,
            hand_type: last.hand_type,
            chirality: last.chirality,
            input_type: InputType::Cancel,
            cursor_position: to_wire(cursor),
            click_position: to_wire(self.click.unwrap_or(cursor)),
            distance_from_screen: last.positions.distance_from_screen,
            progress_to_click: 0.0,
        };
        self.click = None;
        self.dragging = false;
        Some(action)
    }

    /// CANCEL for the current input; clears the press.
    fn cancel(&mut self, input: &ClassifierInput<'_>) -> InputAction {
        let action = self.build(input, InputType::Cancel, input.positions.cursor_position, 0.0);
        self.click = None;
        self.dragging = false;
        action
    }
}
