//! The classified input action pushed to every client.

use serde::{Deserialize, Serialize};

/// 2-D vector in screen pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector2 {
    /// Horizontal pixel coordinate.
    pub x: f32,
    /// Vertical pixel coordinate, measured from the bottom of the screen.
    pub y: f32,
}

impl Vector2 {
    /// Create a vector.
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to `other`.
    pub fn distance(self, other: Self) -> f32 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Interaction mode that produced an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InteractionType {
    /// Press towards the screen past a distance threshold.
    #[default]
    Push,
    /// Cross a fixed virtual plane in front of the screen.
    #[serde(rename = "TOUCHPLANE")]
    TouchPlane,
    /// Dwell in place until a timer completes.
    Hover,
    /// Close the hand.
    Grab,
}

/// Role of the hand that produced an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HandType {
    /// The hand currently driving the cursor.
    Primary,
    /// A second tracked hand.
    Secondary,
}

/// Which physical hand produced an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Chirality {
    /// Left hand.
    Left,
    /// Right hand.
    Right,
    /// The sensor could not tell.
    #[default]
    Unknown,
}

/// Discrete input state carried by an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InputType {
    /// Hand present, not pressing, cursor unchanged.
    Hover,
    /// Press began.
    Down,
    /// Press held without significant movement.
    Hold,
    /// Press held while moving.
    Drag,
    /// Press released.
    Up,
    /// Gesture abandoned; clients must discard any press in progress.
    Cancel,
    /// Hand present, not pressing, cursor moved.
    Move,
}

impl InputType {
    /// True for the types that end a press.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Up | Self::Cancel)
    }

    /// True while a press is in progress.
    pub fn is_pressed(self) -> bool {
        matches!(self, Self::Down | Self::Hold | Self::Drag)
    }
}

/// One classified interaction event.
///
/// Built once by a classifier and passed by value afterwards; the plugin
/// chain may replace it with a new value but never edits one in place.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct InputAction {
    /// Sensor clock, microseconds.
    pub timestamp: i64,
    /// Mode that produced the action.
    pub interaction_type: InteractionType,
    /// Role of the producing hand.
    pub hand_type: HandType,
    /// Producing hand.
    pub chirality: Chirality,
    /// Discrete state.
    pub input_type: InputType,
    /// Current cursor, pixels.
    pub cursor_position: Vector2,
    /// Cursor latched at DOWN; equals the cursor outside a press.
    pub click_position: Vector2,
    /// Metres from the screen plane, positive in front.
    pub distance_from_screen: f32,
    /// How close the gesture is to DOWN, in `[0, 1]`.
    pub progress_to_click: f32,
}
