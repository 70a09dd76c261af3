//! Hand presence notifications.

use serde::{Deserialize, Serialize};

/// Whether any hand is being tracked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HandPresenceState {
    /// A hand appeared while none were tracked.
    HandFound,
    /// The last tracked hand disappeared, or tracking became unavailable.
    HandsLost,
}

/// Body of `HAND_PRESENCE_EVENT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandPresenceEvent {
    /// New presence state.
    pub state: HandPresenceState,
}
