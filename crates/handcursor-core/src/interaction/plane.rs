//! Push and touch plane: DOWN when the hand crosses a distance threshold.
//!
//! ```text
//!            start          activation   activation + margin
//! far ─────────┼───────────────┼──────────────┼─────── near screen
//!   progress 0 │  0 → 1 ramp   │              │
//!              │               │◄── DOWN      │
//!              │               │     UP ─────►│
//! ```
//!
//! The release point sits a margin above the activation point, so a
//! distance wobbling around the activation threshold cannot chatter.

use handcursor_proto::{InputAction, InteractionType};
use tracing::debug;

use super::{ClassifierInput, InteractionClassifier, PressTracker};
use crate::config::InteractionConfig;

const CM: f32 = 0.01;

/// Distance-threshold classifier shared by the push and touch plane modes.
#[derive(Debug, Clone)]
pub struct PlaneClassifier {
    tracker: PressTracker,
    progress: f32,
}

impl PlaneClassifier {
    /// Classifier for `kind`, which selects the threshold set and the
    /// interaction type tag.
    pub fn new(kind: InteractionType) -> Self {
        Self { tracker: PressTracker::new(kind), progress: 0.0 }
    }

    /// Current progress towards DOWN.
    pub fn progress(&self) -> f32 {
        self.progress
    }
}

impl InteractionClassifier for PlaneClassifier {
    fn interaction_type(&self) -> InteractionType {
        self.tracker.kind
    }

    fn update(
        &mut self,
        input: &ClassifierInput<'_>,
        config: &InteractionConfig,
    ) -> Option<InputAction> {
        let thresholds = config.plane_thresholds(self.tracker.kind);
        let start = thresholds.start_distance_cm * CM;
        let activation = thresholds.activation_distance_cm * CM;
        let release = activation + thresholds.release_margin_cm * CM;
        let distance = input.positions.distance_from_screen;

        if self.tracker.is_pressed() {
            if distance > release {
                debug!(kind = ?self.tracker.kind, distance, "plane released");
                self.progress = 0.0;
                return Some(self.tracker.up(input, config));
            }
            return Some(self.tracker.held(input, config));
        }

        if distance < activation {
            debug!(kind = ?self.tracker.kind, distance, "plane crossed");
            self.progress = 1.0;
            return Some(self.tracker.down(input));
        }

        self.progress = ((start - distance) / (start - activation)).clamp(0.0, 1.0);
        Some(self.tracker.idle(input, self.progress))
    }

    fn hand_lost(&mut self, timestamp_us: i64) -> Option<InputAction> {
        let cancel =
            if self.is_active() { self.tracker.cancel_from_last(timestamp_us) } else { None };
        self.tracker.reset();
        self.progress = 0.0;
        cancel
    }

    fn is_pressed(&self) -> bool {
        self.tracker.is_pressed()
    }

    fn is_active(&self) -> bool {
        self.tracker.is_pressed()
    }
}
