//! Per-hand cursor positions.
//!
//! Picks the anatomical point that drives the cursor, estimates its speed
//! from consecutive frames, stabilises it and projects it onto the screen.

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

use crate::{
    config::ConfigBundle,
    hand::{Hand, Point3},
    screen::ScreenMapper,
    stabiliser::PositionStabiliser,
};

/// Forward offset applied to [`TrackedPosition::IndexStable`], metres.
const INDEX_STABLE_FORWARD_OFFSET_M: f32 = 0.015;

/// Anatomical point that drives the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrackedPosition {
    /// Midpoint of the index and middle fingertips, pushed slightly forward.
    #[default]
    IndexStable,
    /// Index fingertip.
    IndexTip,
    /// Wrist joint.
    Wrist,
    /// Whichever of index tip and wrist is closer to the screen.
    Nearest,
}

impl TrackedPosition {
    /// Sensor-space point for `hand`.
    pub fn locate(self, hand: &Hand, bundle: &ConfigBundle) -> Point3 {
        match self {
            Self::IndexStable => {
                let midpoint = (hand.index().tip + hand.middle().tip) * 0.5;
                midpoint + hand.direction * INDEX_STABLE_FORWARD_OFFSET_M
            },
            Self::IndexTip => hand.index().tip,
            Self::Wrist => hand.wrist,
            Self::Nearest => {
                let tip = hand.index().tip;
                let tip_distance = ScreenMapper::project(&bundle.physical, tip).distance;
                let wrist_distance = ScreenMapper::project(&bundle.physical, hand.wrist).distance;
                if tip_distance <= wrist_distance { tip } else { hand.wrist }
            },
        }
    }
}

/// Cursor state for one hand on one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Positions {
    /// Cursor, pixels from the bottom-left of the screen.
    pub cursor_position: Vector2<f32>,
    /// Metres from the screen plane, positive in front.
    pub distance_from_screen: f32,
}

/// Turns hands into [`Positions`], one instance per hand slot.
#[derive(Debug, Clone)]
pub struct PositioningModule {
    stabiliser: PositionStabiliser,
    previous_point: Option<(Point3, i64)>,
    previous: Option<Positions>,
}

impl PositioningModule {
    /// Module configured from `bundle`.
    pub fn new(bundle: &ConfigBundle) -> Self {
        let interaction = &bundle.interaction;
        Self {
            stabiliser: PositionStabiliser::new(interaction.deadzone_radius_m, interaction.smoothing),
            previous_point: None,
            previous: None,
        }
    }

    /// Apply new parameters, keeping filter state.
    pub fn configure(&mut self, bundle: &ConfigBundle) {
        let interaction = &bundle.interaction;
        self.stabiliser.configure(interaction.deadzone_radius_m, interaction.smoothing);
    }

    /// Switch drag smoothing on while a press is held.
    pub fn set_drag_mode(&mut self, pressed: bool) {
        self.stabiliser.set_drag_mode(pressed);
    }

    /// Most recent result.
    pub fn previous(&self) -> Option<Positions> {
        self.previous
    }

    /// Forget everything; used when the hand is lost.
    pub fn reset(&mut self) {
        self.stabiliser.reset();
        self.previous_point = None;
        self.previous = None;
    }

    /// Positions for this tick.
    ///
    /// With no hand the previous result is returned unchanged so consumers
    /// see continuity across single-frame dropouts. Returns `None` only
    /// before the first hand has been seen.
    pub fn calculate(
        &mut self,
        hand: Option<&Hand>,
        timestamp_us: i64,
        bundle: &ConfigBundle,
    ) -> Option<Positions> {
        let Some(hand) = hand else {
            return self.previous;
        };

        let raw = bundle.interaction.tracked_position.locate(hand, bundle);
        let (velocity, dt) = match self.previous_point {
            Some((point, at)) if timestamp_us > at => {
                let dt = (timestamp_us - at) as f32 / 1_000_000.0;
                ((raw - point).norm() / dt, dt)
            },
            _ => (0.0, 0.0),
        };
        self.previous_point = Some((raw, timestamp_us));

        let stable = self.stabiliser.apply(raw, velocity, dt);
        let projection = ScreenMapper::project(&bundle.physical, stable);
        let positions =
            Positions { cursor_position: projection.pixels, distance_from_screen: projection.distance };
        self.previous = Some(positions);
        Some(positions)
    }
}

#[cfg(test)]
mod tests {
    use handcursor_proto::Chirality;

    use super::*;

    fn bundle() -> ConfigBundle {
        ConfigBundle::default()
    }

    #[test]
    fn no_hand_before_first_sample_is_none() {
        let mut module = PositioningModule::new(&bundle());
        assert!(module.calculate(None, 0, &bundle()).is_none());
    }

    #[test]
    fn dropout_repeats_previous_result() {
        let config = bundle();
        let mut module = PositioningModule::new(&config);
        let hand = Hand::open(1, Chirality::Right, Point3::new(0.0, 0.25, 0.1));
        let seen = module.calculate(Some(&hand), 0, &config).unwrap();
        assert_eq!(module.calculate(None, 11_000, &config), Some(seen));
    }

    #[test]
    fn reset_clears_previous() {
        let config = bundle();
        let mut module = PositioningModule::new(&config);
        let hand = Hand::open(1, Chirality::Right, Point3::new(0.0, 0.25, 0.1));
        module.calculate(Some(&hand), 0, &config);
        module.reset();
        assert!(module.previous().is_none());
    }

    #[test]
    fn moving_closer_reduces_distance() {
        let config = bundle();
        let mut module = PositioningModule::new(&config);
        let far = Hand::open(1, Chirality::Left, Point3::new(0.0, 0.25, 0.2));
        let near = Hand::open(1, Chirality::Left, Point3::new(0.0, 0.25, 0.0));
        let first = module.calculate(Some(&far), 0, &config).unwrap();
        let mut last = first;
        for tick in 1..200 {
            last = module.calculate(Some(&near), tick * 11_000, &config).unwrap();
        }
        assert!(last.distance_from_screen < first.distance_from_screen - 0.15);
    }

    #[test]
    fn tracked_positions_pick_distinct_points() {
        let config = bundle();
        let hand = Hand::open(1, Chirality::Right, Point3::new(0.0, 0.25, 0.1));
        let tip = TrackedPosition::IndexTip.locate(&hand, &config);
        let wrist = TrackedPosition::Wrist.locate(&hand, &config);
        assert_eq!(tip, hand.index().tip);
        assert_eq!(wrist, hand.wrist);
        // Fingers point at the screen, so the tip is nearest.
        assert_eq!(TrackedPosition::Nearest.locate(&hand, &config), tip);
        let stable = TrackedPosition::IndexStable.locate(&hand, &config);
        assert!(stable.z < hand.index().tip.z.max(hand.middle().tip.z));
    }
}
