//! Grab: closing the fist presses, opening it releases.

use std::f32::consts::FRAC_PI_2;

use handcursor_proto::{InputAction, InteractionType};
use tracing::debug;

use super::{ClassifierInput, InteractionClassifier, PressTracker};
use crate::{config::InteractionConfig, hand::Hand};

/// Curl of `hand` in `[0, 1]`: 0 for a flat hand, 1 for a closed fist.
///
/// Uses the sensor's own estimate when it provides one. Otherwise this is
/// the mean angle between each non-thumb finger and the hand direction,
/// over a right angle.
pub fn grab_strength(hand: &Hand) -> f32 {
    if let Some(strength) = hand.grab_strength {
        return strength.clamp(0.0, 1.0);
    }

    let Some(direction) = hand.direction.try_normalize(f32::EPSILON) else {
        return 0.0;
    };
    let angles: Vec<f32> = hand.fingers[Hand::INDEX..]
        .iter()
        .map(|finger| finger.direction())
        .filter(|d| d.norm() > 0.0)
        .map(|d| d.dot(&direction).clamp(-1.0, 1.0).acos())
        .collect();
    if angles.is_empty() {
        return 0.0;
    }
    let mean = angles.iter().sum::<f32>() / angles.len() as f32;
    (mean / FRAC_PI_2).clamp(0.0, 1.0)
}

/// Grab classifier with asymmetric enter/exit thresholds.
#[derive(Debug, Clone)]
pub struct GrabClassifier {
    tracker: PressTracker,
    strength: f32,
}

impl Default for GrabClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl GrabClassifier {
    /// Open-hand classifier.
    pub fn new() -> Self {
        Self { tracker: PressTracker::new(InteractionType::Grab), strength: 0.0 }
    }

    /// Strength seen on the last tick with a hand.
    pub fn strength(&self) -> f32 {
        self.strength
    }
}

impl InteractionClassifier for GrabClassifier {
    fn interaction_type(&self) -> InteractionType {
        InteractionType::Grab
    }

    fn update(
        &mut self,
        input: &ClassifierInput<'_>,
        config: &InteractionConfig,
    ) -> Option<InputAction> {
        // Dropout frames keep the previous strength.
        if let Some(hand) = input.hand {
            self.strength = grab_strength(hand);
        }
        let grab = config.grab.grab_threshold;
        let ungrab = config.grab.ungrab_threshold;

        if self.tracker.is_pressed() {
            if self.strength < ungrab {
                debug!(strength = self.strength, "grab released");
                return Some(self.tracker.up(input, config));
            }
            return Some(self.tracker.held(input, config));
        }

        if self.strength >= grab {
            debug!(strength = self.strength, "grab closed");
            return Some(self.tracker.down(input));
        }
        let progress = if grab > 0.0 { self.strength / grab } else { 0.0 };
        Some(self.tracker.idle(input, progress))
    }

    fn hand_lost(&mut self, timestamp_us: i64) -> Option<InputAction> {
        let cancel =
            if self.is_active() { self.tracker.cancel_from_last(timestamp_us) } else { None };
        self.tracker.reset();
        self.strength = 0.0;
        cancel
    }

    fn is_pressed(&self) -> bool {
        self.tracker.is_pressed()
    }

    fn is_active(&self) -> bool {
        self.tracker.is_pressed()
    }
}

#[cfg(test)]
mod tests {
    use handcursor_proto::{Chirality, InputType};
    use proptest::prelude::*;

    use super::*;
    use crate::{hand::Point3, interaction::test_support::input};

    fn hand_with(strength: f32) -> Hand {
        Hand {
            grab_strength: Some(strength),
            ..Hand::open(1, Chirality::Right, Point3::new(0.0, 0.0, 0.2))
        }
    }

    fn curled() -> Hand {
        let mut hand = Hand::open(1, Chirality::Left, Point3::new(0.0, 0.0, 0.2));
        for finger in &mut hand.fingers[Hand::INDEX..] {
            finger.tip = finger.base + Point3::new(0.0, -Hand::FINGER_LENGTH_M, 0.0);
        }
        hand
    }

    fn run(classifier: &mut GrabClassifier, strengths: &[f32]) -> Vec<InputType> {
        let config = InteractionConfig::default();
        strengths
            .iter()
            .enumerate()
            .filter_map(|(tick, &s)| {
                let hand = hand_with(s);
                classifier
                    .update(&input(tick as i64, 10.0, 10.0, 0.1, Some(&hand)), &config)
                    .map(|action| action.input_type)
            })
            .collect()
    }

    #[test]
    fn open_hand_has_no_strength() {
        let hand = Hand::open(1, Chirality::Right, Point3::zeros());
        assert!(grab_strength(&hand) < 1e-4);
    }

    #[test]
    fn fingers_at_right_angle_are_a_fist() {
        assert!((grab_strength(&curled()) - 1.0).abs() < 1e-4);
    }

    #[test]
    fn vendor_strength_wins_and_is_clamped() {
        let mut hand = curled();
        hand.grab_strength = Some(0.3);
        assert!((grab_strength(&hand) - 0.3).abs() < f32::EPSILON);
        hand.grab_strength = Some(1.7);
        assert!((grab_strength(&hand) - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn close_hold_open() {
        // Defaults: grab 0.8, ungrab 0.6.
        let mut c = GrabClassifier::new();
        let seen = run(&mut c, &[0.0, 0.4, 0.85, 0.7, 0.5]);
        assert_eq!(
            seen,
            vec![InputType::Move, InputType::Hover, InputType::Down, InputType::Hold, InputType::Up]
        );
    }

    #[test]
    fn progress_is_strength_over_threshold() {
        let mut c = GrabClassifier::new();
        let config = InteractionConfig::default();
        let hand = hand_with(0.4);
        let action = c.update(&input(0, 0.0, 0.0, 0.1, Some(&hand)), &config).unwrap();
        assert!((action.progress_to_click - 0.5).abs() < 1e-4);
    }

    #[test]
    fn dropout_frame_keeps_grip() {
        let mut c = GrabClassifier::new();
        run(&mut c, &[0.9]);
        let config = InteractionConfig::default();
        let held = c.update(&input(1, 10.0, 10.0, 0.1, None), &config).unwrap();
        assert_eq!(held.input_type, InputType::Hold);
        assert!((c.strength() - 0.9).abs() < f32::EPSILON);
    }

    #[test]
    fn hand_lost_while_grabbing_cancels_once() {
        let mut c = GrabClassifier::new();
        run(&mut c, &[0.2, 0.95]);
        let cancel = c.hand_lost(77).unwrap();
        assert_eq!(cancel.input_type, InputType::Cancel);
        assert_eq!(cancel.interaction_type, InteractionType::Grab);
        assert!(c.hand_lost(78).is_none());
        assert!(!c.is_pressed());
    }

    proptest! {
        // Strength oscillating strictly between the thresholds after one
        // crossing yields exactly one DOWN and no UP.
        #[test]
        fn oscillation_between_thresholds_does_not_chatter(
            wobble in prop::collection::vec(0.6001f32..0.7999, 1..200),
        ) {
            let mut c = GrabClassifier::new();
            let mut strengths = vec![0.0, 0.9];
            strengths.extend(wobble);
            let seen = run(&mut c, &strengths);
            prop_assert_eq!(seen.iter().filter(|t| **t == InputType::Down).count(), 1);
            prop_assert_eq!(seen.iter().filter(|t| **t == InputType::Up).count(), 0);
        }

        // Likewise before any crossing: no DOWN at all.
        #[test]
        fn oscillation_from_open_never_grabs(
            wobble in prop::collection::vec(0.6001f32..0.7999, 1..200),
        ) {
            let mut c = GrabClassifier::new();
            let seen = run(&mut c, &wobble);
            prop_assert!(!seen.contains(&InputType::Down));
        }

        // Losing the hand mid-grab always yields exactly one CANCEL.
        #[test]
        fn loss_mid_grab_cancels_exactly_once(held_ticks in 0usize..50) {
            let mut c = GrabClassifier::new();
            let mut strengths = vec![0.9];
            strengths.extend(std::iter::repeat_n(0.85, held_ticks));
            let seen = run(&mut c, &strengths);
            prop_assert!(!seen.contains(&InputType::Cancel));
            let first = c.hand_lost(1_000_000);
            prop_assert_eq!(first.map(|a| a.input_type), Some(InputType::Cancel));
            prop_assert!(c.hand_lost(1_000_001).is_none());
        }
    }
}
