//! Hover-and-hold: a timed dwell that clicks when the cursor stays put.

use handcursor_proto::{InputAction, InteractionType};
use nalgebra::Vector2;
use tracing::debug;

use super::{ClassifierInput, InteractionClassifier, PressTracker};
use crate::config::{DwellSettings, InteractionConfig};

#[derive(Debug, Clone, Copy, PartialEq)]
enum Dwell {
    /// No hand seen since start-up or the last reset.
    Idle,
    /// Timer running around `anchor`.
    Dwelling { anchor: Vector2<f32>, started_us: i64 },
    /// DOWN was emitted last tick; UP follows.
    Clicked,
    /// Waiting for the cursor to leave `anchor` before re-arming.
    Released { anchor: Vector2<f32> },
}

/// Dwell classifier.
///
/// Progress stays at 0 until `StartTimeS`, ramps linearly to 1 at
/// `CompleteTimeS` and then emits DOWN followed by UP on the next tick.
#[derive(Debug, Clone)]
pub struct HoverAndHoldClassifier {
    tracker: PressTracker,
    state: Dwell,
    progress: f32,
}

impl Default for HoverAndHoldClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl HoverAndHoldClassifier {
    /// Idle classifier.
    pub fn new() -> Self {
        Self { tracker: PressTracker::new(InteractionType::Hover), state: Dwell::Idle, progress: 0.0 }
    }

    /// Current dwell progress.
    pub fn progress(&self) -> f32 {
        self.progress
    }

    fn ramp(settings: &DwellSettings, started_us: i64, now_us: i64) -> f32 {
        let elapsed = (now_us - started_us) as f32 / 1_000_000.0;
        let span = settings.complete_time_s - settings.start_time_s;
        if span <= 0.0 {
            return if elapsed >= settings.complete_time_s { 1.0 } else { 0.0 };
        }
        ((elapsed - settings.start_time_s) / span).clamp(0.0, 1.0)
    }

    fn start_dwell(&mut self, cursor: Vector2<f32>, now_us: i64) {
        self.state = Dwell::Dwelling { anchor: cursor, started_us: now_us };
        self.progress = 0.0;
    }
}

impl InteractionClassifier for HoverAndHoldClassifier {
    fn interaction_type(&self) -> InteractionType {
        InteractionType::Hover
    }

    fn update(
        &mut self,
        input: &ClassifierInput<'_>,
        config: &InteractionConfig,
    ) -> Option<InputAction> {
        let settings = &config.hover_and_hold;
        let cursor = input.positions.cursor_position;
        let now = input.timestamp_us;

        match self.state {
            Dwell::Idle => {
                self.start_dwell(cursor, now);
                Some(self.tracker.idle(input, 0.0))
            },
            Dwell::Dwelling { anchor, started_us } => {
                if (cursor - anchor).norm() > settings.cancel_radius_px {
                    let interrupted = self.progress > 0.0;
                    self.start_dwell(cursor, now);
                    if interrupted {
                        debug!(x = cursor.x, y = cursor.y, "dwell interrupted");
                        return Some(self.tracker.cancel(input));
                    }
                    return Some(self.tracker.idle(input, 0.0));
                }

                let progress = Self::ramp(settings, started_us, now);
                if progress >= 1.0 {
                    debug!(x = cursor.x, y = cursor.y, "dwell complete");
                    self.state = Dwell::Clicked;
                    self.progress = 1.0;
                    return Some(self.tracker.down(input));
                }
                self.progress = progress;
                Some(self.tracker.idle(input, progress))
            },
            Dwell::Clicked => {
                let click = self.tracker.click.unwrap_or(cursor);
                self.state = Dwell::Released { anchor: click };
                self.progress = 0.0;
                Some(self.tracker.up(input, config))
            },
            Dwell::Released { anchor } => {
                if (cursor - anchor).norm() > settings.cancel_radius_px {
                    self.start_dwell(cursor, now);
                }
                Some(self.tracker.idle(input, 0.0))
            },
        }
    }

    fn hand_lost(&mut self, timestamp_us: i64) -> Option<InputAction> {
        let cancel =
            if self.is_active() { self.tracker.cancel_from_last(timestamp_us) } else { None };
        self.tracker.reset();
        self.state = Dwell::Idle;
        self.progress = 0.0;
        cancel
    }

    fn is_pressed(&self) -> bool {
        self.tracker.is_pressed()
    }

    fn is_active(&self) -> bool {
        self.tracker.is_pressed() || self.progress > 0.0
    }
}
