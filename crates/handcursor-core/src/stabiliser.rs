//! Velocity-weighted smoothing followed by a deadzone.
//!
//! Smoothing is an adaptive low-pass filter: the cutoff frequency rises with
//! hand speed, so a still hand is heavily smoothed while a fast one is
//! followed with little lag. While a press is held the cutoff is divided by
//! the drag factor, trading responsiveness for a steadier click.
//!
//! The deadzone runs on the smoothed point. The reported point only moves
//! once the smoothed point is more than the deadzone radius away from it,
//! and then only far enough to sit on the radius. Jitter smaller than the
//! radius therefore never reaches the cursor.

use std::f32::consts::PI;

use crate::{config::SmoothingSettings, hand::Point3};

/// Smooths and deadzones one tracked point.
#[derive(Debug, Clone)]
pub struct PositionStabiliser {
    deadzone_radius: f32,
    smoothing: SmoothingSettings,
    drag_mode: bool,
    smoothed: Option<Point3>,
    reported: Option<Point3>,
}

impl PositionStabiliser {
    /// Stabiliser with the given deadzone radius (metres) and smoothing.
    pub fn new(deadzone_radius: f32, smoothing: SmoothingSettings) -> Self {
        Self { deadzone_radius, smoothing, drag_mode: false, smoothed: None, reported: None }
    }

    /// Change parameters without discarding the filter state.
    pub fn configure(&mut self, deadzone_radius: f32, smoothing: SmoothingSettings) {
        self.deadzone_radius = deadzone_radius;
        self.smoothing = smoothing;
    }

    /// Enable heavier smoothing for the duration of a press.
    pub fn set_drag_mode(&mut self, enabled: bool) {
        self.drag_mode = enabled;
    }

    /// Whether drag smoothing is on.
    pub fn drag_mode(&self) -> bool {
        self.drag_mode
    }

    /// Last reported (deadzoned) point.
    pub fn reported(&self) -> Option<Point3> {
        self.reported
    }

    /// Forget all history; the next sample is reported as-is.
    pub fn reset(&mut self) {
        self.smoothed = None;
        self.reported = None;
        self.drag_mode = false;
    }

    /// Feed one raw sample.
    ///
    /// `velocity` is the hand speed in metres per second and `dt` the time
    /// since the previous sample in seconds. A non-positive `dt` leaves the
    /// state untouched.
    pub fn apply(&mut self, raw: Point3, velocity: f32, dt: f32) -> Point3 {
        let (Some(previous), Some(reported)) = (self.smoothed, self.reported) else {
            self.smoothed = Some(raw);
            self.reported = Some(raw);
            return raw;
        };

        if dt <= 0.0 || !dt.is_finite() {
            return reported;
        }

        let alpha = smoothing_factor(dt, self.cutoff(velocity));
        let smoothed = previous + (raw - previous) * alpha;
        self.smoothed = Some(smoothed);

        let reported = apply_deadzone(reported, smoothed, self.deadzone_radius);
        self.reported = Some(reported);
        reported
    }

    fn cutoff(&self, velocity: f32) -> f32 {
        let cutoff = (self.smoothing.min_cutoff + self.smoothing.beta * velocity.abs()).max(0.0);
        if self.drag_mode { cutoff / self.smoothing.drag_factor.max(1.0) } else { cutoff }
    }
}

fn smoothing_factor(dt: f32, cutoff: f32) -> f32 {
    let r = 2.0 * PI * cutoff * dt;
    r / (r + 1.0)
}

/// Keep `reported` unless `current` is further than `radius` from it, in
/// which case pull it along to the edge of the radius.
fn apply_deadzone(reported: Point3, current: Point3, radius: f32) -> Point3 {
    let offset = reported - current;
    let distance = offset.norm();
    if distance <= radius {
        reported
    } else {
        current + offset * (radius / distance)
    }
}
