//! Scripted hand-tracking sensor.
//!
//! Tests describe hands by where they should appear on screen (cursor pixels
//! and distance from the screen). The sensor inverts the configured
//! calibration and tracked-point offset so the engine's positioning lands
//! on exactly those values once smoothing has settled.

use handcursor_core::{ConfigBundle, Hand, HandFrame, PhysicalConfig, hand::Point3};
use handcursor_proto::Chirality;
use nalgebra::{Rotation3, Vector2, Vector3};

/// A scripted hand.
#[derive(Debug, Clone, PartialEq)]
pub struct SimHand {
    /// Sensor id.
    pub id: u32,
    /// Left or right.
    pub chirality: Chirality,
    /// Target cursor position, pixels.
    pub cursor: Vector2<f32>,
    /// Target distance from the screen, metres.
    pub distance: f32,
    /// Vendor grab strength to report.
    pub grab_strength: Option<f32>,
    /// Whether the hand appears in frames.
    pub visible: bool,
}

/// Generates frames for a set of scripted hands.
#[derive(Debug, Clone)]
pub struct SimSensor {
    bundle: ConfigBundle,
    tick_us: i64,
    timestamp_us: i64,
    hands: Vec<SimHand>,
}

impl SimSensor {
    /// Default frame spacing, 100 Hz.
    pub const DEFAULT_TICK_US: i64 = 10_000;

    /// Sensor calibrated like `bundle`.
    pub fn new(bundle: ConfigBundle) -> Self {
        Self { bundle, tick_us: Self::DEFAULT_TICK_US, timestamp_us: 0, hands: Vec::new() }
    }

    /// Use a different frame spacing.
    #[must_use]
    pub fn with_tick_us(mut self, tick_us: i64) -> Self {
        self.tick_us = tick_us;
        self
    }

    /// Recalibrate, e.g. after a config reload changed the screen.
    pub fn set_config(&mut self, bundle: ConfigBundle) {
        self.bundle = bundle;
    }

    /// Timestamp of the last generated frame.
    pub fn timestamp_us(&self) -> i64 {
        self.timestamp_us
    }

    /// Frame spacing.
    pub fn tick_us(&self) -> i64 {
        self.tick_us
    }

    /// Add a visible hand.
    pub fn add_hand(&mut self, id: u32, chirality: Chirality, cursor: Vector2<f32>, distance: f32) {
        self.hands.retain(|hand| hand.id != id);
        self.hands.push(SimHand { id, chirality, cursor, distance, grab_strength: None, visible: true });
    }

    /// Remove a hand for good.
    pub fn remove_hand(&mut self, id: u32) {
        self.hands.retain(|hand| hand.id != id);
    }

    /// Scripted hand by id.
    pub fn hand(&self, id: u32) -> Option<&SimHand> {
        self.hands.iter().find(|hand| hand.id == id)
    }

    /// Mutable scripted hand by id.
    pub fn hand_mut(&mut self, id: u32) -> Option<&mut SimHand> {
        self.hands.iter_mut().find(|hand| hand.id == id)
    }

    /// Move a hand's cursor target.
    pub fn move_to(&mut self, id: u32, cursor: Vector2<f32>) {
        if let Some(hand) = self.hand_mut(id) {
            hand.cursor = cursor;
        }
    }

    /// Move a hand towards or away from the screen.
    pub fn set_distance(&mut self, id: u32, distance: f32) {
        if let Some(hand) = self.hand_mut(id) {
            hand.distance = distance;
        }
    }

    /// Set the grab strength the sensor reports.
    pub fn set_grab(&mut self, id: u32, strength: Option<f32>) {
        if let Some(hand) = self.hand_mut(id) {
            hand.grab_strength = strength;
        }
    }

    /// Show or hide a hand without forgetting it.
    pub fn set_visible(&mut self, id: u32, visible: bool) {
        if let Some(hand) = self.hand_mut(id) {
            hand.visible = visible;
        }
    }

    /// Advance one tick and produce the frame.
    pub fn tick(&mut self) -> HandFrame {
        self.timestamp_us += self.tick_us;
        let hands = self.hands.iter().filter(|hand| hand.visible).map(|hand| self.build(hand)).collect();
        HandFrame { timestamp_us: self.timestamp_us, hands }
    }

    /// `count` frames with nothing changing.
    pub fn ticks(&mut self, count: usize) -> Vec<HandFrame> {
        (0..count).map(|_| self.tick()).collect()
    }

    /// Frames covering at least `seconds` of stillness.
    pub fn dwell(&mut self, seconds: f32) -> Vec<HandFrame> {
        let count = (f64::from(seconds) * 1e6 / self.tick_us as f64).ceil() as usize;
        self.ticks(count)
    }

    /// Move hand `id` linearly to `distance` over `count` frames.
    pub fn push(&mut self, id: u32, distance: f32, count: usize) -> Vec<HandFrame> {
        let Some(start) = self.hand(id).map(|hand| hand.distance) else {
            return self.ticks(count);
        };
        self.ramp(count, |sensor, t| sensor.set_distance(id, start + (distance - start) * t))
    }

    /// Slide hand `id`'s cursor linearly to `cursor` over `count` frames.
    pub fn slide(&mut self, id: u32, cursor: Vector2<f32>, count: usize) -> Vec<HandFrame> {
        let Some(start) = self.hand(id).map(|hand| hand.cursor) else {
            return self.ticks(count);
        };
        self.ramp(count, |sensor, t| sensor.move_to(id, start + (cursor - start) * t))
    }

    /// Ramp hand `id`'s grab strength linearly to `strength` over `count`
    /// frames.
    pub fn grab(&mut self, id: u32, strength: f32, count: usize) -> Vec<HandFrame> {
        let start = self.hand(id).and_then(|hand| hand.grab_strength).unwrap_or(0.0);
        self.ramp(count, |sensor, t| sensor.set_grab(id, Some(start + (strength - start) * t)))
    }

    /// Hide hand `id` for `count` frames, then show it again.
    pub fn dropout(&mut self, id: u32, count: usize) -> Vec<HandFrame> {
        self.set_visible(id, false);
        let frames = self.ticks(count);
        self.set_visible(id, true);
        frames
    }

    fn ramp(&mut self, count: usize, mut step: impl FnMut(&mut Self, f32)) -> Vec<HandFrame> {
        (1..=count)
            .map(|i| {
                step(self, i as f32 / count as f32);
                self.tick()
            })
            .collect()
    }

    fn build(&self, sim: &SimHand) -> Hand {
        let target = sensor_point_for(&self.bundle.physical, sim.cursor, sim.distance);
        let tracked = self.bundle.interaction.tracked_position;
        let reference = Hand::open(sim.id, sim.chirality, target);
        let offset = tracked.locate(&reference, &self.bundle) - target;

        let mut hand = Hand::open(sim.id, sim.chirality, target - offset);
        hand.grab_strength = sim.grab_strength;
        hand
    }
}

/// Sensor-space point that projects to `cursor` at `distance` under
/// `calibration`.
pub fn sensor_point_for(calibration: &PhysicalConfig, cursor: Vector2<f32>, distance: f32) -> Point3 {
    let ppm = calibration.screen_height_px as f32 / calibration.screen_height_m;
    let screen = Vector3::new(
        (cursor.x - calibration.screen_width_px as f32 / 2.0) / ppm,
        cursor.y / ppm,
        distance,
    );

    let r = calibration.sensor_rotation_deg;
    let sensor = Rotation3::from_euler_angles(r.x.to_radians(), r.y.to_radians(), r.z.to_radians());
    let tilt =
        Rotation3::from_axis_angle(&Vector3::x_axis(), -calibration.screen_rotation_deg.to_radians());

    sensor.inverse() * (tilt.inverse() * screen - calibration.sensor_offset_m)
}
