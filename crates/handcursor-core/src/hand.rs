//! Hand model delivered by the tracking sensor.
//!
//! Positions are in sensor space, metres: `x` to the right, `y` up and `z`
//! towards the user. Frames are immutable snapshots owned by whoever feeds
//! the engine; nothing here retains them past one tick.

use handcursor_proto::Chirality;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// Point or direction in sensor space.
pub type Point3 = Vector3<f32>;

/// One digit: the knuckle at its base and the tip.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Finger {
    /// Knuckle joint.
    pub base: Point3,
    /// Fingertip.
    pub tip: Point3,
}

impl Finger {
    /// Unit vector from knuckle to tip, or zero for a degenerate finger.
    pub fn direction(&self) -> Point3 {
        (self.tip - self.base).try_normalize(f32::EPSILON).unwrap_or_else(Point3::zeros)
    }
}

/// A tracked hand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hand {
    /// Sensor-assigned id, stable while the hand stays tracked.
    pub id: u32,
    /// Left or right.
    #[serde(default)]
    pub chirality: Chirality,
    /// Palm centre.
    pub palm_position: Point3,
    /// Palm velocity, metres per second.
    #[serde(default)]
    pub palm_velocity: Point3,
    /// Unit normal out of the palm.
    pub palm_normal: Point3,
    /// Unit vector from wrist towards the fingers.
    pub direction: Point3,
    /// Wrist joint.
    pub wrist: Point3,
    /// Thumb, index, middle, ring, pinky.
    pub fingers: [Finger; 5],
    /// Vendor-computed grab strength in `[0, 1]`, when the sensor has one.
    #[serde(default)]
    pub grab_strength: Option<f32>,
}

impl Hand {
    /// Index of the thumb in [`Hand::fingers`].
    pub const THUMB: usize = 0;
    /// Index of the index finger.
    pub const INDEX: usize = 1;
    /// Index of the middle finger.
    pub const MIDDLE: usize = 2;

    /// Length of a digit in [`Hand::open`], metres.
    pub const FINGER_LENGTH_M: f32 = 0.07;

    /// An open, flat hand with its palm at `palm`, fingers pointing at the
    /// screen (`-z`) and palm facing down.
    pub fn open(id: u32, chirality: Chirality, palm: Point3) -> Self {
        let direction = Point3::new(0.0, 0.0, -1.0);
        let side = match chirality {
            Chirality::Left => 1.0,
            Chirality::Right | Chirality::Unknown => -1.0,
        };
        let fingers = std::array::from_fn(|i| {
            let spread = (i as f32 - 2.0) * 0.02;
            let base = palm + Point3::new(side * -spread, 0.0, -0.04);
            Finger { base, tip: base + direction * Self::FINGER_LENGTH_M }
        });

        Self {
            id,
            chirality,
            palm_position: palm,
            palm_velocity: Point3::zeros(),
            palm_normal: Point3::new(0.0, -1.0, 0.0),
            direction,
            wrist: palm + Point3::new(0.0, 0.0, 0.06),
            fingers,
            grab_strength: None,
        }
    }

    /// The index finger.
    pub fn index(&self) -> &Finger {
        &self.fingers[Self::INDEX]
    }

    /// The middle finger.
    pub fn middle(&self) -> &Finger {
        &self.fingers[Self::MIDDLE]
    }

    /// Palm speed, metres per second.
    pub fn velocity_magnitude(&self) -> f32 {
        self.palm_velocity.norm()
    }
}

/// One sensor tick.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HandFrame {
    /// Sensor clock, microseconds.
    pub timestamp_us: i64,
    /// Hands visible this tick, in sensor order.
    #[serde(default)]
    pub hands: Vec<Hand>,
}

impl HandFrame {
    /// Hand with the given id, if present this tick.
    pub fn hand(&self, id: u32) -> Option<&Hand> {
        self.hands.iter().find(|hand| hand.id == id)
    }
}

/// Input to the engine from the sensor collaborator.
#[derive(Debug, Clone, PartialEq)]
pub enum SensorEvent {
    /// A tracking frame.
    Frame(HandFrame),
    /// The tracking source became available.
    Connected,
    /// The tracking source went away.
    Disconnected,
}
