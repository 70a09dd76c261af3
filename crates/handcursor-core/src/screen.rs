//! Projection from sensor space onto the physical screen.
//!
//! Screen space has its origin at the bottom-centre of the visible area,
//! `x` to the right, `y` up the screen and `z` out of the screen towards the
//! user. Pixel coordinates have their origin at the bottom-left corner.

use nalgebra::{Rotation3, Vector2, Vector3};

use crate::{config::PhysicalConfig, hand::Point3};

/// Result of projecting one point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    /// Point on the screen, pixels.
    pub pixels: Vector2<f32>,
    /// Perpendicular distance to the screen plane, metres.
    pub distance: f32,
}

/// Projects sensor-space points onto the screen.
///
/// Holds no state; the calibration is passed on every call so a reload
/// takes effect on the very next projection.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScreenMapper;

impl ScreenMapper {
    /// Pixels per metre on the screen surface.
    pub fn pixels_per_meter(calibration: &PhysicalConfig) -> f32 {
        calibration.screen_height_px as f32 / calibration.screen_height_m
    }

    /// Express a sensor-space point in screen space.
    pub fn to_screen_space(calibration: &PhysicalConfig, world: Point3) -> Point3 {
        let r = calibration.sensor_rotation_deg;
        let sensor = Rotation3::from_euler_angles(
            r.x.to_radians(),
            r.y.to_radians(),
            r.z.to_radians(),
        );
        let relative_to_bottom = sensor * world + calibration.sensor_offset_m;

        let tilt = Rotation3::from_axis_angle(
            &Vector3::x_axis(),
            -calibration.screen_rotation_deg.to_radians(),
        );
        tilt * relative_to_bottom
    }

    /// Project a sensor-space point to pixels and distance from the screen.
    pub fn project(calibration: &PhysicalConfig, world: Point3) -> Projection {
        let p = Self::to_screen_space(calibration, world);
        let ppm = Self::pixels_per_meter(calibration);
        Projection {
            pixels: Vector2::new(
                calibration.screen_width_px as f32 / 2.0 + p.x * ppm,
                p.y * ppm,
            ),
            distance: p.z,
        }
    }
}
