//! Sensor-level tracking parameters.

use serde::{Deserialize, Serialize};

use super::{RequestId, Response};

/// Fractions of the sensor image to ignore from each edge, each in `[0, 1)`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Mask {
    /// Fraction masked from the left edge.
    pub left: f32,
    /// Fraction masked from the right edge.
    pub right: f32,
    /// Fraction masked from the top edge.
    pub upper: f32,
    /// Fraction masked from the bottom edge.
    pub lower: f32,
}

impl Mask {
    /// Reject masks that leave no visible image.
    pub fn validate(&self) -> Result<(), String> {
        let edges = [self.left, self.right, self.upper, self.lower];
        if edges.iter().any(|edge| !(0.0..1.0).contains(edge)) {
            return Err("mask edges must lie in [0, 1)".into());
        }
        if self.left + self.right >= 1.0 || self.upper + self.lower >= 1.0 {
            return Err("mask covers the whole image".into());
        }
        Ok(())
    }
}

/// Full set of tracking parameters.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TrackingState {
    /// Image mask.
    pub mask: Mask,
    /// Whether the sensor may stream camera images.
    #[serde(rename = "allowImages")]
    pub allow_images: bool,
    /// Whether the sensor is mounted upside down.
    #[serde(rename = "cameraReversed")]
    pub camera_reversed: bool,
}

/// Body of `SET_TRACKING_STATE`; absent fields are left unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackingStateChange {
    /// Correlation id.
    #[serde(rename = "requestID")]
    pub request_id: RequestId,
    /// New mask.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mask: Option<Mask>,
    /// New image streaming flag.
    #[serde(rename = "allowImages", default, skip_serializing_if = "Option::is_none")]
    pub allow_images: Option<bool>,
    /// New orientation flag.
    #[serde(rename = "cameraReversed", default, skip_serializing_if = "Option::is_none")]
    pub camera_reversed: Option<bool>,
}

impl TrackingStateChange {
    /// Apply the change on top of `current`, validating the result.
    pub fn apply_to(&self, current: TrackingState) -> Result<TrackingState, String> {
        let next = TrackingState {
            mask: self.mask.unwrap_or(current.mask),
            allow_images: self.allow_images.unwrap_or(current.allow_images),
            camera_reversed: self.camera_reversed.unwrap_or(current.camera_reversed),
        };
        next.mask.validate()?;
        Ok(next)
    }
}

/// Body of `TRACKING_STATE`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackingStateResponse {
    /// Response status fields.
    #[serde(flatten)]
    pub response: Response,
    /// Parameters in effect after the request.
    pub state: TrackingState,
}
