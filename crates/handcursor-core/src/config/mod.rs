//! Configuration schema and live store.
//!
//! Two documents make up the configuration: [`InteractionConfig`] (how
//! gestures are classified) and [`PhysicalConfig`] (where the screen and
//! sensor are). Both deserialise with every field defaulted so partial
//! documents are valid, and both are validated before they replace the
//! live configuration.

mod store;

pub use store::{ConfigLoader, ConfigSnapshot, ConfigStore, DirtyFlag};

use handcursor_proto::InteractionType;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::{ConfigError, positioning::TrackedPosition};

/// Stabiliser smoothing parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct SmoothingSettings {
    /// Cutoff frequency at rest, Hz. Lower is smoother.
    pub min_cutoff: f32,
    /// Cutoff increase per metre per second of hand speed.
    pub beta: f32,
    /// Smoothing multiplier applied while a press is held.
    pub drag_factor: f32,
}

impl Default for SmoothingSettings {
    fn default() -> Self {
        Self { min_cutoff: 1.0, beta: 0.5, drag_factor: 10.0 }
    }
}

impl SmoothingSettings {
    /// The filter cutoff must stay positive at every hand speed.
    fn validate(&self) -> Result<(), ConfigError> {
        let Self { min_cutoff, beta, drag_factor } = *self;
        if ![min_cutoff, beta, drag_factor].iter().all(|v| v.is_finite()) {
            return Err(ConfigError::Invalid("Smoothing values must be finite".into()));
        }
        if min_cutoff <= 0.0 || beta < 0.0 || drag_factor < 1.0 {
            return Err(ConfigError::Invalid(
                "Smoothing needs MinCutoff > 0, Beta >= 0 and DragFactor >= 1".into(),
            ));
        }
        Ok(())
    }
}

/// Distance thresholds for the plane-crossing modes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct PlaneThresholds {
    /// Distance at which progress starts rising from 0.
    pub start_distance_cm: f32,
    /// Distance below which DOWN fires.
    pub activation_distance_cm: f32,
    /// Extra distance above activation required for UP.
    pub release_margin_cm: f32,
}

impl PlaneThresholds {
    const PUSH: Self =
        Self { start_distance_cm: 12.0, activation_distance_cm: 4.0, release_margin_cm: 1.0 };
    const TOUCH_PLANE: Self =
        Self { start_distance_cm: 10.0, activation_distance_cm: 5.0, release_margin_cm: 0.5 };

    fn validate(&self, name: &str) -> Result<(), ConfigError> {
        if self.activation_distance_cm >= self.start_distance_cm {
            return Err(ConfigError::Invalid(format!(
                "{name}: ActivationDistanceCm must be below StartDistanceCm"
            )));
        }
        if self.release_margin_cm < 0.0 {
            return Err(ConfigError::Invalid(format!("{name}: ReleaseMarginCm is negative")));
        }
        Ok(())
    }
}

impl Default for PlaneThresholds {
    fn default() -> Self {
        Self::PUSH
    }
}

/// Hover-and-hold timers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct DwellSettings {
    /// Seconds of stillness before progress starts rising.
    pub start_time_s: f32,
    /// Seconds of stillness at which DOWN fires.
    pub complete_time_s: f32,
    /// Cursor movement, pixels, that abandons a dwell.
    pub cancel_radius_px: f32,
}

impl Default for DwellSettings {
    fn default() -> Self {
        Self { start_time_s: 0.5, complete_time_s: 1.0, cancel_radius_px: 40.0 }
    }
}

/// Grab hysteresis thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct GrabSettings {
    /// Strength at or above which the hand starts grabbing.
    pub grab_threshold: f32,
    /// Strength below which a grabbing hand lets go.
    pub ungrab_threshold: f32,
}

impl Default for GrabSettings {
    fn default() -> Self {
        Self { grab_threshold: 0.8, ungrab_threshold: 0.6 }
    }
}

/// How gestures are classified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct InteractionConfig {
    /// Active interaction mode.
    pub interaction_type: InteractionType,
    /// Whether pressed movement produces DRAG.
    pub use_scrolling_or_dragging: bool,
    /// Stabiliser deadzone radius, metres.
    pub deadzone_radius_m: f32,
    /// Pressed movement, pixels, before HOLD turns into DRAG.
    pub drag_start_distance_px: f32,
    /// Consecutive missing frames before a hand counts as lost.
    pub hand_lost_frames: u32,
    /// Anatomical point that drives the cursor.
    pub tracked_position: TrackedPosition,
    /// Whether the interaction zone filter is active.
    pub interaction_zone_enabled: bool,
    /// Near edge of the interaction zone.
    pub interaction_min_distance_cm: f32,
    /// Far edge of the interaction zone.
    pub interaction_max_distance_cm: f32,
    /// Stabiliser smoothing.
    pub smoothing: SmoothingSettings,
    /// Push thresholds.
    pub push: PlaneThresholds,
    /// Touch plane thresholds.
    pub touch_plane: PlaneThresholds,
    /// Hover-and-hold timers.
    pub hover_and_hold: DwellSettings,
    /// Grab thresholds.
    pub grab: GrabSettings,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            interaction_type: InteractionType::Push,
            use_scrolling_or_dragging: true,
            deadzone_radius_m: 0.003,
            drag_start_distance_px: 20.0,
            hand_lost_frames: 2,
            tracked_position: TrackedPosition::IndexStable,
            interaction_zone_enabled: false,
            interaction_min_distance_cm: 0.0,
            interaction_max_distance_cm: 25.0,
            smoothing: SmoothingSettings::default(),
            push: PlaneThresholds::PUSH,
            touch_plane: PlaneThresholds::TOUCH_PLANE,
            hover_and_hold: DwellSettings::default(),
            grab: GrabSettings::default(),
        }
    }
}

impl InteractionConfig {
    /// Check cross-field constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.deadzone_radius_m < 0.0 || self.drag_start_distance_px < 0.0 {
            return Err(ConfigError::Invalid("radii must not be negative".into()));
        }
        if self.hand_lost_frames == 0 {
            return Err(ConfigError::Invalid("HandLostFrames must be at least 1".into()));
        }
        if self.interaction_min_distance_cm > self.interaction_max_distance_cm {
            return Err(ConfigError::Invalid(
                "InteractionMinDistanceCm exceeds InteractionMaxDistanceCm".into(),
            ));
        }
        self.smoothing.validate()?;
        self.push.validate("Push")?;
        self.touch_plane.validate("TouchPlane")?;

        let dwell = &self.hover_and_hold;
        if dwell.start_time_s < 0.0 || dwell.start_time_s >= dwell.complete_time_s {
            return Err(ConfigError::Invalid(
                "HoverAndHold needs 0 <= StartTimeS < CompleteTimeS".into(),
            ));
        }
        if dwell.cancel_radius_px < 0.0 {
            return Err(ConfigError::Invalid("HoverAndHold: CancelRadiusPx is negative".into()));
        }
        if self.grab.ungrab_threshold >= self.grab.grab_threshold {
            return Err(ConfigError::Invalid(
                "Grab: UngrabThreshold must be below GrabThreshold".into(),
            ));
        }
        Ok(())
    }

    /// Thresholds for a plane-crossing mode.
    pub fn plane_thresholds(&self, kind: InteractionType) -> &PlaneThresholds {
        match kind {
            InteractionType::TouchPlane => &self.touch_plane,
            _ => &self.push,
        }
    }
}

/// Where the screen and sensor are.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicalConfig {
    /// Physical height of the visible screen area, metres.
    #[serde(rename = "ScreenHeightM")]
    pub screen_height_m: f32,
    /// Horizontal resolution.
    #[serde(rename = "ScreenWidthPX")]
    pub screen_width_px: u32,
    /// Vertical resolution.
    #[serde(rename = "ScreenHeightPX")]
    pub screen_height_px: u32,
    /// Screen tilt about its bottom edge, degrees (positive leans back).
    #[serde(rename = "ScreenRotationD")]
    pub screen_rotation_deg: f32,
    /// Sensor origin relative to the bottom-centre of the screen, metres.
    #[serde(rename = "LeapPositionRelativeToScreenBottomM")]
    pub sensor_offset_m: Vector3<f32>,
    /// Sensor orientation as XYZ Euler angles, degrees.
    #[serde(rename = "LeapRotationD")]
    pub sensor_rotation_deg: Vector3<f32>,
}

impl Default for PhysicalConfig {
    fn default() -> Self {
        Self {
            screen_height_m: 0.33,
            screen_width_px: 1920,
            screen_height_px: 1080,
            screen_rotation_deg: 0.0,
            sensor_offset_m: Vector3::new(0.0, -0.12, 0.10),
            sensor_rotation_deg: Vector3::zeros(),
        }
    }
}

impl PhysicalConfig {
    /// Check the calibration can produce a projection.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.screen_height_m <= 0.0 || !self.screen_height_m.is_finite() {
            return Err(ConfigError::Invalid("ScreenHeightM must be positive".into()));
        }
        if self.screen_width_px == 0 || self.screen_height_px == 0 {
            return Err(ConfigError::Invalid("screen resolution must be non-zero".into()));
        }
        Ok(())
    }
}

/// Both documents, swapped together.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ConfigBundle {
    /// Interaction document.
    pub interaction: InteractionConfig,
    /// Physical document.
    pub physical: PhysicalConfig,
}

impl ConfigBundle {
    /// Validate both documents.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.interaction.validate()?;
        self.physical.validate()
    }

    /// Both documents as JSON objects.
    pub fn to_json(&self) -> Result<(Value, Value), ConfigError> {
        Ok((to_value("InteractionConfig", &self.interaction)?, to_value("PhysicalConfig", &self.physical)?))
    }

    /// A copy with the given partial documents merged in, validated.
    pub fn merged(
        &self,
        interaction: Option<&Value>,
        physical: Option<&Value>,
    ) -> Result<Self, ConfigError> {
        let (mut interaction_doc, mut physical_doc) = self.to_json()?;
        if let Some(patch) = interaction {
            merge_json(&mut interaction_doc, patch);
        }
        if let Some(patch) = physical {
            merge_json(&mut physical_doc, patch);
        }

        let bundle = Self {
            interaction: from_value("InteractionConfig", interaction_doc)?,
            physical: from_value("PhysicalConfig", physical_doc)?,
        };
        bundle.validate()?;
        Ok(bundle)
    }
}

/// Parse one document from text.
pub fn parse_document<T: DeserializeOwned>(
    document: &'static str,
    text: &str,
) -> Result<T, ConfigError> {
    serde_json::from_str(text)
        .map_err(|e| ConfigError::Parse { document, reason: e.to_string() })
}

fn to_value(document: &'static str, value: &impl Serialize) -> Result<Value, ConfigError> {
    serde_json::to_value(value).map_err(|e| ConfigError::Parse { document, reason: e.to_string() })
}

fn from_value<T: DeserializeOwned>(document: &'static str, value: Value) -> Result<T, ConfigError> {
    serde_json::from_value(value)
        .map_err(|e| ConfigError::Parse { document, reason: e.to_string() })
}

/// Recursively merge `patch` into `target`. Objects merge key by key;
/// anything else replaces the target value.
pub fn merge_json(target: &mut Value, patch: &Value) {
    match (target, patch) {
        (Value::Object(target), Value::Object(patch)) => {
            for (key, value) in patch {
                match target.get_mut(key) {
                    Some(existing) => merge_json(existing, value),
                    None => {
                        target.insert(key.clone(), value.clone());
                    },
                }
            }
        },
        (target, patch) => *target = patch.clone(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(ConfigBundle::default().validate().is_ok());
    }

    #[test]
    fn partial_document_fills_defaults() {
        let config: InteractionConfig =
            parse_document("InteractionConfig", r#"{"InteractionType":"GRAB"}"#).unwrap();
        assert_eq!(config.interaction_type, InteractionType::Grab);
        assert_eq!(config.grab, GrabSettings::default());
        assert_eq!(config.touch_plane, PlaneThresholds::TOUCH_PLANE);
    }

    #[test]
    fn merge_changes_only_named_fields() {
        let bundle = ConfigBundle::default();
        let merged = bundle
            .merged(Some(&json!({ "Grab": { "GrabThreshold": 0.9 } })), None)
            .unwrap();
        assert!((merged.interaction.grab.grab_threshold - 0.9).abs() < f32::EPSILON);
        assert!((merged.interaction.grab.ungrab_threshold - 0.6).abs() < f32::EPSILON);
        assert_eq!(merged.physical, bundle.physical);
    }

    #[test]
    fn merge_rejects_inverted_hysteresis() {
        let result = ConfigBundle::default()
            .merged(Some(&json!({ "Grab": { "UngrabThreshold": 0.95 } })), None);
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn merge_rejects_negative_beta() {
        let result = ConfigBundle::default()
            .merged(Some(&json!({ "Smoothing": { "Beta": -5.0 } })), None);
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn smoothing_rejects_non_finite_values() {
        let mut config = InteractionConfig::default();
        config.smoothing.beta = f32::INFINITY;
        assert!(config.validate().is_err());
        config.smoothing.beta = 0.0;
        assert!(config.validate().is_ok());
        config.smoothing.min_cutoff = f32::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn merge_rejects_wrong_types() {
        let result = ConfigBundle::default()
            .merged(None, Some(&json!({ "ScreenWidthPX": "wide" })));
        assert!(matches!(result, Err(ConfigError::Parse { document: "PhysicalConfig", .. })));
    }

    #[test]
    fn physical_document_uses_calibration_keys() {
        let value = serde_json::to_value(PhysicalConfig::default()).unwrap();
        assert_eq!(value["ScreenWidthPX"], json!(1920));
        assert!(value["LeapPositionRelativeToScreenBottomM"].is_array());
    }

    #[test]
    fn merge_json_replaces_scalars_and_recurses_objects() {
        let mut target = json!({ "a": 1, "b": { "c": 2, "d": 3 } });
        merge_json(&mut target, &json!({ "a": 5, "b": { "d": 4 }, "e": true }));
        assert_eq!(target, json!({ "a": 5, "b": { "c": 2, "d": 4 }, "e": true }));
    }
}
