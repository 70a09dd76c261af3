//! Service health reporting.

use serde::{Deserialize, Serialize};

use super::RequestId;

/// Connection state of the hand-tracking source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrackingServiceState {
    /// No sensor connection; input actions are suppressed.
    Unavailable,
    /// Sensor connected and delivering frames.
    Connected,
}

/// Health of the configuration documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConfigurationStatus {
    /// Nothing loaded yet; defaults in effect.
    NotLoaded,
    /// Last load succeeded.
    Loaded,
    /// Last load failed; the previous configuration is still in effect.
    Errored,
}

/// Body of `SERVICE_STATUS`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceStatus {
    /// Echo of the request's id.
    #[serde(rename = "requestID")]
    pub request_id: RequestId,
    /// Sensor connection state.
    #[serde(rename = "trackingServiceState")]
    pub tracking_service_state: TrackingServiceState,
    /// Configuration health.
    #[serde(rename = "configurationState")]
    pub configuration_state: ConfigurationStatus,
}
