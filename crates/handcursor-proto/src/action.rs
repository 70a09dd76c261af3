//! Action codes carried in the envelope's `action` field.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::ProtocolError;

/// Identifies the kind of message an envelope carries.
///
/// Serialised as SCREAMING_SNAKE_CASE strings (`"INPUT_ACTION"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionCode {
    /// Server → client: one classified input action.
    InputAction,
    /// Server → client: a hand appeared or all hands were lost.
    HandPresenceEvent,

    /// Client → server: API version negotiation.
    VersionHandshake,
    /// Server → client: handshake result.
    VersionHandshakeResponse,

    /// Client → server: read the live configuration.
    GetConfigurationState,
    /// Client → server: merge fields into the live configuration.
    SetConfigurationState,
    /// Server → client: live configuration contents.
    ConfigurationState,
    /// Server → client: result of a live configuration change.
    ConfigurationResponse,

    /// Client → server: read the persisted configuration files.
    GetConfigurationFile,
    /// Client → server: merge fields into the persisted configuration.
    SetConfigurationFile,
    /// Server → client: persisted configuration contents.
    ConfigurationFileState,
    /// Server → client: result of a persisted configuration change.
    ConfigurationFileResponse,

    /// Client → server: read sensor-level tracking parameters.
    GetTrackingState,
    /// Client → server: change sensor-level tracking parameters.
    SetTrackingState,
    /// Server → client: tracking parameters after a get or set.
    TrackingState,

    /// Client → server: query service health.
    RequestServiceStatus,
    /// Server → client: service health.
    ServiceStatus,
}

impl ActionCode {
    /// Every code, in declaration order.
    pub const ALL: [Self; 17] = [
        Self::InputAction,
        Self::HandPresenceEvent,
        Self::VersionHandshake,
        Self::VersionHandshakeResponse,
        Self::GetConfigurationState,
        Self::SetConfigurationState,
        Self::ConfigurationState,
        Self::ConfigurationResponse,
        Self::GetConfigurationFile,
        Self::SetConfigurationFile,
        Self::ConfigurationFileState,
        Self::ConfigurationFileResponse,
        Self::GetTrackingState,
        Self::SetTrackingState,
        Self::TrackingState,
        Self::RequestServiceStatus,
        Self::ServiceStatus,
    ];

    /// Wire name of the code.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InputAction => "INPUT_ACTION",
            Self::HandPresenceEvent => "HAND_PRESENCE_EVENT",
            Self::VersionHandshake => "VERSION_HANDSHAKE",
            Self::VersionHandshakeResponse => "VERSION_HANDSHAKE_RESPONSE",
            Self::GetConfigurationState => "GET_CONFIGURATION_STATE",
            Self::SetConfigurationState => "SET_CONFIGURATION_STATE",
            Self::ConfigurationState => "CONFIGURATION_STATE",
            Self::ConfigurationResponse => "CONFIGURATION_RESPONSE",
            Self::GetConfigurationFile => "GET_CONFIGURATION_FILE",
            Self::SetConfigurationFile => "SET_CONFIGURATION_FILE",
            Self::ConfigurationFileState => "CONFIGURATION_FILE_STATE",
            Self::ConfigurationFileResponse => "CONFIGURATION_FILE_RESPONSE",
            Self::GetTrackingState => "GET_TRACKING_STATE",
            Self::SetTrackingState => "SET_TRACKING_STATE",
            Self::TrackingState => "TRACKING_STATE",
            Self::RequestServiceStatus => "REQUEST_SERVICE_STATUS",
            Self::ServiceStatus => "SERVICE_STATUS",
        }
    }

    /// Code the server answers this request with, or `None` for
    /// server-originated codes.
    pub fn response_code(self) -> Option<Self> {
        match self {
            Self::VersionHandshake => Some(Self::VersionHandshakeResponse),
            Self::GetConfigurationState => Some(Self::ConfigurationState),
            Self::SetConfigurationState => Some(Self::ConfigurationResponse),
            Self::GetConfigurationFile => Some(Self::ConfigurationFileState),
            Self::SetConfigurationFile => Some(Self::ConfigurationFileResponse),
            Self::GetTrackingState | Self::SetTrackingState => Some(Self::TrackingState),
            Self::RequestServiceStatus => Some(Self::ServiceStatus),
            _ => None,
        }
    }

    /// True for codes a client may send.
    pub fn is_request(self) -> bool {
        self.response_code().is_some()
    }
}

impl fmt::Display for ActionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionCode {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|code| code.as_str() == s)
            .ok_or_else(|| ProtocolError::UnknownAction(s.to_string()))
    }
}
