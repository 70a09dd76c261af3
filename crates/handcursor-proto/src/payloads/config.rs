//! Configuration request and state payloads.
//!
//! The two configuration documents travel as JSON objects. A set request
//! carries only the fields to change; the server merges them into the
//! current document and validates the result before applying it.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{RequestId, Response};

/// Body of `GET_CONFIGURATION_*` requests and other id-only requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdOnlyRequest {
    /// Correlation id.
    #[serde(rename = "requestID")]
    pub request_id: RequestId,
}

/// Body of `SET_CONFIGURATION_STATE` and `SET_CONFIGURATION_FILE`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigurationChange {
    /// Correlation id.
    #[serde(rename = "requestID")]
    pub request_id: RequestId,
    /// Partial interaction document to merge.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interaction: Option<Value>,
    /// Partial physical document to merge.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub physical: Option<Value>,
}

impl ConfigurationChange {
    /// True when the request names no fields at all.
    pub fn is_empty(&self) -> bool {
        self.interaction.is_none() && self.physical.is_none()
    }
}

/// Body of `CONFIGURATION_STATE` and `CONFIGURATION_FILE_STATE`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigurationState {
    /// Response status fields.
    #[serde(flatten)]
    pub response: Response,
    /// Full interaction document.
    pub interaction: Value,
    /// Full physical document.
    pub physical: Value,
}
