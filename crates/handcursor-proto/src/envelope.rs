//! The `{ action, content }` envelope every message travels in.

use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};

use crate::{
    ActionCode, InputAction, ProtocolError, Result,
    payloads::presence::{HandPresenceEvent, HandPresenceState},
};

/// Key under which every request and response carries its correlation id.
pub const REQUEST_ID_KEY: &str = "requestID";

/// A decoded message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Envelope {
    /// What kind of message this is.
    pub action: ActionCode,
    /// Action-specific payload; an empty object when absent on the wire.
    pub content: Value,
}

impl Envelope {
    /// Build an envelope from any serialisable payload.
    pub fn new(action: ActionCode, content: &impl Serialize) -> Result<Self> {
        let content =
            serde_json::to_value(content).map_err(|e| ProtocolError::Serialize(e.to_string()))?;
        Ok(Self { action, content })
    }

    /// Envelope carrying one input action.
    pub fn input_action(action: &InputAction) -> Result<Self> {
        Self::new(ActionCode::InputAction, action)
    }

    /// Envelope carrying a hand presence change.
    pub fn hand_presence(state: HandPresenceState) -> Result<Self> {
        Self::new(ActionCode::HandPresenceEvent, &HandPresenceEvent { state })
    }

    /// Decode an envelope from socket text.
    ///
    /// Distinguishes malformed JSON, a missing `action`, and an action code
    /// this server does not know, so callers can answer or ignore each case.
    pub fn decode(text: &str) -> Result<Self> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| ProtocolError::InvalidJson(e.to_string()))?;
        let Value::Object(mut object) = value else {
            return Err(ProtocolError::InvalidJson("envelope is not an object".into()));
        };

        let action = match object.remove("action") {
            Some(Value::String(name)) => name.parse::<ActionCode>()?,
            _ => return Err(ProtocolError::MissingAction),
        };

        let content = match object.remove("content") {
            None | Some(Value::Null) => Value::Object(Map::new()),
            Some(content) => content,
        };

        Ok(Self { action, content })
    }

    /// Encode the envelope as socket text.
    pub fn encode(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| ProtocolError::Serialize(e.to_string()))
    }

    /// The `requestID` carried in the content, if any.
    pub fn request_id(&self) -> Option<&str> {
        self.content.get(REQUEST_ID_KEY).and_then(Value::as_str)
    }

    /// Deserialise the content as the payload type `T`.
    pub fn content_as<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(self.content.clone()).map_err(|e| ProtocolError::InvalidContent {
            action: self.action,
            reason: e.to_string(),
        })
    }
}

/// Best-effort extraction of `content.requestID` from text that may not
/// decode as a full envelope (unknown action, bad payload).
pub fn peek_request_id(text: &str) -> Option<String> {
    let value: Value = serde_json::from_str(text).ok()?;
    value.get("content")?.get(REQUEST_ID_KEY)?.as_str().map(str::to_owned)
}
