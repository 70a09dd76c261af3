//! Protocol error types.

use thiserror::Error;

use crate::ActionCode;

/// Result alias for protocol operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors raised while decoding or encoding wire messages.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// The text is not valid JSON, or not a JSON object.
    #[error("invalid JSON: {0}")]
    InvalidJson(String),

    /// The envelope has no usable `action` field.
    #[error("envelope is missing the `action` field")]
    MissingAction,

    /// The `action` field names a code this server does not know.
    #[error("unknown action code `{0}`")]
    UnknownAction(String),

    /// The `content` object does not match the payload the action requires.
    #[error("invalid content for {action}: {reason}")]
    InvalidContent {
        /// Action whose payload failed to parse
        action: ActionCode,
        /// Decoder message
        reason: String,
    },

    /// A value could not be serialised.
    #[error("serialisation failed: {0}")]
    Serialize(String),
}
