//! Server error types.

use std::path::PathBuf;

use handcursor_core::ConfigError;
use handcursor_proto::ProtocolError;
use thiserror::Error;

use crate::broadcast::ConnectionId;

/// Errors that stop the service or one of its subsystems.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The listening socket could not be bound.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// Address we tried to bind
        addr: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// I/O error outside socket binding.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration could not be prepared at startup.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A frame recording could not be read.
    #[error("invalid recording {path} at line {line}: {reason}")]
    Recording {
        /// Recording file
        path: PathBuf,
        /// 1-based line number
        line: usize,
        /// Decoder message
        reason: String,
    },

    /// The config directory watcher failed.
    #[error("config watcher error: {0}")]
    Watch(#[from] notify::Error),

    /// The sensor loop thread panicked.
    #[error("sensor loop thread panicked")]
    SensorThread,
}

/// Errors delivering to a single client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BroadcastError {
    /// The connection closed; it has been removed from the set.
    #[error("connection {0} is closed")]
    Closed(ConnectionId),

    /// No connection with this id is registered.
    #[error("connection {0} is not registered")]
    Unknown(ConnectionId),

    /// The message could not be encoded.
    #[error("failed to encode message: {0}")]
    Encode(#[from] ProtocolError),
}
