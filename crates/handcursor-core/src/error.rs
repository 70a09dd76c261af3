//! Configuration error types.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading, merging or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A document could not be read from disk.
    #[error("failed to access {path}: {source}")]
    Io {
        /// File that failed
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// A document is not valid JSON for its schema.
    #[error("failed to parse {document}: {reason}")]
    Parse {
        /// Document name (`InteractionConfig`, `PhysicalConfig`)
        document: &'static str,
        /// Decoder message
        reason: String,
    },

    /// A document parsed but violates a constraint.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}
