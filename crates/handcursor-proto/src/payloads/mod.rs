//! Request and response payloads carried in envelope `content`.

pub mod config;
pub mod handshake;
pub mod presence;
pub mod response;
pub mod status;
pub mod tracking;

pub use response::{Response, ResponseStatus};

/// Caller-chosen correlation id, echoed back in every response.
pub type RequestId = String;
