//! Generic success/failure response.

use serde::{Deserialize, Serialize};

use super::RequestId;

/// Outcome of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResponseStatus {
    /// Request applied.
    Success,
    /// Request rejected; `message` says why.
    Failure,
}

/// Body shared by every response envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    /// Echo of the request's id.
    #[serde(rename = "requestID")]
    pub request_id: RequestId,
    /// Outcome.
    pub status: ResponseStatus,
    /// Human-readable detail, empty on success.
    pub message: String,
    /// The request text as received.
    #[serde(rename = "originalRequest")]
    pub original_request: String,
}

impl Response {
    /// Successful response to `original_request`.
    pub fn success(request_id: impl Into<RequestId>, original_request: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            status: ResponseStatus::Success,
            message: String::new(),
            original_request: original_request.into(),
        }
    }

    /// Failed response to `original_request`.
    pub fn failure(
        request_id: impl Into<RequestId>,
        message: impl Into<String>,
        original_request: impl Into<String>,
    ) -> Self {
        Self {
            request_id: request_id.into(),
            status: ResponseStatus::Failure,
            message: message.into(),
            original_request: original_request.into(),
        }
    }

    /// True when the request was applied.
    pub fn is_success(&self) -> bool {
        self.status == ResponseStatus::Success
    }
}
