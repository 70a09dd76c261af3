//! API version negotiation.

use serde::{Deserialize, Serialize};

use super::{RequestId, Response};

/// Body of `VERSION_HANDSHAKE`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionHandshake {
    /// Correlation id.
    #[serde(rename = "requestID")]
    pub request_id: RequestId,
    /// Client API version, `major.minor.patch`.
    #[serde(rename = "apiVersion")]
    pub api_version: String,
}

/// Body of `VERSION_HANDSHAKE_RESPONSE`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandshakeResponse {
    /// Response status fields.
    #[serde(flatten)]
    pub response: Response,
    /// Server API version.
    #[serde(rename = "apiVersion")]
    pub api_version: String,
}

fn parse_version(version: &str) -> Option<(u32, u32, u32)> {
    let mut parts = version.trim().split('.').map(str::parse::<u32>);
    let major = parts.next()?.ok()?;
    let minor = parts.next().unwrap_or(Ok(0)).ok()?;
    let patch = parts.next().unwrap_or(Ok(0)).ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some((major, minor, patch))
}

/// Check that a client speaking `client` can talk to a server at `server`.
///
/// Major versions must match and the client may not require a newer minor
/// version than the server offers.
pub fn check_compatibility(client: &str, server: &str) -> Result<(), String> {
    let Some((client_major, client_minor, _)) = parse_version(client) else {
        return Err(format!("client version `{client}` is not major.minor.patch"));
    };
    let Some((server_major, server_minor, _)) = parse_version(server) else {
        return Err(format!("server version `{server}` is not major.minor.patch"));
    };

    if client_major != server_major {
        return Err(format!(
            "major version mismatch: client {client_major}, server {server_major}"
        ));
    }
    if client_minor > server_minor {
        return Err(format!("client requires {client}, server provides {server}"));
    }
    Ok(())
}
