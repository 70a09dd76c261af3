//! Request/response handling for client envelopes.
//!
//! Every request carries a `requestID` that the response echoes. Requests
//! that touch the live configuration never mutate it here: the merged
//! bundle is validated and queued for the sensor thread as an
//! [`EngineCommand`], and the published snapshot is updated so a
//! following read sees the change.
//!
//! Requests from different sockets run concurrently. Configuration writes
//! hold one lock from reading their base to publishing the result, so each
//! change is merged on top of every change acknowledged before it.

use std::sync::{Arc, Mutex, PoisonError, mpsc};

use handcursor_core::{ConfigBundle, ConfigSnapshot, DirtyFlag, EngineCommand, SharedStatus};
use handcursor_proto::{
    API_VERSION, ActionCode, Envelope, ProtocolError,
    envelope::peek_request_id,
    payloads::{
        Response,
        config::{ConfigurationChange, ConfigurationState, IdOnlyRequest},
        handshake::{HandshakeResponse, VersionHandshake, check_compatibility},
        status::ServiceStatus,
        tracking::{TrackingStateChange, TrackingStateResponse},
    },
};
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::{config_files::ConfigFiles, sensor::TrackingSettings};

/// Shared state a request may read or change.
#[derive(Debug)]
pub struct RouterContext {
    /// Live configuration as last published by the engine.
    pub snapshot: ConfigSnapshot,
    /// Queue into the engine.
    pub commands: mpsc::Sender<EngineCommand>,
    /// Documents on disk.
    pub files: Arc<ConfigFiles>,
    /// Raised after the documents are rewritten.
    pub dirty: DirtyFlag,
    /// Sensor parameters.
    pub tracking: TrackingSettings,
    /// Service health.
    pub status: SharedStatus,
}

/// Answers client requests.
#[derive(Debug)]
pub struct RequestRouter {
    context: RouterContext,
    config_writes: Mutex<()>,
}

/// Why a request could not be served.
struct Failure(String);

impl From<ProtocolError> for Failure {
    fn from(error: ProtocolError) -> Self {
        Self(error.to_string())
    }
}

impl RequestRouter {
    /// Router over `context`.
    pub fn new(context: RouterContext) -> Self {
        Self { context, config_writes: Mutex::new(()) }
    }

    /// Handle one text frame, returning the reply for the sender if any.
    ///
    /// Never fails: malformed requests with a readable `requestID` get a
    /// failure response, everything else unusable is logged and dropped.
    pub fn handle(&self, text: &str) -> Option<Envelope> {
        let envelope = match Envelope::decode(text) {
            Ok(envelope) => envelope,
            Err(ProtocolError::UnknownAction(action)) => {
                warn!(%action, "ignoring unknown action");
                return None;
            },
            Err(error) => {
                warn!(%error, "malformed message dropped");
                return None;
            },
        };

        let Some(reply_code) = envelope.action.response_code() else {
            warn!(action = %envelope.action, "ignoring server-only action from client");
            return None;
        };
        let Some(request_id) = envelope.request_id().map(str::to_owned).or_else(|| peek_request_id(text))
        else {
            warn!(action = %envelope.action, "request without requestID dropped");
            return None;
        };

        debug!(action = %envelope.action, %request_id, "request");
        match self.dispatch(&envelope, &request_id, text) {
            Ok(reply) => Some(reply),
            Err(Failure(message)) => {
                warn!(action = %envelope.action, %request_id, %message, "request failed");
                Envelope::new(reply_code, &Response::failure(request_id, message, text))
                    .inspect_err(|error| warn!(%error, "cannot encode failure response"))
                    .ok()
            },
        }
    }

    fn dispatch(
        &self,
        envelope: &Envelope,
        request_id: &str,
        original: &str,
    ) -> Result<Envelope, Failure> {
        let ok = || Response::success(request_id, original);
        let ctx = &self.context;

        let reply = match envelope.action {
            ActionCode::VersionHandshake => {
                let request: VersionHandshake = content(envelope)?;
                check_compatibility(&request.api_version, API_VERSION).map_err(Failure)?;
                info!(client = %request.api_version, server = API_VERSION, "handshake accepted");
                Envelope::new(
                    ActionCode::VersionHandshakeResponse,
                    &HandshakeResponse { response: ok(), api_version: API_VERSION.into() },
                )
            },
            ActionCode::GetConfigurationState => {
                let _: IdOnlyRequest = content(envelope)?;
                let (interaction, physical) = to_json(&ctx.snapshot.get())?;
                Envelope::new(
                    ActionCode::ConfigurationState,
                    &ConfigurationState { response: ok(), interaction, physical },
                )
            },
            ActionCode::SetConfigurationState => {
                let change: ConfigurationChange = content(envelope)?;
                let _write = self.config_writes.lock().unwrap_or_else(PoisonError::into_inner);
                let bundle = merge(&ctx.snapshot.get(), &change)?;
                ctx.commands
                    .send(EngineCommand::ApplyConfig(bundle.clone()))
                    .map_err(|_| Failure("interaction engine is not running".into()))?;
                ctx.snapshot.publish(bundle);
                Envelope::new(ActionCode::ConfigurationResponse, &ok())
            },
            ActionCode::GetConfigurationFile => {
                let _: IdOnlyRequest = content(envelope)?;
                let (interaction, physical) =
                    ctx.files.read_documents().map_err(|e| Failure(e.to_string()))?;
                Envelope::new(
                    ActionCode::ConfigurationFileState,
                    &ConfigurationState { response: ok(), interaction, physical },
                )
            },
            ActionCode::SetConfigurationFile => {
                let change: ConfigurationChange = content(envelope)?;
                let _write = self.config_writes.lock().unwrap_or_else(PoisonError::into_inner);
                let on_disk = ctx.files.load().map_err(|e| Failure(e.to_string()))?;
                let bundle = merge(&on_disk, &change)?;
                ctx.files.write(&bundle).map_err(|e| Failure(e.to_string()))?;
                ctx.dirty.mark();
                Envelope::new(ActionCode::ConfigurationFileResponse, &ok())
            },
            ActionCode::GetTrackingState => {
                let _: IdOnlyRequest = content(envelope)?;
                Envelope::new(
                    ActionCode::TrackingState,
                    &TrackingStateResponse { response: ok(), state: ctx.tracking.get() },
                )
            },
            ActionCode::SetTrackingState => {
                let change: TrackingStateChange = content(envelope)?;
                let state = change.apply_to(ctx.tracking.get()).map_err(Failure)?;
                ctx.tracking.set(state);
                Envelope::new(ActionCode::TrackingState, &TrackingStateResponse { response: ok(), state })
            },
            ActionCode::RequestServiceStatus => {
                let _: IdOnlyRequest = content(envelope)?;
                Envelope::new(
                    ActionCode::ServiceStatus,
                    &ServiceStatus {
                        request_id: request_id.into(),
                        tracking_service_state: ctx.status.tracking(),
                        configuration_state: ctx.status.configuration(),
                    },
                )
            },
            other => return Err(Failure(format!("{other} is not a request"))),
        };
        reply.map_err(Failure::from)
    }
}

fn content<T: DeserializeOwned>(envelope: &Envelope) -> Result<T, Failure> {
    Ok(envelope.content_as()?)
}

fn to_json(bundle: &ConfigBundle) -> Result<(serde_json::Value, serde_json::Value), Failure> {
    bundle.to_json().map_err(|e| Failure(e.to_string()))
}

fn merge(base: &ConfigBundle, change: &ConfigurationChange) -> Result<ConfigBundle, Failure> {
    if change.is_empty() {
        return Err(Failure("request contains no configuration".into()));
    }
    base.merged(change.interaction.as_ref(), change.physical.as_ref())
        .map_err(|e| Failure(e.to_string()))
}
