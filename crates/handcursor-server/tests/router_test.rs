//! Request router tests
//!
//! Drive every request type through [`RequestRouter::handle`] against a
//! temporary config directory and check the reply envelope.

use std::{
    sync::{Arc, Barrier, mpsc},
    thread,
};

use handcursor_core::{ConfigBundle, ConfigSnapshot, DirtyFlag, EngineCommand, SharedStatus, TrackedPosition};
use handcursor_proto::{
    API_VERSION, ActionCode, Envelope, InteractionType,
    payloads::{
        Response,
        config::ConfigurationState,
        handshake::HandshakeResponse,
        status::{ConfigurationStatus, ServiceStatus, TrackingServiceState},
        tracking::TrackingStateResponse,
    },
};
use handcursor_server::{ConfigFiles, RequestRouter, RouterContext, TrackingSettings};
use serde_json::{Value, json};
use tempfile::TempDir;

struct Fixture {
    router: RequestRouter,
    commands: mpsc::Receiver<EngineCommand>,
    snapshot: ConfigSnapshot,
    dirty: DirtyFlag,
    files: Arc<ConfigFiles>,
    _dir: TempDir,
}

fn fixture() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let files = Arc::new(ConfigFiles::new(dir.path()));
    let snapshot = ConfigSnapshot::new(ConfigBundle::default());
    let dirty = DirtyFlag::new();
    let (commands, queue) = mpsc::channel();
    let router = RequestRouter::new(RouterContext {
        snapshot: snapshot.clone(),
        commands,
        files: Arc::clone(&files),
        dirty: dirty.clone(),
        tracking: TrackingSettings::default(),
        status: SharedStatus::new(),
    });
    Fixture { router, commands: queue, snapshot, dirty, files, _dir: dir }
}

fn request(action: &str, content: Value) -> String {
    json!({ "action": action, "content": content }).to_string()
}

fn response(reply: &Envelope) -> Response {
    reply.content_as().unwrap()
}

#[test]
fn handshake_with_same_major_succeeds() {
    let f = fixture();
    let text = request("VERSION_HANDSHAKE", json!({ "requestID": "h1", "apiVersion": "1.0.0" }));
    let reply = f.router.handle(&text).unwrap();

    assert_eq!(reply.action, ActionCode::VersionHandshakeResponse);
    let body: HandshakeResponse = reply.content_as().unwrap();
    assert!(body.response.is_success());
    assert_eq!(body.response.request_id, "h1");
    assert_eq!(body.response.original_request, text);
    assert_eq!(body.api_version, API_VERSION);
}

#[test]
fn handshake_with_other_major_fails_and_echoes_id() {
    let f = fixture();
    let text = request("VERSION_HANDSHAKE", json!({ "requestID": "h2", "apiVersion": "2.0.0" }));
    let reply = f.router.handle(&text).unwrap();

    assert_eq!(reply.action, ActionCode::VersionHandshakeResponse);
    let body = response(&reply);
    assert!(!body.is_success());
    assert_eq!(body.request_id, "h2");
    assert!(!body.message.is_empty());
}

#[test]
fn get_configuration_state_reports_snapshot() {
    let f = fixture();
    let mut bundle = ConfigBundle::default();
    bundle.interaction.interaction_type = InteractionType::Grab;
    f.snapshot.publish(bundle);

    let reply = f.router.handle(&request("GET_CONFIGURATION_STATE", json!({ "requestID": "g" }))).unwrap();
    assert_eq!(reply.action, ActionCode::ConfigurationState);
    let body: ConfigurationState = reply.content_as().unwrap();
    assert!(body.response.is_success());
    assert_eq!(body.interaction["InteractionType"], "GRAB");
}

#[test]
fn set_configuration_state_queues_command_and_publishes() {
    let f = fixture();
    let text = request(
        "SET_CONFIGURATION_STATE",
        json!({ "requestID": "s", "interaction": { "InteractionType": "HOVER" } }),
    );
    let reply = f.router.handle(&text).unwrap();

    assert_eq!(reply.action, ActionCode::ConfigurationResponse);
    assert!(response(&reply).is_success());
    let EngineCommand::ApplyConfig(bundle) = f.commands.try_recv().unwrap();
    assert_eq!(bundle.interaction.interaction_type, InteractionType::Hover);
    assert_eq!(f.snapshot.get(), bundle);
    assert!(!f.dirty.is_set());
}

#[test]
fn concurrent_configuration_changes_all_survive() {
    let changes = [
        json!({ "interaction": { "HandLostFrames": 7 } }),
        json!({ "interaction": { "DragStartDistancePx": 33.0 } }),
        json!({ "interaction": { "UseScrollingOrDragging": false } }),
        json!({ "interaction": { "InteractionType": "GRAB" } }),
        json!({ "interaction": { "TrackedPosition": "WRIST" } }),
        json!({ "physical": { "ScreenWidthPX": 2560 } }),
        json!({ "physical": { "ScreenHeightPX": 1440 } }),
    ];

    for round in 0..20 {
        let f = fixture();
        let barrier = Barrier::new(changes.len());
        thread::scope(|scope| {
            for (i, change) in changes.iter().enumerate() {
                let (router, barrier) = (&f.router, &barrier);
                scope.spawn(move || {
                    let mut content = change.clone();
                    content["requestID"] = json!(format!("{round}-{i}"));
                    barrier.wait();
                    let reply = router.handle(&request("SET_CONFIGURATION_STATE", content)).unwrap();
                    assert!(response(&reply).is_success());
                });
            }
        });

        let applied: Vec<_> = f.commands.try_iter().collect();
        assert_eq!(applied.len(), changes.len());
        let EngineCommand::ApplyConfig(last) = applied.last().cloned().unwrap();
        for bundle in [last, f.snapshot.get()] {
            assert_eq!(bundle.interaction.hand_lost_frames, 7);
            assert!((bundle.interaction.drag_start_distance_px - 33.0).abs() < f32::EPSILON);
            assert!(!bundle.interaction.use_scrolling_or_dragging);
            assert_eq!(bundle.interaction.interaction_type, InteractionType::Grab);
            assert_eq!(bundle.interaction.tracked_position, TrackedPosition::Wrist);
            assert_eq!(bundle.physical.screen_width_px, 2560);
            assert_eq!(bundle.physical.screen_height_px, 1440);
        }
    }
}

#[test]
fn set_configuration_state_without_documents_fails() {
    let f = fixture();
    let reply = f.router.handle(&request("SET_CONFIGURATION_STATE", json!({ "requestID": "e" }))).unwrap();

    assert_eq!(reply.action, ActionCode::ConfigurationResponse);
    let body = response(&reply);
    assert!(!body.is_success());
    assert_eq!(body.request_id, "e");
    assert!(f.commands.try_recv().is_err());
}

#[test]
fn invalid_configuration_is_rejected_and_not_applied() {
    let f = fixture();
    let text = request(
        "SET_CONFIGURATION_STATE",
        json!({ "requestID": "bad", "interaction": { "HandLostFrames": 0 } }),
    );
    let reply = f.router.handle(&text).unwrap();

    assert!(!response(&reply).is_success());
    assert!(f.commands.try_recv().is_err());
    assert_eq!(f.snapshot.get(), ConfigBundle::default());
}

#[test]
fn set_configuration_file_writes_and_marks_dirty() {
    let f = fixture();
    let text = request(
        "SET_CONFIGURATION_FILE",
        json!({ "requestID": "w", "interaction": { "HandLostFrames": 9 } }),
    );
    let reply = f.router.handle(&text).unwrap();

    assert_eq!(reply.action, ActionCode::ConfigurationFileResponse);
    assert!(response(&reply).is_success());
    assert!(f.dirty.is_set());
    assert_eq!(f.files.load().unwrap().interaction.hand_lost_frames, 9);
    // The live configuration is untouched until the engine reloads.
    assert!(f.commands.try_recv().is_err());
}

#[test]
fn get_configuration_file_returns_documents_as_stored() {
    let f = fixture();
    f.files.ensure_defaults().unwrap();
    std::fs::write(f.files.path("InteractionConfig.json"), r#"{"HandLostFrames": 4}"#).unwrap();

    let reply = f.router.handle(&request("GET_CONFIGURATION_FILE", json!({ "requestID": "r" }))).unwrap();
    assert_eq!(reply.action, ActionCode::ConfigurationFileState);
    let body: ConfigurationState = reply.content_as().unwrap();
    assert_eq!(body.interaction, json!({ "HandLostFrames": 4 }));
    assert!(body.physical.is_object());
}

#[test]
fn get_configuration_file_without_documents_fails() {
    let f = fixture();
    let reply = f.router.handle(&request("GET_CONFIGURATION_FILE", json!({ "requestID": "m" }))).unwrap();
    assert_eq!(reply.action, ActionCode::ConfigurationFileState);
    assert!(!response(&reply).is_success());
}

#[test]
fn tracking_state_set_then_get() {
    let f = fixture();
    let reply = f
        .router
        .handle(&request("SET_TRACKING_STATE", json!({ "requestID": "t1", "cameraReversed": true })))
        .unwrap();
    assert_eq!(reply.action, ActionCode::TrackingState);
    let body: TrackingStateResponse = reply.content_as().unwrap();
    assert!(body.state.camera_reversed);

    let reply = f.router.handle(&request("GET_TRACKING_STATE", json!({ "requestID": "t2" }))).unwrap();
    let body: TrackingStateResponse = reply.content_as().unwrap();
    assert_eq!(body.response.request_id, "t2");
    assert!(body.state.camera_reversed);
    assert!(!body.state.allow_images);
}

#[test]
fn invalid_mask_is_rejected() {
    let f = fixture();
    let text = request(
        "SET_TRACKING_STATE",
        json!({ "requestID": "m", "mask": { "left": 0.7, "right": 0.5, "upper": 0.0, "lower": 0.0 } }),
    );
    let reply = f.router.handle(&text).unwrap();
    assert!(!response(&reply).is_success());
}

#[test]
fn service_status_reports_shared_health() {
    let f = fixture();
    let reply = f.router.handle(&request("REQUEST_SERVICE_STATUS", json!({ "requestID": "st" }))).unwrap();

    assert_eq!(reply.action, ActionCode::ServiceStatus);
    let body: ServiceStatus = reply.content_as().unwrap();
    assert_eq!(body.request_id, "st");
    assert_eq!(body.tracking_service_state, TrackingServiceState::Unavailable);
    assert_eq!(body.configuration_state, ConfigurationStatus::NotLoaded);
}

#[test]
fn bad_content_fails_with_request_id() {
    let f = fixture();
    let text = request("VERSION_HANDSHAKE", json!({ "requestID": "x", "apiVersion": 5 }));
    let reply = f.router.handle(&text).unwrap();
    let body = response(&reply);
    assert!(!body.is_success());
    assert_eq!(body.request_id, "x");
    assert_eq!(body.original_request, text);
}

#[test]
fn unusable_messages_are_dropped() {
    let f = fixture();
    let texts = [
        "not json".to_owned(),
        r#"{"content":{"requestID":"a"}}"#.to_owned(),
        request("TELEPORT", json!({ "requestID": "b" })),
        request("GET_TRACKING_STATE", json!({})),
        request("INPUT_ACTION", json!({ "requestID": "c" })),
    ];
    for text in &texts {
        assert!(f.router.handle(text).is_none(), "{text}");
    }
}
