//! Handcursor server runtime
//!
//! Hosts the interaction [`Engine`](handcursor_core::Engine) on a sensor
//! thread and serves its output to any number of WebSocket clients.
//!
//! # Components
//!
//! - [`broadcast`]: Open-connection set and non-blocking fan-out
//! - [`listener`]: WebSocket accept loop and per-socket tasks
//! - [`router`]: Request/response handling
//! - [`config_files`]: Configuration documents on disk
//! - [`watcher`]: Filesystem watch feeding the reload flag
//! - [`sensor`]: Frame sources for the sensor loop
//! - [`service`]: Sensor loop thread and process wiring

pub mod broadcast;
pub mod config_files;
pub mod error;
pub mod listener;
pub mod router;
pub mod sensor;
pub mod service;
pub mod watcher;

pub use broadcast::{
    BroadcastSubscriber, ClientConnection, ConnectionBroadcast, ConnectionId, ListenerHealth, OUTBOUND_CAPACITY,
};
pub use config_files::{ConfigFiles, FileLoader};
pub use error::{BroadcastError, ServerError};
pub use listener::{ListenerConfig, WsListener};
pub use router::{RequestRouter, RouterContext};
pub use sensor::{ChannelSource, FrameSource, ReplaySource, SensorHandle, SourcePoll, TrackingSettings};
pub use service::{SensorLoop, Service, ServiceConfig};
pub use watcher::ConfigWatcher;
