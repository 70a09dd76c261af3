//! Handcursor core logic
//!
//! Turns noisy 3-D hand-tracking frames into a stable stream of discrete
//! [`InputAction`](handcursor_proto::InputAction)s. Everything here is a
//! deterministic state machine: time comes from sensor timestamps, I/O is
//! injected through traits, and the per-tick path never blocks.
//!
//! # Components
//!
//! - [`hand`]: Hand and frame model delivered by the sensor collaborator
//! - [`stabiliser`]: Velocity-weighted smoothing and deadzoning
//! - [`screen`]: Projection of sensor-space points onto the screen
//! - [`positioning`]: Tracked-point selection and per-hand positions
//! - [`interaction`]: Push, touch plane, hover-and-hold and grab classifiers
//! - [`plugin`]: Ordered action filters applied before dispatch
//! - [`dispatch`]: Role- and chirality-scoped subscriber channels
//! - [`roles`]: Primary/secondary hand assignment
//! - [`config`]: Configuration schema, live store and reload signalling
//! - [`status`]: Service health shared with request handlers
//! - [`engine`]: Per-tick orchestration of all of the above

pub mod config;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod hand;
pub mod interaction;
pub mod plugin;
pub mod positioning;
pub mod roles;
pub mod screen;
pub mod stabiliser;
pub mod status;

pub use config::{ConfigBundle, ConfigLoader, ConfigSnapshot, DirtyFlag, InteractionConfig, PhysicalConfig};
pub use dispatch::{ActionSubscriber, Channel, InteractionManager};
pub use engine::{Engine, EngineAction, EngineCommand};
pub use error::ConfigError;
pub use hand::{Finger, Hand, HandFrame, SensorEvent};
pub use interaction::{InteractionClassifier, classifier_for};
pub use plugin::{InteractionZone, Plugin, PluginChain};
pub use positioning::{Positions, PositioningModule, TrackedPosition};
pub use roles::{HandRoles, RoleEvent};
pub use screen::ScreenMapper;
pub use stabiliser::PositionStabiliser;
pub use status::SharedStatus;
