//! Deterministic test harness for the handcursor pipeline.
//!
//! Scripted sensors produce hand frames that land exactly where a test
//! wants them on screen, recorders capture what the engine dispatches, and
//! in-memory clients stand in for WebSocket peers of the broadcast layer.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod recorder;
pub mod scenario;
pub mod sim_client;
pub mod sim_sensor;

pub use recorder::{ActionRecorder, ScriptedLoader};
pub use sim_client::MemoryClient;
pub use sim_sensor::{SimHand, SimSensor};
