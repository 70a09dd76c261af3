//! Wire format for the handcursor interaction service.
//!
//! Every message on the socket is a JSON envelope of the form
//! `{ "action": <ActionCode>, "content": { ... } }`. The server pushes
//! [`InputAction`]s and hand presence events to every client, and answers
//! request envelopes (configuration, tracking state, handshake, status) with
//! a response envelope that echoes the caller's `requestID`.
//!
//! This crate only describes the wire shapes. It performs no I/O and knows
//! nothing about how configuration is stored or applied; configuration
//! documents travel as opaque JSON objects so the schema can live next to
//! the code that interprets it.
#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod action;
pub mod envelope;
pub mod errors;
pub mod input;
pub mod payloads;

pub use action::ActionCode;
pub use envelope::Envelope;
pub use errors::{ProtocolError, Result};
pub use input::{Chirality, HandType, InputAction, InputType, InteractionType, Vector2};

/// Default TCP port the service listens on.
pub const DEFAULT_PORT: u16 = 9739;

/// Default WebSocket endpoint path.
pub const DEFAULT_PATH: &str = "/connect";

/// Protocol version implemented by this crate (`major.minor.patch`).
pub const API_VERSION: &str = "1.4.0";
