//! In-memory stand-ins for WebSocket clients.

use handcursor_proto::{ActionCode, Envelope, InputAction};
use handcursor_server::{ClientConnection, ConnectionBroadcast, ConnectionId};
use tokio::sync::mpsc::{Receiver, error::TryRecvError};

/// A client registered directly with a [`ConnectionBroadcast`].
///
/// Receives exactly what a socket writer task would have written.
#[derive(Debug)]
pub struct MemoryClient {
    id: ConnectionId,
    connection: ClientConnection,
    inbox: Option<Receiver<String>>,
}

impl MemoryClient {
    /// Register a new client with `broadcast`.
    pub fn connect(broadcast: &ConnectionBroadcast) -> Self {
        let (connection, inbox) = ClientConnection::channel();
        let id = broadcast.add_connection(connection.clone());
        Self { id, connection, inbox: Some(inbox) }
    }

    /// Id assigned by the broadcast layer.
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Simulate the socket dying: the writer's receiver is gone, so the
    /// next send to this client fails.
    pub fn kill(&mut self) {
        self.inbox = None;
    }

    /// Simulate a close handshake: the connection is flagged closed but
    /// still registered until a send notices.
    pub fn close(&self) {
        self.connection.close();
    }

    /// Raw messages received since the last call.
    pub fn received_text(&mut self) -> Vec<String> {
        let Some(inbox) = self.inbox.as_mut() else {
            return Vec::new();
        };
        let mut messages = Vec::new();
        loop {
            match inbox.try_recv() {
                Ok(text) => messages.push(text),
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => return messages,
            }
        }
    }

    /// Decoded envelopes received since the last call. Undecodable text
    /// is skipped.
    pub fn received(&mut self) -> Vec<Envelope> {
        self.received_text().iter().filter_map(|text| Envelope::decode(text).ok()).collect()
    }

    /// Input actions received since the last call.
    pub fn input_actions(&mut self) -> Vec<InputAction> {
        self.received()
            .into_iter()
            .filter(|envelope| envelope.action == ActionCode::InputAction)
            .filter_map(|envelope| envelope.content_as().ok())
            .collect()
    }
}
