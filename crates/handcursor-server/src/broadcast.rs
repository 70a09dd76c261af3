//! The open-connection set and fan-out to it.
//!
//! Sends never block: every [`ClientConnection`] is the sending half of a
//! bounded channel drained by that socket's writer task. A send that finds
//! the channel closed, full, or the connection marked closed removes the
//! connection and moves on. A client that stops reading therefore costs at
//! most [`OUTBOUND_CAPACITY`] queued messages before it is dropped.
//!
//! The set is guarded by a mutex that is only held to iterate or mutate the
//! map; no I/O happens under it.

use std::{
    collections::HashMap,
    fmt,
    sync::{
        Arc, Mutex, MutexGuard, PoisonError, Weak,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
};

use handcursor_core::ActionSubscriber;
use handcursor_proto::{
    Envelope, InputAction,
    payloads::presence::HandPresenceState,
};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, info, warn};

use crate::error::BroadcastError;

/// Messages queued for one client before it counts as stalled. Roughly ten
/// seconds of two-handed tracking.
pub const OUTBOUND_CAPACITY: usize = 2048;

/// Identifies one accepted socket for its lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Outbound side of one client socket.
///
/// Clones share the same channel and open flag.
#[derive(Debug, Clone)]
pub struct ClientConnection {
    outbound: mpsc::Sender<String>,
    open: Arc<AtomicBool>,
}

impl ClientConnection {
    /// A connection and the receiver its writer task drains, queueing up
    /// to [`OUTBOUND_CAPACITY`] messages.
    pub fn channel() -> (Self, mpsc::Receiver<String>) {
        Self::with_capacity(OUTBOUND_CAPACITY)
    }

    /// As [`ClientConnection::channel`] with an explicit queue bound.
    pub fn with_capacity(capacity: usize) -> (Self, mpsc::Receiver<String>) {
        let (outbound, receiver) = mpsc::channel(capacity.max(1));
        (Self { outbound, open: Arc::new(AtomicBool::new(true)) }, receiver)
    }

    /// Whether sends can still reach the socket.
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire) && !self.outbound.is_closed()
    }

    /// Mark the connection closed. The next send to it fails.
    pub fn close(&self) {
        self.open.store(false, Ordering::Release);
    }

    fn send(&self, text: String) -> bool {
        if !self.is_open() {
            return false;
        }
        match self.outbound.try_send(text) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!("client is not reading, outbound queue full");
                self.close();
                false
            },
            Err(TrySendError::Closed(_)) => false,
        }
    }
}

/// The socket listener, as seen by the broadcast layer.
pub trait ListenerHealth: Send + Sync {
    /// Whether the accept loop is running.
    fn is_accepting(&self) -> bool;

    /// Recreate the accept loop. Must not block.
    fn restart(&self);
}

/// Tracks open client connections and delivers messages to them.
pub struct ConnectionBroadcast {
    connections: Mutex<HashMap<ConnectionId, ClientConnection>>,
    next_id: AtomicU64,
    listener: Mutex<Option<Weak<dyn ListenerHealth>>>,
}

impl fmt::Debug for ConnectionBroadcast {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionBroadcast").field("connections", &self.len()).finish_non_exhaustive()
    }
}

impl Default for ConnectionBroadcast {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionBroadcast {
    /// Empty set with no listener attached.
    pub fn new() -> Self {
        Self {
            connections: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            listener: Mutex::new(None),
        }
    }

    /// Watch `listener` and restart it when it stops accepting.
    pub fn attach_listener(&self, listener: Weak<dyn ListenerHealth>) {
        *self.listener.lock().unwrap_or_else(PoisonError::into_inner) = Some(listener);
    }

    /// Register a connection.
    pub fn add_connection(&self, connection: ClientConnection) -> ConnectionId {
        let id = ConnectionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let total = {
            let mut connections = self.lock();
            connections.insert(id, connection);
            connections.len()
        };
        info!(%id, total, "connection added");
        id
    }

    /// Forget a connection. Returns whether it was registered.
    pub fn remove_connection(&self, id: ConnectionId) -> bool {
        let removed = self.lock().remove(&id);
        if let Some(connection) = &removed {
            connection.close();
            debug!(%id, "connection removed");
        }
        removed.is_some()
    }

    /// Number of registered connections.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether no connections are registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `id` is registered.
    pub fn contains(&self, id: ConnectionId) -> bool {
        self.lock().contains_key(&id)
    }

    /// Send `message` to one connection. A closed connection is removed.
    pub fn send(&self, id: ConnectionId, message: &Envelope) -> Result<(), BroadcastError> {
        let text = message.encode()?;
        self.send_text(id, text)
    }

    /// Send pre-encoded text to one connection.
    pub fn send_text(&self, id: ConnectionId, text: String) -> Result<(), BroadcastError> {
        let mut connections = self.lock();
        let connection = connections.get(&id).ok_or(BroadcastError::Unknown(id))?;
        if connection.send(text) {
            return Ok(());
        }
        connections.remove(&id);
        drop(connections);
        debug!(%id, "send to closed connection, removed");
        Err(BroadcastError::Closed(id))
    }

    /// Send `message` to every open connection, returning how many it
    /// reached. Connections that fail are removed.
    pub fn broadcast(&self, message: &Envelope) -> Result<usize, BroadcastError> {
        self.check_listener();
        let text = message.encode()?;

        let mut dropped = Vec::new();
        let delivered = {
            let mut connections = self.lock();
            connections.retain(|id, connection| {
                let ok = connection.send(text.clone());
                if !ok {
                    dropped.push(*id);
                }
                ok
            });
            connections.len()
        };
        for id in dropped {
            debug!(%id, "broadcast to closed connection, removed");
        }
        Ok(delivered)
    }

    /// Broadcast one input action.
    pub fn broadcast_action(&self, action: &InputAction) -> Result<usize, BroadcastError> {
        self.broadcast(&Envelope::input_action(action)?)
    }

    /// Broadcast a presence change.
    pub fn broadcast_presence(&self, state: HandPresenceState) -> Result<usize, BroadcastError> {
        self.broadcast(&Envelope::hand_presence(state)?)
    }

    fn check_listener(&self) {
        let listener = self
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .and_then(Weak::upgrade);
        if let Some(listener) = listener {
            if !listener.is_accepting() {
                warn!("listener stopped accepting, restarting");
                listener.restart();
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<ConnectionId, ClientConnection>> {
        self.connections.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Subscriber that broadcasts every action it receives.
#[derive(Debug, Clone)]
pub struct BroadcastSubscriber(pub Arc<ConnectionBroadcast>);

impl ActionSubscriber for BroadcastSubscriber {
    fn on_action(&mut self, action: &InputAction) {
        if let Err(error) = self.0.broadcast_action(action) {
            warn!(%error, "failed to broadcast input action");
        }
    }
}
