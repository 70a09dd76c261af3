//! WebSocket accept loop and per-connection tasks.
//!
//! Each accepted socket gets two tasks: a reader that routes requests and
//! queues replies, and a writer that drains the connection's outbound
//! channel. Broadcasts from the sensor thread only ever touch the channel.
//!
//! The listener registers itself with the [`ConnectionBroadcast`] so a
//! stopped accept loop is noticed on the next broadcast and recreated on
//! the same address.

use std::{
    io,
    net::SocketAddr,
    sync::{
        Arc, Mutex, PoisonError, Weak,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use futures::{SinkExt, StreamExt};
use tokio::{
    net::{TcpListener, TcpStream},
    runtime::Handle,
    sync::{Notify, watch},
};
use tokio_tungstenite::{
    accept_hdr_async,
    tungstenite::{
        Message,
        handshake::server::{ErrorResponse, Request, Response},
        http::StatusCode,
    },
};
use tracing::{debug, error, info, warn};

use crate::{
    broadcast::{ClientConnection, ConnectionBroadcast, ConnectionId, ListenerHealth},
    error::ServerError,
    router::RequestRouter,
};

/// How long a closing connection may spend flushing queued messages.
const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

/// Where to listen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenerConfig {
    /// Interface to bind.
    pub host: String,
    /// TCP port; 0 picks a free one.
    pub port: u16,
    /// Request path clients must upgrade on.
    pub path: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: handcursor_proto::DEFAULT_PORT,
            path: handcursor_proto::DEFAULT_PATH.into(),
        }
    }
}

/// The WebSocket server.
pub struct WsListener {
    this: Weak<WsListener>,
    path: String,
    broadcast: Arc<ConnectionBroadcast>,
    router: Arc<RequestRouter>,
    runtime: Handle,
    local_addr: Mutex<SocketAddr>,
    accepting: AtomicBool,
    restarting: AtomicBool,
    shutdown: watch::Sender<bool>,
    /// Ends the current accept loop without shutting down.
    halt: Notify,
}

impl std::fmt::Debug for WsListener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WsListener")
            .field("local_addr", &self.local_addr())
            .field("path", &self.path)
            .field("accepting", &self.accepting.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl WsListener {
    /// Bind `config` and start accepting on the current runtime.
    pub async fn bind(
        config: &ListenerConfig,
        broadcast: Arc<ConnectionBroadcast>,
        router: Arc<RequestRouter>,
    ) -> Result<Arc<Self>, ServerError> {
        let addr = format!("{}:{}", config.host, config.port);
        let socket = TcpListener::bind(&addr)
            .await
            .map_err(|source| ServerError::Bind { addr: addr.clone(), source })?;
        let local_addr = socket.local_addr()?;

        let (shutdown, _) = watch::channel(false);
        let listener = Arc::new_cyclic(|this| Self {
            this: this.clone(),
            path: config.path.clone(),
            broadcast: Arc::clone(&broadcast),
            router,
            runtime: Handle::current(),
            local_addr: Mutex::new(local_addr),
            accepting: AtomicBool::new(false),
            restarting: AtomicBool::new(false),
            shutdown,
            halt: Notify::new(),
        });

        let health: Arc<dyn ListenerHealth> = listener.clone();
        broadcast.attach_listener(Arc::downgrade(&health));

        info!(%local_addr, path = %config.path, "listening");
        listener.start_accepting(socket);
        Ok(listener)
    }

    /// Address the socket is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        *self.local_addr.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Stop accepting. Open connections are closed by their peers or when
    /// the runtime stops.
    pub fn shutdown(&self) {
        self.shutdown.send_replace(true);
    }

    /// Kill the accept loop as a fatal accept error would.
    #[cfg(test)]
    fn halt(&self) {
        self.halt.notify_one();
    }

    fn is_shut_down(&self) -> bool {
        *self.shutdown.borrow()
    }

    fn start_accepting(&self, socket: TcpListener) {
        let Some(this) = self.this.upgrade() else {
            return;
        };
        self.accepting.store(true, Ordering::Release);
        self.runtime.spawn(this.accept_loop(socket));
    }

    async fn accept_loop(self: Arc<Self>, socket: TcpListener) {
        let mut shutdown = self.shutdown.subscribe();
        loop {
            tokio::select! {
                _ = shutdown.wait_for(|stop| *stop) => break,
                () = self.halt.notified() => {
                    warn!("accept loop halted");
                    break;
                },
                accepted = socket.accept() => match accepted {
                    Ok((stream, peer)) => {
                        tokio::spawn(Arc::clone(&self).serve(stream, peer));
                    },
                    Err(error) if is_transient(&error) => {
                        debug!(%error, "transient accept error");
                    },
                    Err(error) => {
                        error!(%error, "accept failed, listener stopped");
                        break;
                    },
                },
            }
        }
        // Release the port before a restart can try to rebind it.
        drop(socket);
        self.accepting.store(false, Ordering::Release);
    }

    async fn serve(self: Arc<Self>, stream: TcpStream, peer: SocketAddr) {
        let path = self.path.clone();
        let check_path = move |request: &Request, response: Response| {
            if request.uri().path() == path {
                return Ok(response);
            }
            let mut rejection = ErrorResponse::new(Some(format!("no endpoint at {}", request.uri().path())));
            *rejection.status_mut() = StatusCode::NOT_FOUND;
            Err(rejection)
        };

        let socket = match accept_hdr_async(stream, check_path).await {
            Ok(socket) => socket,
            Err(error) => {
                debug!(%peer, %error, "websocket handshake rejected");
                return;
            },
        };

        let (connection, mut outbound) = ClientConnection::channel();
        let id = self.broadcast.add_connection(connection.clone());
        debug!(%id, %peer, "client connected");

        let (mut sink, mut incoming) = socket.split();
        let mut writer = tokio::spawn(async move {
            while let Some(text) = outbound.recv().await {
                if let Err(error) = sink.send(Message::Text(text)).await {
                    debug!(%id, %error, "write failed");
                    break;
                }
            }
            let _ = sink.close().await;
        });

        while let Some(message) = incoming.next().await {
            match message {
                Ok(Message::Text(text)) => {
                    if !self.reply(id, text).await {
                        break;
                    }
                },
                Ok(Message::Close(_)) => break,
                Ok(_) => {},
                Err(error) => {
                    debug!(%id, %error, "read failed");
                    break;
                },
            }
        }

        connection.close();
        self.broadcast.remove_connection(id);
        drop(connection);
        if tokio::time::timeout(WRITER_DRAIN_TIMEOUT, &mut writer).await.is_err() {
            writer.abort();
        }
        debug!(%id, "client disconnected");
    }

    /// Route one request and queue its reply. Returns `false` once the
    /// connection can no longer be written to.
    async fn reply(&self, id: ConnectionId, text: String) -> bool {
        let router = Arc::clone(&self.router);
        let reply = match tokio::task::spawn_blocking(move || router.handle(&text)).await {
            Ok(reply) => reply,
            Err(error) => {
                warn!(%id, %error, "request handler failed");
                None
            },
        };
        match reply {
            Some(reply) => match self.broadcast.send(id, &reply) {
                Ok(()) => true,
                Err(error) => {
                    debug!(%id, %error, "reply not delivered");
                    false
                },
            },
            None => true,
        }
    }
}

impl ListenerHealth for WsListener {
    fn is_accepting(&self) -> bool {
        self.accepting.load(Ordering::Acquire) || self.is_shut_down()
    }

    fn restart(&self) {
        if self.is_shut_down() || self.restarting.swap(true, Ordering::AcqRel) {
            return;
        }
        let Some(this) = self.this.upgrade() else {
            return;
        };
        let addr = self.local_addr();
        self.runtime.spawn(async move {
            match TcpListener::bind(addr).await {
                Ok(socket) => {
                    if let Ok(bound) = socket.local_addr() {
                        *this.local_addr.lock().unwrap_or_else(PoisonError::into_inner) = bound;
                    }
                    info!(%addr, "listener restarted");
                    this.start_accepting(socket);
                },
                Err(error) => error!(%addr, %error, "listener restart failed"),
            }
            this.restarting.store(false, Ordering::Release);
        });
    }
}

fn is_transient(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::Interrupted
            | io::ErrorKind::WouldBlock
            | io::ErrorKind::TimedOut
    )
}

#[cfg(test)]
mod tests {
    use std::{sync::mpsc, time::Instant};

    use handcursor_core::{ConfigBundle, ConfigSnapshot, DirtyFlag, SharedStatus};
    use handcursor_proto::{ActionCode, DEFAULT_PATH, Envelope, payloads::presence::HandPresenceState};
    use tokio_tungstenite::connect_async;

    use super::*;
    use crate::{config_files::ConfigFiles, router::RouterContext, sensor::TrackingSettings};

    const WAIT: Duration = Duration::from_secs(5);

    async fn eventually(what: &str, condition: impl Fn() -> bool) {
        let deadline = Instant::now() + WAIT;
        while !condition() {
            assert!(Instant::now() < deadline, "timed out waiting for {what}");
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn dead_accept_loop_is_rebound_without_dropping_clients() {
        let dir = tempfile::tempdir().unwrap();
        let (commands, _queue) = mpsc::channel();
        let router = Arc::new(RequestRouter::new(RouterContext {
            snapshot: ConfigSnapshot::new(ConfigBundle::default()),
            commands,
            files: Arc::new(ConfigFiles::new(dir.path())),
            dirty: DirtyFlag::new(),
            tracking: TrackingSettings::default(),
            status: SharedStatus::new(),
        }));
        let broadcast = Arc::new(ConnectionBroadcast::new());
        let config = ListenerConfig { host: "127.0.0.1".into(), port: 0, path: DEFAULT_PATH.into() };
        let listener = WsListener::bind(&config, Arc::clone(&broadcast), router).await.unwrap();
        let url = format!("ws://{}{DEFAULT_PATH}", listener.local_addr());

        let (mut first, _) = connect_async(url.as_str()).await.unwrap();
        eventually("first client", || broadcast.len() == 1).await;

        listener.halt();
        eventually("accept loop to stop", || !listener.is_accepting()).await;

        // The broadcast notices the dead loop, and still reaches the client.
        assert_eq!(broadcast.broadcast_presence(HandPresenceState::HandFound).unwrap(), 1);
        let message = tokio::time::timeout(WAIT, first.next()).await.unwrap().unwrap().unwrap();
        let envelope = Envelope::decode(message.to_text().unwrap()).unwrap();
        assert_eq!(envelope.action, ActionCode::HandPresenceEvent);

        eventually("listener restart", || listener.is_accepting()).await;
        let (_second, _) = connect_async(url.as_str()).await.unwrap();
        eventually("second client", || broadcast.len() == 2).await;

        listener.shutdown();
    }

    #[test]
    fn connection_level_errors_do_not_stop_the_listener() {
        assert!(is_transient(&io::Error::from(io::ErrorKind::ConnectionReset)));
        assert!(is_transient(&io::Error::from(io::ErrorKind::ConnectionAborted)));
        assert!(!is_transient(&io::Error::from(io::ErrorKind::PermissionDenied)));
    }

    #[test]
    fn default_config_uses_protocol_port_and_path() {
        let config = ListenerConfig::default();
        assert_eq!(config.port, 9739);
        assert_eq!(config.path, "/connect");
    }
}
