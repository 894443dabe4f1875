//! TCP listener and per-connection handlers.
//!
//! Each accepted connection gets a reader task (this module's
//! [`handle_connection`]) and a writer task draining the connection's
//! [`Outbox`]. Handlers share one [`Session`] behind a mutex; the lock is held
//! for a single command's validate-and-mutate step and released before any
//! envelope is sent.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::codec;
use crate::config::{ServerConfig, OUTBOX_CAPACITY};
use crate::protocol::Envelope;
use crate::session::{ConnectionId, Delivery, Outbox, Recipient, Session};
use crate::transport::{self, FrameSink, FrameSource};

const WELCOME: &str = "Welcome to the Battleship server! Send 'join' to take a seat.";

/// State shared by every connection handler.
pub struct Shared {
    session: Mutex<Session>,
    next_connection: AtomicU64,
    games: AtomicU64,
    config: ServerConfig,
}

impl Shared {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            session: Mutex::new(Session::new(config.seed)),
            next_connection: AtomicU64::new(1),
            games: AtomicU64::new(0),
            config,
        }
    }

    /// Exclusive access to the current session.
    pub fn lock(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn next_connection_id(&self) -> ConnectionId {
        self.next_connection.fetch_add(1, Ordering::Relaxed)
    }

    /// Discard a session nobody is seated in and start a fresh one.
    fn reset_if_vacant(&self, session: &mut Session) {
        if session.is_vacant() && session.phase() != crate::session::Phase::AwaitingPlayers {
            let game = self.games.fetch_add(1, Ordering::Relaxed) + 1;
            let seed = self.config.seed.map(|s| s.wrapping_add(game));
            *session = Session::new(seed);
            log::info!("session reset, ready for game {}", game + 1);
        }
    }
}

pub struct Server {
    listener: TcpListener,
    shared: Arc<Shared>,
}

impl Server {
    pub async fn bind(config: ServerConfig) -> anyhow::Result<Self> {
        let listener = TcpListener::bind(&config.bind).await?;
        Ok(Self {
            listener,
            shared: Arc::new(Shared::new(config)),
        })
    }

    pub fn local_addr(&self) -> anyhow::Result<std::net::SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn shared(&self) -> Arc<Shared> {
        self.shared.clone()
    }

    /// Accept connections until the listener fails.
    pub async fn run(self) -> anyhow::Result<()> {
        log::info!("listening on {}", self.listener.local_addr()?);
        loop {
            let (stream, addr) = self.listener.accept().await?;
            if let Err(e) = stream.set_nodelay(true) {
                log::debug!("set_nodelay failed for {}: {}", addr, e);
            }
            log::info!("accepted connection from {}", addr);
            let shared = self.shared.clone();
            tokio::spawn(handle_connection(stream, addr.to_string(), shared));
        }
    }
}

/// Drive one connection until it closes.
pub async fn handle_connection<S>(stream: S, peer: String, shared: Arc<Shared>)
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    let (reader, writer) = transport::split(stream);
    let mut reader = reader.with_idle_timeout(shared.config.idle_timeout);
    let conn = shared.next_connection_id();
    let (outbox, outbox_rx) = mpsc::channel(OUTBOX_CAPACITY);
    let (closed_tx, mut closed) = watch::channel(false);
    let writer_task = spawn_writer(writer, outbox_rx, closed_tx, peer.clone());

    let admitted = shared.lock().can_admit();
    if !admitted {
        log::info!("rejecting {} (conn {}): no free seat", peer, conn);
        let _ = outbox
            .send(Envelope::ThirdClient {
                message: "Two players are already in this game. Connection closed.".to_string(),
            })
            .await;
        drop(outbox);
        let _ = writer_task.await;
        return;
    }
    let _ = outbox.send(Envelope::info(WELCOME)).await;

    loop {
        let frame = tokio::select! {
            frame = reader.next_frame() => frame,
            _ = closed.changed() => break,
        };
        let line = match frame {
            Ok(Some(line)) => line,
            Ok(None) => {
                log::info!("{} (conn {}) closed the connection", peer, conn);
                break;
            }
            Err(e) => {
                log::warn!("{} (conn {}): {}", peer, conn, e);
                break;
            }
        };
        let envelope = match codec::decode(&line) {
            Ok(envelope) => envelope,
            Err(e) => {
                log::warn!("protocol error from {} (conn {}): {}", peer, conn, e);
                if outbox.send(Envelope::error(e.to_string())).await.is_err() {
                    break;
                }
                continue;
            }
        };
        log::debug!("conn {} -> {}", conn, envelope.type_tag());

        let routed = {
            let mut session = shared.lock();
            let deliveries = session.handle(conn, &outbox, envelope);
            let routed = route(&session, &outbox, deliveries);
            shared.reset_if_vacant(&mut session);
            routed
        };
        deliver(routed).await;
    }

    // Implicit quit: release the seat and tell the opponent.
    let routed = {
        let mut session = shared.lock();
        let deliveries = session.leave(conn, false);
        let routed = route(&session, &outbox, deliveries);
        shared.reset_if_vacant(&mut session);
        routed
    };
    deliver(routed).await;
    drop(outbox);
    let _ = writer_task.await;
    log::info!("connection with {} (conn {}) closed", peer, conn);
}

/// Resolve each delivery to a concrete outbox. Runs under the session lock.
fn route(session: &Session, requester: &Outbox, deliveries: Vec<Delivery>) -> Vec<(Outbox, Envelope)> {
    deliveries
        .into_iter()
        .filter_map(|d| {
            let outbox = match d.to {
                Recipient::Requester => Some(requester.clone()),
                Recipient::Player(slot) => session.outbox(slot).cloned(),
            };
            outbox.map(|o| (o, d.envelope))
        })
        .collect()
}

async fn deliver(routed: Vec<(Outbox, Envelope)>) {
    for (outbox, envelope) in routed {
        if outbox.send(envelope).await.is_err() {
            log::debug!("dropping envelope for a connection that already closed");
        }
    }
}

/// Writes queued envelopes until the queue closes or a terminal envelope
/// has gone out, then shuts the socket's write side and flags `closed`.
fn spawn_writer<W>(
    mut writer: W,
    mut outbox_rx: mpsc::Receiver<Envelope>,
    closed: watch::Sender<bool>,
    peer: String,
) -> JoinHandle<()>
where
    W: FrameSink + 'static,
{
    tokio::spawn(async move {
        while let Some(envelope) = outbox_rx.recv().await {
            if let Err(e) = writer.send(&envelope).await {
                log::warn!("write to {} failed: {}", peer, e);
                break;
            }
            if envelope.is_terminal() {
                break;
            }
        }
        if let Err(e) = writer.shutdown().await {
            log::debug!("shutdown of {} failed: {}", peer, e);
        }
        let _ = closed.send(true);
    })
}
