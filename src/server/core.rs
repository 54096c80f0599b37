//! Core server implementation.
//!
//! [`Server`] is the lifecycle coordinator: `start()` binds the listener
//! and launches the accept supervisor plus one orchestration task;
//! `stop()` delivers a single stop request and hands back a completion
//! handle for the full top-down shutdown.
//!
//! # Shutdown Ordering
//!
//! Shutdown is strictly top-down. On a stop request the orchestration task:
//!
//! 1. waits for the accept supervisor to finish (the listener is owned by
//!    that task, so its exit closes the port — no new connections can
//!    arrive past this point),
//! 2. discards connections that were accepted but never registered,
//! 3. issues `close()` to every registered client and waits for every
//!    worker's done latch (each worker runs its disconnect callback and
//!    deregisters before that latch fires),
//! 4. resets the lifecycle phase and fires the *stopped* latch.
//!
//! There is no shutdown timeout: stop waits indefinitely for every worker
//! to acknowledge.

// ============================================================================
// Imports
// ============================================================================

use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::future::join_all;
use parking_lot::Mutex;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_rustls::TlsAcceptor;
use tracing::{debug, info, warn};

use crate::client::Client;
use crate::error::{Error, Result};
use crate::handler::ServerHandler;
use crate::server::accept::{self, InboundConnection};
use crate::server::builder::ServerBuilder;
use crate::server::registry::ClientRegistry;
use crate::server::worker;
use crate::signal::{Completion, Latch};

// ============================================================================
// Lifecycle Phase
// ============================================================================

/// Lifecycle phase, guarded by one lock.
enum Phase {
    /// Constructed, or fully stopped. `start()` is permitted.
    Idle,
    /// Accept supervisor and orchestration task are live.
    Running(RunState),
}

/// Signals for one start/stop cycle. Recreated on every `start()`.
#[derive(Clone)]
struct RunState {
    /// Fired once the orchestration task is serving.
    started: Latch,
    /// Fired by `stop()`; observed by the orchestrator and accept loop.
    stop: Latch,
    /// Fired when shutdown has fully completed.
    stopped: Latch,
    /// Address the listener actually bound (resolves port 0).
    local_addr: SocketAddr,
}

// ============================================================================
// Server
// ============================================================================

/// Delimiter-framed packet server.
///
/// Construct via [`Server::builder()`]. Cloning is cheap and all clones
/// control the same underlying server.
///
/// A server is restartable: after a `stop()` cycle completes, `start()`
/// may be called again. Client ids remain unique across cycles.
///
/// # Example
///
/// ```no_run
/// use packetsvr::{Result, Server};
///
/// # async fn example() -> Result<()> {
/// let server = Server::builder()
///     .address("127.0.0.1:9999")
///     .on_message(|client, message| {
///         println!("{client}: {message}");
///     })
///     .build()?;
///
/// server.start().await?.wait().await;
/// // ... serve ...
/// server.stop()?.wait().await;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Server {
    inner: Arc<ServerInner>,
}

struct ServerInner {
    /// Bind address, resolved at `start()`.
    address: String,
    /// Message delimiter byte.
    delimiter: u8,
    /// Event hooks.
    handler: Arc<dyn ServerHandler>,
    /// TLS acceptor, when an identity was configured.
    tls: Option<TlsAcceptor>,
    /// Live clients and the id generator.
    registry: Arc<ClientRegistry>,
    /// Lifecycle phase.
    lifecycle: Mutex<Phase>,
}

// ============================================================================
// Server - Construction
// ============================================================================

impl Server {
    /// Returns a builder for configuring a server.
    #[inline]
    #[must_use]
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }

    /// Assembles a server from validated builder output.
    pub(crate) fn from_parts(
        address: String,
        delimiter: u8,
        handler: Arc<dyn ServerHandler>,
        tls: Option<TlsAcceptor>,
    ) -> Self {
        Self {
            inner: Arc::new(ServerInner {
                address,
                delimiter,
                handler,
                tls,
                registry: Arc::new(ClientRegistry::new()),
                lifecycle: Mutex::new(Phase::Idle),
            }),
        }
    }
}

// ============================================================================
// Server - Lifecycle
// ============================================================================

impl Server {
    /// Starts the server.
    ///
    /// Binds the configured address, launches the accept supervisor and
    /// the orchestration task, and returns a [`Completion`] that resolves
    /// once the server is fully serving.
    ///
    /// Cancel-safe: no lifecycle state is held across the bind await, so
    /// dropping the returned future mid-start leaves the server idle and
    /// startable.
    ///
    /// # Errors
    ///
    /// - [`Error::AlreadyRunning`] if the server is not idle; no state is
    ///   touched.
    /// - [`Error::Bind`] if the address cannot be resolved or bound; the
    ///   server returns to idle.
    pub async fn start(&self) -> Result<Completion> {
        if !matches!(*self.inner.lifecycle.lock(), Phase::Idle) {
            return Err(Error::AlreadyRunning);
        }

        let bound = async {
            let listener = TcpListener::bind(&self.inner.address).await?;
            let local_addr = listener.local_addr()?;
            Ok::<_, std::io::Error>((listener, local_addr))
        }
        .await;

        let (listener, local_addr) = match bound {
            Ok(bound) => bound,
            Err(e) => return Err(Error::bind(&self.inner.address, e)),
        };

        let run = RunState {
            started: Latch::new(),
            stop: Latch::new(),
            stopped: Latch::new(),
            local_addr,
        };
        let started = run.started.completion();

        // Claim the lifecycle only now that the bind has succeeded. If a
        // racing start() claimed it first, this listener is simply dropped.
        {
            let mut phase = self.inner.lifecycle.lock();
            match *phase {
                Phase::Idle => *phase = Phase::Running(run.clone()),
                _ => return Err(Error::AlreadyRunning),
            }
        }

        let (conn_tx, conn_rx) = mpsc::unbounded_channel();
        let accept_done = Latch::new();
        tokio::spawn(accept::run(
            listener,
            self.inner.tls.clone(),
            conn_tx,
            run.stop.clone(),
            accept_done.clone(),
        ));
        tokio::spawn(Self::orchestrate(
            Arc::clone(&self.inner),
            conn_rx,
            accept_done,
            run,
        ));

        Ok(started)
    }

    /// Stops the server.
    ///
    /// Delivers the stop request (at most once, no matter how many callers
    /// race here) and returns a [`Completion`] that resolves only after
    /// the listener is closed, every client worker has terminated, and the
    /// server is idle again.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotRunning`] if the server is not running; no
    /// state is touched.
    pub fn stop(&self) -> Result<Completion> {
        let (stop, stopped) = {
            let phase = self.inner.lifecycle.lock();
            match &*phase {
                Phase::Running(run) => (run.stop.clone(), run.stopped.completion()),
                _ => return Err(Error::NotRunning),
            }
        };

        if stop.fire() {
            info!("stop requested");
        }
        Ok(stopped)
    }

    /// Returns `true` while the server is running.
    #[inline]
    #[must_use]
    pub fn is_running(&self) -> bool {
        matches!(&*self.inner.lifecycle.lock(), Phase::Running(_))
    }

    /// Returns the bound address while the server is running.
    #[must_use]
    pub fn local_addr(&self) -> Option<SocketAddr> {
        match &*self.inner.lifecycle.lock() {
            Phase::Running(run) => Some(run.local_addr),
            _ => None,
        }
    }

    /// Returns the number of currently connected clients.
    #[inline]
    #[must_use]
    pub fn client_count(&self) -> usize {
        self.inner.registry.len()
    }
}

// ============================================================================
// Server - Broadcast
// ============================================================================

impl Server {
    /// Sends a text message to every connected client, best-effort.
    ///
    /// Per-recipient failures are logged and skipped; a client that
    /// disconnects while the broadcast iterates simply fails its send.
    pub async fn send_all(&self, message: &str) {
        self.send_bytes_all(message.as_bytes()).await;
    }

    /// Sends raw bytes to every connected client, best-effort.
    pub async fn send_bytes_all(&self, payload: &[u8]) {
        for client in self.inner.registry.clients() {
            if let Err(e) = client.send_bytes(payload).await {
                warn!(client = %client, error = %e, "broadcast send failed");
            }
        }
    }
}

// ============================================================================
// Server - Orchestration
// ============================================================================

impl Server {
    /// Top-level orchestration task for one start/stop cycle.
    async fn orchestrate(
        inner: Arc<ServerInner>,
        mut conn_rx: mpsc::UnboundedReceiver<InboundConnection>,
        accept_done: Latch,
        run: RunState,
    ) {
        run.started.fire();
        info!(addr = %run.local_addr, "server started");

        let mut accept_gone = false;
        loop {
            tokio::select! {
                inbound = conn_rx.recv(), if !accept_gone => match inbound {
                    Some(inbound) => inner.spawn_client(inbound),
                    None => {
                        // Permanent accept failure without a stop request:
                        // only the accept loop terminates. Existing clients
                        // keep running until stop().
                        warn!("accept loop terminated; no longer accepting connections");
                        accept_gone = true;
                    }
                },

                _ = run.stop.fired() => break,
            }
        }

        debug!("shutdown: waiting for accept loop");
        accept_done.completion().wait().await;

        // Anything still queued was accepted before the listener closed but
        // never registered; dropping it closes the socket.
        while let Ok(inbound) = conn_rx.try_recv() {
            debug!(
                remote = %inbound.remote_addr,
                "discarding connection accepted during shutdown"
            );
        }

        let clients = inner.registry.clients();
        debug!(count = clients.len(), "shutdown: closing clients");
        let closed: Vec<_> = clients.iter().map(|client| client.close()).collect();
        join_all(closed.into_iter().map(Completion::wait)).await;

        *inner.lifecycle.lock() = Phase::Idle;
        run.stopped.fire();
        info!("server stopped");
    }
}

impl ServerInner {
    /// Registers a newly accepted connection and spawns its worker.
    fn spawn_client(&self, inbound: InboundConnection) {
        let id = self.registry.next_id();
        let client = Arc::new(Client::new(
            id,
            self.delimiter,
            inbound.writer,
            inbound.remote_addr,
            inbound.local_addr,
        ));
        self.registry.insert(Arc::clone(&client));

        tokio::spawn(worker::run(
            client,
            inbound.reader,
            self.delimiter,
            Arc::clone(&self.handler),
            Arc::clone(&self.registry),
        ));
    }
}

// ============================================================================
// Tests
// ============================================================================
