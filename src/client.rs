//! A single accepted client connection.
//!
//! A [`Client`] is created by the server when a connection is accepted and
//! lives until its worker task terminates. It owns the write half of the
//! transport; the read half belongs to the worker. Handles are shared as
//! `Arc<Client>` between the registry, the worker, and user callbacks.
//!
//! # Thread Safety
//!
//! `Client` is `Send + Sync`. Sends are serialized by an internal async
//! lock, so each `send` writes its frame as one unit relative to other
//! sends; beyond that, callers issuing concurrent sends on one client must
//! order them themselves.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::net::SocketAddr;

use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::trace;

use crate::error::{Error, Result};
use crate::identifiers::ClientId;
use crate::signal::{Completion, Latch};
use crate::stream::StreamWriter;

// ============================================================================
// Client
// ============================================================================

/// One accepted connection: identity, addresses, and the send side.
///
/// Obtained through [`ServerHandler`](crate::ServerHandler) callbacks; the
/// server never hands out owned `Client` values.
pub struct Client {
    /// Unique identifier assigned at registration.
    id: ClientId,
    /// Message delimiter appended to every outgoing send.
    delimiter: u8,
    /// Write half of the transport, serialized across sends.
    writer: Mutex<StreamWriter>,
    /// Peer address.
    remote_addr: SocketAddr,
    /// Local address of the accepted socket.
    local_addr: SocketAddr,
    /// Fired when close has been requested, by any path.
    stop: Latch,
    /// Fired when the worker has fully terminated.
    done: Latch,
}

impl Client {
    /// Creates a client around the write half of an accepted stream.
    pub(crate) fn new(
        id: ClientId,
        delimiter: u8,
        writer: StreamWriter,
        remote_addr: SocketAddr,
        local_addr: SocketAddr,
    ) -> Self {
        Self {
            id,
            delimiter,
            writer: Mutex::new(writer),
            remote_addr,
            local_addr,
            stop: Latch::new(),
            done: Latch::new(),
        }
    }

    /// Returns the client's unique identifier.
    #[inline]
    #[must_use]
    pub fn id(&self) -> ClientId {
        self.id
    }

    /// Returns the peer address.
    #[inline]
    #[must_use]
    pub fn remote_addr(&self) -> SocketAddr {
        self.remote_addr
    }

    /// Returns the local address of the accepted socket.
    #[inline]
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Sends a text message to the client, appending the delimiter.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionClosed`](crate::Error::ConnectionClosed)
    /// if the worker has already terminated, or
    /// [`Error::Io`](crate::Error::Io) if the write fails. A send failure
    /// affects only this call; the worker decides separately when the
    /// connection is dead.
    pub async fn send(&self, message: &str) -> Result<()> {
        self.send_bytes(message.as_bytes()).await
    }

    /// Sends raw bytes to the client, appending the delimiter.
    ///
    /// The payload must not contain the delimiter byte, or the peer will
    /// split it early; no escaping is performed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionClosed`](crate::Error::ConnectionClosed)
    /// if the worker has already terminated, or
    /// [`Error::Io`](crate::Error::Io) if the write fails.
    pub async fn send_bytes(&self, payload: &[u8]) -> Result<()> {
        if self.done.is_fired() {
            return Err(Error::ConnectionClosed);
        }

        let mut frame = Vec::with_capacity(payload.len() + 1);
        frame.extend_from_slice(payload);
        frame.push(self.delimiter);

        let mut writer = self.writer.lock().await;
        writer.write_all(&frame).await?;
        writer.flush().await?;

        trace!(client = %self, len = payload.len(), "message sent");
        Ok(())
    }

    /// Requests that this connection be closed.
    ///
    /// Idempotent. Returns immediately with a [`Completion`] that resolves
    /// once the worker has fully terminated: disconnect callback invoked,
    /// registry entry removed, transport shut down.
    pub fn close(&self) -> Completion {
        if self.stop.fire() {
            trace!(client = %self, "close requested");
        }
        self.done.completion()
    }

    /// Returns a handle resolving when the worker has fully terminated.
    #[inline]
    #[must_use]
    pub fn closed(&self) -> Completion {
        self.done.completion()
    }
}

// ============================================================================
// Worker-side Signals
// ============================================================================

impl Client {
    /// Waits for a close request. Cancel-safe; used by the worker's
    /// `select!` loop.
    pub(crate) async fn stop_requested(&self) {
        self.stop.fired().await;
    }

    /// Shuts down the write half of the transport.
    ///
    /// Called by the worker during teardown. Errors are ignored: the peer
    /// may already be gone.
    pub(crate) async fn shutdown_transport(&self) {
        let mut writer = self.writer.lock().await;
        let _ = writer.shutdown().await;
    }

    /// Marks the worker as fully terminated, waking `close()` waiters.
    pub(crate) fn mark_done(&self) {
        self.done.fire();
    }
}

// ============================================================================
// Display
// ============================================================================

impl fmt::Display for Client {
    /// Stable log identity: zero-padded id plus peer address.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.id, self.remote_addr)
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("id", &self.id)
            .field("remote_addr", &self.remote_addr)
            .field("local_addr", &self.local_addr)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================
