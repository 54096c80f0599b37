//! Server event hooks.
//!
//! The server reports three events per client: connect, message, and
//! disconnect. Callers can either implement [`ServerHandler`] (all methods
//! default to no-ops, so implement only what you need) or assemble a
//! [`Callbacks`] value from plain closures.
//!
//! # Ordering
//!
//! For any one client the worker task invokes the hooks strictly in order:
//! `on_connect`, then zero or more `on_message`, then exactly one
//! `on_disconnect`. Hooks for different clients run concurrently on their
//! own worker tasks.
//!
//! # Example
//!
//! ```no_run
//! use packetsvr::Server;
//!
//! # fn example() -> packetsvr::Result<()> {
//! let server = Server::builder()
//!     .address("127.0.0.1:9999")
//!     .on_message(|client, message| {
//!         println!("{client}: {message}");
//!     })
//!     .build()?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use async_trait::async_trait;

use crate::client::Client;

// ============================================================================
// ServerHandler
// ============================================================================

/// Capability interface for server events.
///
/// All methods default to no-ops. Handlers run on the worker task of the
/// client that produced the event; a handler that blocks stalls only that
/// client (and, during shutdown, the final phase of `stop()`).
#[async_trait]
pub trait ServerHandler: Send + Sync {
    /// Called once when a client connects, before any messages.
    async fn on_connect(&self, client: &Arc<Client>) {
        let _ = client;
    }

    /// Called for each delimiter-terminated message, delimiter stripped.
    ///
    /// Non-UTF-8 bytes are replaced with U+FFFD during decoding.
    async fn on_message(&self, client: &Arc<Client>, message: &str) {
        let _ = (client, message);
    }

    /// Called exactly once when a client disconnects, for any cause.
    ///
    /// Do not expect the connection to still be writable here.
    async fn on_disconnect(&self, client: &Arc<Client>) {
        let _ = client;
    }
}

// ============================================================================
// Hook Types
// ============================================================================

/// Connect hook callback type.
pub type ConnectHook = Box<dyn Fn(&Arc<Client>) + Send + Sync>;

/// Message hook callback type.
pub type MessageHook = Box<dyn Fn(&Arc<Client>, &str) + Send + Sync>;

/// Disconnect hook callback type.
pub type DisconnectHook = Box<dyn Fn(&Arc<Client>) + Send + Sync>;

// ============================================================================
// Callbacks
// ============================================================================

/// Closure-based [`ServerHandler`].
///
/// Every slot is optional; unset slots are no-ops. This is the adapter
/// behind the `on_connect`/`on_message`/`on_disconnect` builder methods.
/// The setters are named `*_hook` so they never shadow the trait methods
/// on a concrete `Callbacks` value.
#[derive(Default)]
pub struct Callbacks {
    connect: Option<ConnectHook>,
    message: Option<MessageHook>,
    disconnect: Option<DisconnectHook>,
}

impl Callbacks {
    /// Creates an empty callback set where every event is a no-op.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the connect hook.
    #[must_use]
    pub fn connect_hook(mut self, hook: impl Fn(&Arc<Client>) + Send + Sync + 'static) -> Self {
        self.connect = Some(Box::new(hook));
        self
    }

    /// Sets the message hook.
    #[must_use]
    pub fn message_hook(
        mut self,
        hook: impl Fn(&Arc<Client>, &str) + Send + Sync + 'static,
    ) -> Self {
        self.message = Some(Box::new(hook));
        self
    }

    /// Sets the disconnect hook.
    #[must_use]
    pub fn disconnect_hook(mut self, hook: impl Fn(&Arc<Client>) + Send + Sync + 'static) -> Self {
        self.disconnect = Some(Box::new(hook));
        self
    }
}

#[async_trait]
impl ServerHandler for Callbacks {
    async fn on_connect(&self, client: &Arc<Client>) {
        if let Some(hook) = &self.connect {
            hook(client);
        }
    }

    async fn on_message(&self, client: &Arc<Client>, message: &str) {
        if let Some(hook) = &self.message {
            hook(client, message);
        }
    }

    async fn on_disconnect(&self, client: &Arc<Client>) {
        if let Some(hook) = &self.disconnect {
            hook(client);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
