//! Delimiter-framed TCP/TLS packet server engine.
//!
//! This library accepts inbound stream connections, frames incoming bytes
//! into discrete messages at a single delimiter byte, and dispatches them
//! to caller-supplied handlers, while tracking every live connection so
//! the whole server can be started and stopped deterministically.
//!
//! # Architecture
//!
//! One long-lived task accepts connections, one orchestrates the server's
//! lifecycle, and each connected client gets a worker task of its own:
//!
//! - The accept supervisor owns the listening socket, retries transient
//!   accept failures, and forwards established connections.
//! - The orchestration task registers clients and drives shutdown:
//!   listener first, then every client, then the stopped signal.
//! - Each worker reads delimited frames, invokes the hooks, and cleans up
//!   after itself. A misbehaving client takes down only its own worker.
//!
//! # Quick Start
//!
//! ```no_run
//! use packetsvr::{Result, Server};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let server = Server::builder()
//!         .address("127.0.0.1:9999")
//!         .on_connect(|client| println!("{client} connected"))
//!         .on_message(|client, message| println!("{client}: {message}"))
//!         .on_disconnect(|client| println!("{client} disconnected"))
//!         .build()?;
//!
//!     server.start().await?.wait().await;
//!
//!     // ... serve until it is time to shut down ...
//!
//!     server.stop()?.wait().await;
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`client`] | One accepted connection: [`Client`] |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`handler`] | Event hooks: [`ServerHandler`], [`Callbacks`] |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`server`] | [`Server`], its builder, and the task machinery |
//! | [`signal`] | [`Completion`] handles for lifecycle waits |
//!
//! # Framing
//!
//! Messages are byte sequences terminated by one configurable delimiter
//! byte (default `b'\n'`). Outgoing sends append it; incoming frames have
//! it stripped before dispatch. There is no length-prefix framing and no
//! escaping: a payload containing the delimiter byte will be split early.

// ============================================================================
// Modules
// ============================================================================

/// A single accepted client connection.
pub mod client;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Server event hooks.
pub mod handler;

/// Type-safe identifiers for server entities.
///
/// Newtype wrappers prevent mixing incompatible IDs at compile time.
pub mod identifiers;

/// Server lifecycle, registry, accept loop, and workers.
pub mod server;

/// One-shot completion signals.
pub mod signal;

/// Accepted-stream abstraction.
///
/// Internal module splitting plain and TLS streams into halves.
pub(crate) mod stream;

/// TLS identity loading.
///
/// Internal module turning PEM files into an acceptor.
pub(crate) mod tls;

// ============================================================================
// Re-exports
// ============================================================================

// Client types
pub use client::Client;

// Error types
pub use error::{Error, Result};

// Handler types
pub use handler::{Callbacks, ServerHandler};

// Identifier types
pub use identifiers::ClientId;

// Server types
pub use server::{Server, ServerBuilder};

// Signal types
pub use signal::Completion;
