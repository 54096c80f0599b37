//! Error types for the packet server.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use packetsvr::{Result, Server};
//!
//! async fn example(server: &Server) -> Result<()> {
//!     let started = server.start().await?;
//!     started.wait().await;
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`], [`Error::Tls`] |
//! | Startup | [`Error::Bind`] |
//! | Lifecycle misuse | [`Error::AlreadyRunning`], [`Error::NotRunning`] |
//! | Connection | [`Error::ConnectionClosed`], [`Error::Io`] |

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::result::Result as StdResult;

use thiserror::Error;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// Each variant includes relevant context for debugging.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when server configuration is invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// TLS material error.
    ///
    /// Returned when the certificate or private key cannot be read or
    /// parsed. Always raised at construction time, never mid-connection.
    #[error("TLS error: {message}")]
    Tls {
        /// Description of the TLS failure.
        message: String,
    },

    // ========================================================================
    // Startup Errors
    // ========================================================================
    /// Failed to bind the listening socket.
    ///
    /// Returned by `start()` before any server state is mutated.
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        /// The address that could not be bound.
        addr: String,
        /// Underlying IO failure.
        source: IoError,
    },

    // ========================================================================
    // Lifecycle Misuse Errors
    // ========================================================================
    /// `start()` was called while the server is already running.
    ///
    /// Returned synchronously, with no side effects.
    #[error("Server is already running")]
    AlreadyRunning,

    /// `stop()` was called while the server is not running.
    ///
    /// Returned synchronously, with no side effects.
    #[error("Server is not running")]
    NotRunning,

    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// The client connection is closed.
    ///
    /// Returned when sending to a client whose worker has terminated.
    #[error("Connection closed")]
    ConnectionClosed,

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a TLS material error.
    #[inline]
    pub fn tls(message: impl Into<String>) -> Self {
        Self::Tls {
            message: message.into(),
        }
    }

    /// Creates a bind error for the given address.
    #[inline]
    pub fn bind(addr: impl Into<String>, source: IoError) -> Self {
        Self::Bind {
            addr: addr.into(),
            source,
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a lifecycle misuse error.
    ///
    /// Lifecycle misuse errors are returned synchronously to the caller
    /// and leave the server untouched.
    #[inline]
    #[must_use]
    pub fn is_lifecycle_error(&self) -> bool {
        matches!(self, Self::AlreadyRunning | Self::NotRunning)
    }

    /// Returns `true` if this is a per-connection error.
    ///
    /// Connection errors affect a single client; the listener and all
    /// other clients keep running.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(self, Self::ConnectionClosed | Self::Io(_))
    }

    /// Returns `true` if this error is fatal to construction or startup.
    #[inline]
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Config { .. } | Self::Tls { .. } | Self::Bind { .. }
        )
    }
}

// ============================================================================
// Tests
// ============================================================================
