//! Builder pattern for server configuration.
//!
//! Provides a fluent API for configuring and creating [`Server`] instances.
//!
//! # Example
//!
//! ```no_run
//! use packetsvr::Server;
//!
//! # fn example() -> packetsvr::Result<()> {
//! let server = Server::builder()
//!     .address("127.0.0.1:9999")
//!     .delimiter(b'\n')
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

use std::path::PathBuf;
use std::sync::Arc;

use crate::client::Client;
use crate::error::{Error, Result};
use crate::handler::{Callbacks, ServerHandler};
use crate::tls;

use super::core::Server;

// ============================================================================
// Constants
// ============================================================================

/// Default message delimiter.
const DEFAULT_DELIMITER: u8 = b'\n';

// ============================================================================
// ServerBuilder
// ============================================================================

/// Builder for configuring a [`Server`] instance.
///
/// Use [`Server::builder()`] to create a new builder. Every hook slot is
/// optional; unset hooks are no-ops. Setting a whole [`ServerHandler`]
/// via [`handler`](Self::handler) replaces any closure hooks.
pub struct ServerBuilder {
    /// Bind address, e.g. `"127.0.0.1:9999"`.
    address: Option<String>,
    /// Message delimiter byte.
    delimiter: u8,
    /// Closure hooks, used when no trait handler is set.
    callbacks: Callbacks,
    /// Trait handler; takes precedence over closure hooks.
    handler: Option<Arc<dyn ServerHandler>>,
    /// Certificate and private key PEM paths.
    tls: Option<(PathBuf, PathBuf)>,
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self {
            address: None,
            delimiter: DEFAULT_DELIMITER,
            callbacks: Callbacks::new(),
            handler: None,
            tls: None,
        }
    }
}

// ============================================================================
// ServerBuilder Implementation
// ============================================================================

impl ServerBuilder {
    /// Creates a new builder with default configuration.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the bind address.
    ///
    /// # Arguments
    ///
    /// * `address` - Bind address in `"{host}:{port}"` form; port `0`
    ///   picks a free port.
    #[inline]
    #[must_use]
    pub fn address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    /// Sets the message delimiter byte. Defaults to `b'\n'`.
    ///
    /// Outgoing sends append it; incoming frames are split at it, with
    /// the delimiter stripped before dispatch.
    #[inline]
    #[must_use]
    pub fn delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Sets the connect hook.
    #[must_use]
    pub fn on_connect(mut self, hook: impl Fn(&Arc<Client>) + Send + Sync + 'static) -> Self {
        self.callbacks = self.callbacks.connect_hook(hook);
        self
    }

    /// Sets the message hook.
    #[must_use]
    pub fn on_message(
        mut self,
        hook: impl Fn(&Arc<Client>, &str) + Send + Sync + 'static,
    ) -> Self {
        self.callbacks = self.callbacks.message_hook(hook);
        self
    }

    /// Sets the disconnect hook.
    #[must_use]
    pub fn on_disconnect(mut self, hook: impl Fn(&Arc<Client>) + Send + Sync + 'static) -> Self {
        self.callbacks = self.callbacks.disconnect_hook(hook);
        self
    }

    /// Sets a full [`ServerHandler`], replacing any closure hooks.
    #[must_use]
    pub fn handler(mut self, handler: impl ServerHandler + 'static) -> Self {
        self.handler = Some(Arc::new(handler));
        self
    }

    /// Enables TLS with the given certificate chain and private key PEM
    /// files.
    ///
    /// The material is loaded and validated by [`build`](Self::build).
    #[inline]
    #[must_use]
    pub fn tls(mut self, cert_path: impl Into<PathBuf>, key_path: impl Into<PathBuf>) -> Self {
        self.tls = Some((cert_path.into(), key_path.into()));
        self
    }

    /// Builds the server with validation.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if no bind address was set
    /// - [`Error::Tls`] if TLS material cannot be loaded or is invalid
    pub fn build(self) -> Result<Server> {
        let address = self.address.ok_or_else(|| {
            Error::config(
                "Bind address is required. Use .address() to set it.\n\
                 Example: Server::builder().address(\"127.0.0.1:9999\")",
            )
        })?;

        let acceptor = match &self.tls {
            Some((cert_path, key_path)) => Some(tls::load_acceptor(cert_path, key_path)?),
            None => None,
        };

        let handler = self
            .handler
            .unwrap_or_else(|| Arc::new(self.callbacks) as Arc<dyn ServerHandler>);

        Ok(Server::from_parts(address, self.delimiter, handler, acceptor))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let builder = ServerBuilder::new();
        assert!(builder.address.is_none());
        assert_eq!(builder.delimiter, b'\n');
        assert!(builder.handler.is_none());
        assert!(builder.tls.is_none());
    }

    #[test]
    fn test_address_sets_value() {
        let builder = ServerBuilder::new().address("127.0.0.1:9999");
        assert_eq!(builder.address.as_deref(), Some("127.0.0.1:9999"));
    }

    #[test]
    fn test_delimiter_sets_value() {
        let builder = ServerBuilder::new().delimiter(b'\0');
        assert_eq!(builder.delimiter, 0);
    }

    #[test]
    fn test_build_fails_without_address() {
        let err = match ServerBuilder::new().build() {
            Err(err) => err,
            Ok(_) => panic!("build without an address must fail"),
        };
        assert!(err.to_string().contains("address"));
    }

    #[test]
    fn test_build_with_address_succeeds() {
        let server = ServerBuilder::new().address("127.0.0.1:0").build();
        assert!(server.is_ok());
    }

    #[test]
    fn test_build_fails_with_missing_tls_files() {
        let result = ServerBuilder::new()
            .address("127.0.0.1:0")
            .tls("/nonexistent/cert.pem", "/nonexistent/key.pem")
            .build();

        assert!(matches!(result, Err(Error::Tls { .. })));
    }

    #[test]
    fn test_build_with_valid_tls_material() {
        let (cert_file, key_file) = crate::tls::self_signed_identity();
        let result = ServerBuilder::new()
            .address("127.0.0.1:0")
            .tls(cert_file.path(), key_file.path())
            .build();

        assert!(result.is_ok());
    }

    #[test]
    fn test_hooks_are_accepted() {
        let builder = ServerBuilder::new()
            .address("127.0.0.1:0")
            .on_connect(|_| {})
            .on_message(|_, _| {})
            .on_disconnect(|_| {});

        assert!(builder.build().is_ok());
    }
}
