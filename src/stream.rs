//! Accepted-stream abstraction.
//!
//! The accept supervisor produces either a plain TCP stream or a
//! TLS-wrapped one, depending on server configuration. Both are split
//! once into boxed read/write halves: the worker task owns the read half,
//! the [`Client`](crate::client::Client) owns the write half.

// ============================================================================
// Imports
// ============================================================================

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_rustls::server::TlsStream;

// ============================================================================
// Types
// ============================================================================

/// Boxed read half of an accepted stream.
pub(crate) type StreamReader = Box<dyn AsyncRead + Send + Unpin>;

/// Boxed write half of an accepted stream.
pub(crate) type StreamWriter = Box<dyn AsyncWrite + Send + Unpin>;

// ============================================================================
// ServerStream
// ============================================================================

/// An accepted transport stream, plain or TLS.
pub(crate) enum ServerStream {
    /// Plain TCP stream.
    Plain(TcpStream),
    /// TLS stream after a completed server-side handshake.
    Tls(TlsStream<TcpStream>),
}

impl ServerStream {
    /// Splits the stream into boxed read and write halves.
    pub(crate) fn into_split(self) -> (StreamReader, StreamWriter) {
        match self {
            Self::Plain(stream) => {
                let (reader, writer) = stream.into_split();
                (Box::new(reader), Box::new(writer))
            }
            Self::Tls(stream) => {
                let (reader, writer) = tokio::io::split(stream);
                (Box::new(reader), Box::new(writer))
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
