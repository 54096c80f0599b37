//! Accept supervisor.
//!
//! One long-lived task blocks on the listening socket and forwards
//! established connections to the orchestration loop. Accept failures are
//! classified: transient ones are retried after a fixed backoff, anything
//! else terminates the loop. Loop exit is the normal path during shutdown,
//! since the task owns the listener and dropping it unbinds the port.

// ============================================================================
// Imports
// ============================================================================

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::sleep;
use tokio_rustls::TlsAcceptor;
use tracing::{debug, warn};

use crate::signal::Latch;
use crate::stream::{ServerStream, StreamReader, StreamWriter};

// ============================================================================
// Constants
// ============================================================================

/// Delay before retrying after a transient accept failure.
pub(crate) const ACCEPT_RETRY_DELAY: Duration = Duration::from_secs(1);

// ============================================================================
// InboundConnection
// ============================================================================

/// An established connection, handshook and split, awaiting registration.
pub(crate) struct InboundConnection {
    pub(crate) reader: StreamReader,
    pub(crate) writer: StreamWriter,
    pub(crate) remote_addr: SocketAddr,
    pub(crate) local_addr: SocketAddr,
}

// ============================================================================
// Accept Loop
// ============================================================================

/// Runs the accept loop until a stop request or a permanent accept error.
///
/// Owns the listener; the port is unbound when this task finishes. Fires
/// `done` on exit regardless of cause.
pub(crate) async fn run(
    listener: TcpListener,
    tls: Option<TlsAcceptor>,
    conn_tx: mpsc::UnboundedSender<InboundConnection>,
    stop: Latch,
    done: Latch,
) {
    debug!("accept loop started");

    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, remote_addr)) => {
                    match establish(stream, remote_addr, tls.as_ref()).await {
                        Ok(inbound) => {
                            // Receiver gone means the orchestrator is shutting down.
                            if conn_tx.send(inbound).is_err() {
                                break;
                            }
                        }
                        Err(e) => {
                            warn!(remote = %remote_addr, error = %e, "inbound connection rejected");
                        }
                    }
                }
                Err(e) if is_transient(&e) => {
                    warn!(error = %e, "transient accept failure, retrying");
                    sleep(ACCEPT_RETRY_DELAY).await;
                }
                Err(e) => {
                    debug!(error = %e, "permanent accept failure, terminating accept loop");
                    break;
                }
            },

            _ = stop.fired() => {
                debug!("accept loop stop requested");
                break;
            }
        }
    }

    done.fire();
    debug!("accept loop terminated");
}

/// Completes the per-connection setup: optional TLS handshake, then split.
async fn establish(
    stream: TcpStream,
    remote_addr: SocketAddr,
    tls: Option<&TlsAcceptor>,
) -> io::Result<InboundConnection> {
    let local_addr = stream.local_addr()?;

    let stream = match tls {
        Some(acceptor) => ServerStream::Tls(acceptor.accept(stream).await?),
        None => ServerStream::Plain(stream),
    };

    let (reader, writer) = stream.into_split();
    Ok(InboundConnection {
        reader,
        writer,
        remote_addr,
        local_addr,
    })
}

/// Classifies an accept error as transient (retry) or permanent (exit).
fn is_transient(e: &io::Error) -> bool {
    if matches!(
        e.kind(),
        io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::Interrupted
            | io::ErrorKind::WouldBlock
            | io::ErrorKind::TimedOut
    ) {
        return true;
    }

    // Descriptor and buffer exhaustion clear up once existing connections
    // close. They carry no stable `ErrorKind`, so match the raw errno.
    #[cfg(unix)]
    if matches!(
        e.raw_os_error(),
        Some(libc::EMFILE | libc::ENFILE | libc::ENOBUFS)
    ) {
        return true;
    }

    false
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use tokio::time::timeout;

    #[test]
    fn test_transient_classification() {
        for kind in [
            io::ErrorKind::ConnectionAborted,
            io::ErrorKind::ConnectionReset,
            io::ErrorKind::Interrupted,
            io::ErrorKind::WouldBlock,
            io::ErrorKind::TimedOut,
        ] {
            assert!(is_transient(&io::Error::new(kind, "transient")));
        }
    }

    #[test]
    #[cfg(unix)]
    fn test_descriptor_exhaustion_is_transient() {
        // accept(2) under fd pressure returns these with no mapped
        // ErrorKind; the loop must back off and retry, not terminate.
        for errno in [libc::EMFILE, libc::ENFILE, libc::ENOBUFS] {
            let e = io::Error::from_raw_os_error(errno);
            assert!(is_transient(&e), "errno {errno} must be retried: {e}");
        }
    }

    #[test]
    fn test_permanent_classification() {
        for kind in [
            io::ErrorKind::InvalidInput,
            io::ErrorKind::BrokenPipe,
            io::ErrorKind::NotFound,
            io::ErrorKind::PermissionDenied,
        ] {
            assert!(!is_transient(&io::Error::new(kind, "permanent")));
        }
    }

    #[tokio::test]
    async fn test_stop_fires_done_and_unbinds() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");

        let (conn_tx, _conn_rx) = mpsc::unbounded_channel();
        let stop = Latch::new();
        let done = Latch::new();
        let task = tokio::spawn(run(listener, None, conn_tx, stop.clone(), done.clone()));

        stop.fire();
        timeout(Duration::from_secs(1), done.completion().wait())
            .await
            .expect("done latch should fire after stop");
        task.await.expect("accept task");

        // The listener was dropped with the task, so the port is free again.
        TcpListener::bind(addr).await.expect("rebind after stop");
    }

    #[tokio::test]
    async fn test_accepted_connection_is_forwarded() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");

        let (conn_tx, mut conn_rx) = mpsc::unbounded_channel();
        let stop = Latch::new();
        let done = Latch::new();
        tokio::spawn(run(listener, None, conn_tx, stop.clone(), done.clone()));

        let peer = TcpStream::connect(addr).await.expect("connect");
        let inbound = timeout(Duration::from_secs(1), conn_rx.recv())
            .await
            .expect("connection should be forwarded")
            .expect("channel open");

        assert_eq!(inbound.remote_addr, peer.local_addr().expect("peer addr"));
        assert_eq!(inbound.local_addr.port(), addr.port());

        stop.fire();
    }
}
