//! Per-connection worker.
//!
//! One task per client owns the read half of the transport and the whole
//! connection lifecycle: greet, read delimited frames, dispatch to the
//! handler, then drain (disconnect callback, deregistration, transport
//! shutdown) and fire the client's done latch. Any failure here terminates
//! only this worker; the listener and other clients are unaffected.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, warn};

use crate::client::Client;
use crate::handler::ServerHandler;
use crate::server::registry::ClientRegistry;
use crate::stream::StreamReader;

// ============================================================================
// Worker Loop
// ============================================================================

/// Runs a client's worker until EOF, a read error, or a close request.
pub(crate) async fn run(
    client: Arc<Client>,
    reader: StreamReader,
    delimiter: u8,
    handler: Arc<dyn ServerHandler>,
    registry: Arc<ClientRegistry>,
) {
    debug!(client = %client, "client connected");
    handler.on_connect(&client).await;

    let mut reader = BufReader::new(reader);
    let mut frame = Vec::new();

    loop {
        frame.clear();

        tokio::select! {
            read = reader.read_until(delimiter, &mut frame) => match read {
                Ok(0) => {
                    debug!(client = %client, "client disconnected");
                    break;
                }
                Ok(_) => {
                    if frame.last() != Some(&delimiter) {
                        // End of stream with an unterminated frame; the
                        // partial payload is dropped, matching the framing
                        // contract.
                        debug!(
                            client = %client,
                            len = frame.len(),
                            "discarding unterminated frame at end of stream"
                        );
                        break;
                    }
                    frame.pop();

                    let message = String::from_utf8_lossy(&frame);
                    handler.on_message(&client, &message).await;
                }
                Err(e) => {
                    warn!(client = %client, error = %e, "client read failed");
                    break;
                }
            },

            _ = client.stop_requested() => {
                debug!(client = %client, "client close requested");
                break;
            }
        }
    }

    // Drain: same teardown for every exit path.
    handler.on_disconnect(&client).await;
    registry.remove(client.id());
    client.shutdown_transport().await;
    client.mark_done();

    debug!(client = %client, "client worker terminated");
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::net::SocketAddr;
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio::io::AsyncWriteExt;
    use tokio::time::timeout;

    /// Records the callback sequence for one worker.
    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<String>>,
    }

    impl Recorder {
        fn events(&self) -> Vec<String> {
            self.events.lock().expect("recorder lock").clone()
        }
    }

    #[async_trait]
    impl ServerHandler for Recorder {
        async fn on_connect(&self, _client: &Arc<Client>) {
            self.events.lock().expect("recorder lock").push("connect".into());
        }

        async fn on_message(&self, _client: &Arc<Client>, message: &str) {
            self.events
                .lock()
                .expect("recorder lock")
                .push(format!("message:{message}"));
        }

        async fn on_disconnect(&self, _client: &Arc<Client>) {
            self.events
                .lock()
                .expect("recorder lock")
                .push("disconnect".into());
        }
    }

    struct Harness {
        client: Arc<Client>,
        handler: Arc<Recorder>,
        registry: Arc<ClientRegistry>,
        peer: tokio::io::DuplexStream,
    }

    fn spawn_worker(delimiter: u8) -> Harness {
        let (peer, server_side) = tokio::io::duplex(1024);
        let (server_reader, server_writer) = tokio::io::split(server_side);
        let addr: SocketAddr = "127.0.0.1:7000".parse().expect("valid address");

        let registry = Arc::new(ClientRegistry::new());
        let id = registry.next_id();
        let client = Arc::new(Client::new(
            id,
            delimiter,
            Box::new(server_writer),
            addr,
            addr,
        ));
        registry.insert(Arc::clone(&client));

        let handler = Arc::new(Recorder::default());
        tokio::spawn(run(
            Arc::clone(&client),
            Box::new(server_reader),
            delimiter,
            Arc::clone(&handler) as Arc<dyn ServerHandler>,
            Arc::clone(&registry),
        ));

        Harness {
            client,
            handler,
            registry,
            peer,
        }
    }

    async fn wait_done(client: &Arc<Client>) {
        timeout(Duration::from_secs(1), client.closed().wait())
            .await
            .expect("worker should terminate");
    }

    #[tokio::test]
    async fn test_messages_dispatched_in_order_then_disconnect() {
        let mut harness = spawn_worker(b'\n');

        harness.peer.write_all(b"one\ntwo\n").await.expect("write");
        harness.peer.shutdown().await.expect("shutdown");

        wait_done(&harness.client).await;

        assert_eq!(
            harness.handler.events(),
            vec!["connect", "message:one", "message:two", "disconnect"]
        );
        assert!(harness.registry.is_empty());
    }

    #[tokio::test]
    async fn test_delimiter_is_stripped() {
        let mut harness = spawn_worker(b';');

        harness.peer.write_all(b"ping;").await.expect("write");
        harness.peer.shutdown().await.expect("shutdown");

        wait_done(&harness.client).await;
        assert!(
            harness
                .handler
                .events()
                .contains(&"message:ping".to_string())
        );
    }

    #[tokio::test]
    async fn test_unterminated_trailing_frame_is_discarded() {
        let mut harness = spawn_worker(b'\n');

        harness.peer.write_all(b"kept\nlost").await.expect("write");
        harness.peer.shutdown().await.expect("shutdown");

        wait_done(&harness.client).await;

        assert_eq!(
            harness.handler.events(),
            vec!["connect", "message:kept", "disconnect"]
        );
    }

    #[tokio::test]
    async fn test_close_interrupts_idle_worker() {
        let harness = spawn_worker(b'\n');

        // No traffic; the worker is parked on the read.
        let closed = harness.client.close();
        timeout(Duration::from_secs(1), closed.wait())
            .await
            .expect("close should interrupt the pending read");

        assert_eq!(harness.handler.events(), vec!["connect", "disconnect"]);
        assert!(harness.registry.is_empty());
    }

    #[tokio::test]
    async fn test_abrupt_peer_drop_triggers_single_disconnect() {
        let harness = spawn_worker(b'\n');

        drop(harness.peer);

        wait_done(&harness.client).await;

        let events = harness.handler.events();
        assert_eq!(
            events.iter().filter(|e| *e == "disconnect").count(),
            1,
            "exactly one disconnect, got {events:?}"
        );
        assert!(harness.registry.is_empty());
    }

    #[tokio::test]
    async fn test_non_utf8_payload_is_lossy_decoded() {
        let mut harness = spawn_worker(b'\n');

        harness
            .peer
            .write_all(&[0xff, 0xfe, b'\n'])
            .await
            .expect("write");
        harness.peer.shutdown().await.expect("shutdown");

        wait_done(&harness.client).await;

        let events = harness.handler.events();
        assert!(
            events.iter().any(|e| e.starts_with("message:")),
            "lossy-decoded message expected, got {events:?}"
        );
    }
}
