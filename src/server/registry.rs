//! Registry of currently connected clients.
//!
//! A single exclusive lock protects both the id→client table and the
//! monotonic id counter; these are the only pieces of state shared across
//! tasks. The lock is never held across an `.await`: iteration hands out a
//! snapshot of `Arc<Client>` handles and sends happen outside the lock.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tracing::trace;

use crate::client::Client;
use crate::identifiers::ClientId;

// ============================================================================
// ClientRegistry
// ============================================================================

/// Lock-protected table of live clients plus the id generator.
///
/// An entry exists exactly while its worker task is running and has not
/// yet deregistered.
pub(crate) struct ClientRegistry {
    inner: Mutex<RegistryInner>,
}

struct RegistryInner {
    clients: FxHashMap<ClientId, Arc<Client>>,
    next_id: u64,
}

impl ClientRegistry {
    /// Creates an empty registry. Ids start at 1.
    pub(crate) fn new() -> Self {
        Self {
            inner: Mutex::new(RegistryInner {
                clients: FxHashMap::default(),
                next_id: 1,
            }),
        }
    }

    /// Returns the next unique client id.
    ///
    /// Strictly increasing under the registry lock: no two racing callers
    /// ever receive the same value. The counter is never reset, so ids
    /// stay unique across stop/start cycles.
    pub(crate) fn next_id(&self) -> ClientId {
        let mut inner = self.inner.lock();
        let id = ClientId::new(inner.next_id);
        inner.next_id += 1;
        id
    }

    /// Registers a client under its id.
    pub(crate) fn insert(&self, client: Arc<Client>) {
        let mut inner = self.inner.lock();
        inner.clients.insert(client.id(), client);
    }

    /// Removes a client by id.
    ///
    /// A no-op for absent ids: shutdown may race a natural disconnect and
    /// both paths deregister.
    pub(crate) fn remove(&self, id: ClientId) {
        let removed = self.inner.lock().clients.remove(&id);
        if removed.is_some() {
            trace!(client_id = %id, "client deregistered");
        }
    }

    /// Returns a snapshot of all current clients.
    ///
    /// The snapshot is taken under the lock; sends against it are
    /// best-effort, since a client may disconnect while the caller
    /// iterates.
    pub(crate) fn clients(&self) -> Vec<Arc<Client>> {
        self.inner.lock().clients.values().cloned().collect()
    }

    /// Returns the number of registered clients.
    pub(crate) fn len(&self) -> usize {
        self.inner.lock().clients.len()
    }

    /// Returns `true` if no clients are registered.
    pub(crate) fn is_empty(&self) -> bool {
        self.inner.lock().clients.is_empty()
    }
}

// ============================================================================
// Tests
// ============================================================================
