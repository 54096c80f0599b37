//! One-shot completion signals.
//!
//! A [`Latch`] is fired exactly once by its owner; any number of
//! [`Completion`] handles can wait on it to learn that the phase it
//! represents is done. The server uses latches for every lifecycle edge:
//! *started*, *stop-requested*, *stopped*, and the per-client stop and
//! done signals.
//!
//! Built on `tokio::sync::watch` so that a single producer can wake an
//! arbitrary number of waiters, including waiters that subscribe after
//! the latch has already fired.

// ============================================================================
// Imports
// ============================================================================

use tokio::sync::watch;

// ============================================================================
// Latch
// ============================================================================

/// A one-shot completion latch.
///
/// Firing is idempotent; waiters that arrive after the fire observe it
/// immediately.
#[derive(Debug, Clone)]
pub(crate) struct Latch {
    tx: watch::Sender<bool>,
}

impl Latch {
    /// Creates a new unfired latch.
    pub(crate) fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx }
    }

    /// Fires the latch, waking all current and future waiters.
    ///
    /// Returns `true` if this call was the one that fired it.
    pub(crate) fn fire(&self) -> bool {
        !self.tx.send_replace(true)
    }

    /// Returns `true` if the latch has fired.
    pub(crate) fn is_fired(&self) -> bool {
        *self.tx.borrow()
    }

    /// Returns a waitable handle on this latch.
    pub(crate) fn completion(&self) -> Completion {
        Completion {
            rx: self.tx.subscribe(),
        }
    }

    /// Waits for the latch to fire.
    ///
    /// Cancel-safe: usable directly as a `select!` branch.
    pub(crate) async fn fired(&self) {
        self.completion().wait().await;
    }
}

// ============================================================================
// Completion
// ============================================================================

/// A waitable handle on a [`Latch`].
///
/// Cloneable; every clone resolves when the latch fires. If the latch is
/// dropped without firing, waiting resolves as well (the phase it tracked
/// can no longer be pending).
#[derive(Debug, Clone)]
pub struct Completion {
    rx: watch::Receiver<bool>,
}

impl Completion {
    /// Waits until the underlying latch fires.
    pub async fn wait(mut self) {
        // Err means the latch was dropped; treat as completed.
        let _ = self.rx.wait_for(|fired| *fired).await;
    }

    /// Returns `true` if the underlying latch has already fired.
    #[inline]
    #[must_use]
    pub fn is_complete(&self) -> bool {
        *self.rx.borrow()
    }
}

// ============================================================================
// Tests
// ============================================================================
