//! The pending-operation registry: at most one in-flight operation per kind.
//!
//! This is the synchronization surface between the code that *starts* an
//! asynchronous operation and the code that *finishes* it — which, under
//! the bridged backend, runs on whatever call stack the host environment
//! happens to invoke the completion callback from. Everything the two
//! sides share goes through the slot map's lock; neither side ever
//! observes a half-updated slot.
//!
//! # Concurrency note
//!
//! The lock is a plain `std::sync::Mutex`, never held across an await
//! point — every operation is a short map lookup/insert/remove. The
//! futures themselves are `tokio::sync::oneshot` channels, which handle
//! the resolve-before-read ordering: a completed send is fully visible to
//! the awaiting receiver.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use playsync_protocol::{OpKind, ServiceResult};
use tokio::sync::oneshot;

use crate::TransportError;

/// Tracks at most one outstanding asynchronous operation per [`OpKind`].
///
/// Each slot pairs an operation kind with the sending half of a oneshot
/// channel; the receiving half is the future the caller awaits.
///
/// A second [`begin`](Self::begin) for a kind whose slot is still live is
/// rejected with [`TransportError::AlreadyInFlight`] rather than silently
/// replacing the slot — replacement would orphan the first caller's
/// future forever.
#[derive(Default)]
pub struct PendingOperations {
    slots: Mutex<HashMap<OpKind, oneshot::Sender<ServiceResult>>>,
}

impl PendingOperations {
    pub fn new() -> Self {
        Self::default()
    }

    fn slots(&self) -> MutexGuard<'_, HashMap<OpKind, oneshot::Sender<ServiceResult>>> {
        // A poisoned lock means some other thread panicked mid-operation.
        // The map itself is always structurally valid (single insert or
        // remove per critical section), so keep going with its contents.
        match self.slots.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Claims the slot for `kind` and returns the future that resolves
    /// when the operation completes.
    ///
    /// A slot whose receiver was dropped (the awaiting caller gave up or
    /// timed out) counts as vacant and is reclaimed.
    ///
    /// # Errors
    /// Returns [`TransportError::AlreadyInFlight`] if a live operation of
    /// this kind is still awaiting its result.
    pub fn begin(
        &self,
        kind: OpKind,
    ) -> Result<oneshot::Receiver<ServiceResult>, TransportError> {
        let mut slots = self.slots();

        if let Some(existing) = slots.get(&kind) {
            if !existing.is_closed() {
                return Err(TransportError::AlreadyInFlight(kind));
            }
            // Stale slot: nobody is listening on the other end anymore.
            slots.remove(&kind);
        }

        let (tx, rx) = oneshot::channel();
        slots.insert(kind, tx);
        tracing::debug!(%kind, "pending operation registered");
        Ok(rx)
    }

    /// Fulfills the slot for `kind` with `result`.
    ///
    /// Returns `true` if a waiting caller received the result. When no
    /// slot exists — the operation was never started, already resolved,
    /// or timed out — the result is dropped with a warning, never a
    /// crash: the host environment may legitimately complete an
    /// operation this side has stopped waiting for.
    pub fn resolve(&self, kind: OpKind, result: ServiceResult) -> bool {
        let sender = self.slots().remove(&kind);

        match sender {
            Some(tx) => match tx.send(result) {
                Ok(()) => {
                    tracing::debug!(%kind, "pending operation resolved");
                    true
                }
                Err(_) => {
                    tracing::warn!(
                        %kind,
                        "completion arrived after the caller stopped waiting; result dropped"
                    );
                    false
                }
            },
            None => {
                tracing::warn!(
                    %kind,
                    "completion arrived with no pending operation; result dropped"
                );
                false
            }
        }
    }

    /// Clears the slot for `kind` without resolving it.
    ///
    /// Used by timeout handling; a completion arriving afterwards is
    /// treated as unsolicited and dropped by [`resolve`](Self::resolve).
    pub fn cancel(&self, kind: OpKind) -> bool {
        self.slots().remove(&kind).is_some()
    }

    /// `true` if a live operation of this kind is awaiting its result.
    pub fn is_pending(&self, kind: OpKind) -> bool {
        self.slots()
            .get(&kind)
            .is_some_and(|tx| !tx.is_closed())
    }
}

// =========================================================================
// Tests
// =========================================================================
