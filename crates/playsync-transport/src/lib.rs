//! Account backend abstraction for Playsync.
//!
//! The session layer talks to the remote account service through the
//! [`AccountBackend`] trait, which has two implementations with an
//! identical asynchronous contract:
//!
//! - [`DirectBackend`] — the remote call is awaited in the caller's own
//!   control flow (native/desktop builds, server-side tools).
//! - [`BridgedBackend`] — the call crosses an embedding boundary: a
//!   one-way request is fired into a host environment, and a later,
//!   independently-invoked completion callback resolves the matching
//!   entry in the [`PendingOperations`] registry.
//!
//! The bridged variant exists because some host environments cannot be
//! awaited from inside the embedded runtime — the host offers one-shot
//! callback APIs, and this crate turns those into awaitable futures.
//!
//! ```text
//! SessionManager ──execute()──→ AccountBackend
//!                                ├─ Direct:  service.call(...).await
//!                                └─ Bridged: slot ← dispatch → ...
//!                                            ...later, host calls
//!                                            complete(kind, result)
//! ```

#![allow(async_fn_in_trait)]

mod bridged;
mod direct;
mod error;
mod pending;

pub use bridged::{BridgedBackend, BridgedConfig, HostBridge};
pub use direct::{AccountService, DirectBackend};
pub use error::TransportError;
pub use pending::PendingOperations;

use std::future::Future;
use std::sync::Arc;

use playsync_protocol::{BridgeRequest, OpKind, ServiceResult};
use tokio::sync::oneshot;

/// The backend contract both variants satisfy.
///
/// `execute` is the awaitable path every operation uses. `start_probe`
/// exists for session restoration, which cannot simply await: under the
/// bridged variant the probe's answer may take several seconds of host
/// initialization, and the restored profile can land through a different
/// completion than the probe itself — so restoration gets a pollable
/// handle instead of a blocked future.
pub trait AccountBackend: Send + Sync + 'static {
    /// Executes one operation against the account service and awaits its
    /// result.
    ///
    /// A `Result::Ok` carrying [`ServiceResult::Failure`] means the
    /// service processed and rejected the request; `Result::Err` means
    /// the request could not be delivered or completed.
    fn execute(
        &self,
        request: BridgeRequest,
    ) -> impl Future<Output = Result<ServiceResult, TransportError>> + Send;

    /// Issues a session-probe request and returns a pollable handle.
    ///
    /// The direct variant performs the fetch before returning, so the
    /// handle is already resolved (fail-fast). The bridged variant fires
    /// the one-way probe and returns a pending handle for the caller's
    /// poll loop.
    fn start_probe(
        &self,
    ) -> impl Future<Output = Result<ProbeHandle, TransportError>> + Send;
}

// ---------------------------------------------------------------------------
// ProbeHandle
// ---------------------------------------------------------------------------

/// What a [`ProbeHandle::poll`] observed.
#[derive(Debug)]
pub enum ProbeStatus {
    /// The probe completed with this result.
    Ready(ServiceResult),
    /// No completion yet — poll again later.
    Pending,
    /// The probe's channel died without a result; it will never resolve.
    Gone,
}

/// A non-blocking view of an in-flight session probe.
///
/// Wraps the probe's pending-slot future. Dropping the handle without
/// [`cancel`](Self::cancel) leaves the slot reclaimable (its receiver is
/// closed), but cancelling eagerly keeps the registry tidy and makes the
/// late-completion warning fire with accurate context.
pub struct ProbeHandle {
    rx: oneshot::Receiver<ServiceResult>,
    pending: Arc<PendingOperations>,
}

impl ProbeHandle {
    /// Wraps a probe slot's receiver. `pending` must be the registry the
    /// slot was claimed from, so [`cancel`](Self::cancel) clears it.
    pub fn new(
        rx: oneshot::Receiver<ServiceResult>,
        pending: Arc<PendingOperations>,
    ) -> Self {
        Self { rx, pending }
    }

    /// A handle that is already resolved with `result`.
    ///
    /// Backends that answer the probe before returning (the direct
    /// variant, test doubles) hand this to the caller so its first poll
    /// observes the result.
    pub fn resolved(result: ServiceResult) -> Self {
        let pending = Arc::new(PendingOperations::new());
        let rx = pending
            .begin(OpKind::SessionProbe)
            .expect("fresh registry has no pending probe");
        pending.resolve(OpKind::SessionProbe, result);
        Self { rx, pending }
    }

    /// Checks for a completion without blocking.
    pub fn poll(&mut self) -> ProbeStatus {
        match self.rx.try_recv() {
            Ok(result) => ProbeStatus::Ready(result),
            Err(oneshot::error::TryRecvError::Empty) => ProbeStatus::Pending,
            Err(oneshot::error::TryRecvError::Closed) => ProbeStatus::Gone,
        }
    }

    /// Abandons the probe, clearing its pending slot.
    pub fn cancel(self) {
        if self.pending.cancel(OpKind::SessionProbe) {
            tracing::debug!("session probe abandoned; pending slot cleared");
        }
    }
}
