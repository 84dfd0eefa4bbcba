//! Direct backend: the remote call is awaited in the caller's control flow.

use std::future::Future;
use std::sync::Arc;

use playsync_protocol::{BridgeRequest, OpKind, ServiceResult};

use crate::{AccountBackend, PendingOperations, ProbeHandle, TransportError};

/// The remote identity/data service, as the direct path sees it.
///
/// Playsync doesn't implement the account service client itself — that's
/// the embedding application's job (its REST client, its SDK, whatever).
/// This trait is the seam: one async method that takes a request and
/// returns the service's answer.
///
/// # Contract
///
/// - Return `Ok(ServiceResult::Failure { .. })` when the service
///   processed the request and said no (wrong password, unknown record).
/// - Return `Err(TransportError::Remote(..))` when the request couldn't
///   be delivered or answered at all.
/// - A `RecordFetch` for an id with no record is
///   `Ok(ServiceResult::Success { record: None, .. })`, not a failure —
///   the profile layer decides what a missing record means.
pub trait AccountService: Send + Sync + 'static {
    /// Sends one request to the remote service and awaits its answer.
    fn call(
        &self,
        request: &BridgeRequest,
    ) -> impl Future<Output = Result<ServiceResult, TransportError>> + Send;
}

/// An [`AccountBackend`] that awaits the remote service inline.
///
/// Holds a pending-operation registry purely so the
/// one-in-flight-per-kind guard behaves identically to the bridged
/// variant; the direct path has no completion callback to wait for.
pub struct DirectBackend<S: AccountService> {
    service: S,
    pending: Arc<PendingOperations>,
}

impl<S: AccountService> DirectBackend<S> {
    pub fn new(service: S) -> Self {
        Self {
            service,
            pending: Arc::new(PendingOperations::new()),
        }
    }

    /// The registry used for in-flight bookkeeping.
    pub fn pending(&self) -> &Arc<PendingOperations> {
        &self.pending
    }
}

impl<S: AccountService> AccountBackend for DirectBackend<S> {
    async fn execute(
        &self,
        request: BridgeRequest,
    ) -> Result<ServiceResult, TransportError> {
        let kind = request.kind();

        // Provider sign-in is an OAuth dance only a host environment can
        // run. Refuse before anything leaves the process.
        if matches!(request, BridgeRequest::ProviderSignIn) {
            return Err(TransportError::Unsupported(kind));
        }

        // Claim the slot for the duration of the call so concurrent
        // same-kind operations are rejected exactly as on the bridged
        // variant. The receiver is only bookkeeping here.
        let _slot = self.pending.begin(kind)?;

        tracing::debug!(%kind, "direct call to account service");
        let result = self.service.call(&request).await;

        self.pending.cancel(kind);
        result
    }

    async fn start_probe(&self) -> Result<ProbeHandle, TransportError> {
        let rx = self.pending.begin(OpKind::SessionProbe)?;

        match self.service.call(&BridgeRequest::SessionProbe).await {
            Ok(result) => {
                // Resolve through the registry so the returned handle is
                // already Ready — restoration fail-fasts on its first poll.
                self.pending.resolve(OpKind::SessionProbe, result);
                Ok(ProbeHandle::new(rx, Arc::clone(&self.pending)))
            }
            Err(e) => {
                self.pending.cancel(OpKind::SessionProbe);
                Err(e)
            }
        }
    }
}

// =========================================================================
// Tests
// =========================================================================
