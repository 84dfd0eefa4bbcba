//! Bridged backend: one-way requests into a host environment, resolved by
//! out-of-band completion callbacks.

use std::sync::Arc;
use std::time::Duration;

use playsync_protocol::{
    BridgeRequest, OpKind, ProtocolError, ServiceResult,
};

use crate::{AccountBackend, PendingOperations, ProbeHandle, TransportError};

/// The host environment's outbound seam.
///
/// `dispatch` hands a request across the embedding boundary and returns
/// immediately — the host cannot be awaited from in here. The host later
/// answers by invoking [`BridgedBackend::complete`] (or
/// [`complete_json`](BridgedBackend::complete_json)) from whatever call
/// stack it pleases.
///
/// Implementations are typically thin: serialize the request and poke the
/// host's exported function.
pub trait HostBridge: Send + Sync + 'static {
    /// Fires one request into the host environment, without waiting.
    fn dispatch(&self, request: &BridgeRequest) -> Result<(), TransportError>;
}

/// Configuration for the bridged backend.
#[derive(Debug, Clone)]
pub struct BridgedConfig {
    /// How long an operation may wait for its host completion before it
    /// resolves to a timeout and its slot is cleared.
    pub completion_timeout: Duration,
}

impl Default for BridgedConfig {
    fn default() -> Self {
        Self {
            completion_timeout: Duration::from_secs(10),
        }
    }
}

/// An [`AccountBackend`] that crosses an embedding boundary.
///
/// `execute` claims the pending slot for the request's kind, fires the
/// one-way request, and awaits the slot's future under the configured
/// timeout. The host resolves that future by calling
/// [`complete`](Self::complete) — the only entry point in this layer that
/// may run on a foreign call stack, which is why it touches nothing but
/// the registry.
///
/// Embedders hold the backend in an [`Arc`]: one clone wired into the
/// host's callback glue, one handed to the session layer.
pub struct BridgedBackend<H: HostBridge> {
    bridge: H,
    pending: Arc<PendingOperations>,
    config: BridgedConfig,
}

impl<H: HostBridge> BridgedBackend<H> {
    pub fn new(bridge: H, config: BridgedConfig) -> Self {
        Self {
            bridge,
            pending: Arc::new(PendingOperations::new()),
            config,
        }
    }

    /// The registry host completions resolve into.
    pub fn pending(&self) -> &Arc<PendingOperations> {
        &self.pending
    }

    /// Host-invoked completion entry point.
    ///
    /// Called asynchronously by the host environment — potentially from a
    /// call stack unrelated to the one that started the operation. If no
    /// operation of this kind is pending (never started, already
    /// resolved, or timed out), the result is dropped with a logged
    /// warning and `false` is returned; this must never crash.
    pub fn complete(&self, kind: OpKind, result: ServiceResult) -> bool {
        self.pending.resolve(kind, result)
    }

    /// Completion entry point for hosts that deliver raw JSON payloads.
    ///
    /// # Errors
    /// Returns the decode error if the payload doesn't parse; the pending
    /// slot is left untouched so the operation can still time out
    /// normally rather than hang on a garbled payload.
    pub fn complete_json(
        &self,
        kind: OpKind,
        payload: &str,
    ) -> Result<bool, ProtocolError> {
        let result = ServiceResult::from_json(payload)?;
        Ok(self.complete(kind, result))
    }
}

impl<H: HostBridge> AccountBackend for BridgedBackend<H> {
    async fn execute(
        &self,
        request: BridgeRequest,
    ) -> Result<ServiceResult, TransportError> {
        let kind = request.kind();

        // Claim the slot before dispatching: once the request crosses the
        // boundary, the completion can race back in on another stack.
        let rx = self.pending.begin(kind)?;

        if let Err(e) = self.bridge.dispatch(&request) {
            self.pending.cancel(kind);
            return Err(e);
        }
        tracing::debug!(%kind, "request dispatched to host environment");

        match tokio::time::timeout(self.config.completion_timeout, rx).await {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(_closed)) => {
                // The sender vanished without sending — the slot was
                // cancelled out from under us.
                Err(TransportError::Bridge(format!(
                    "{kind} completion channel closed before a result arrived"
                )))
            }
            Err(_elapsed) => {
                self.pending.cancel(kind);
                tracing::warn!(
                    %kind,
                    timeout_ms = self.config.completion_timeout.as_millis() as u64,
                    "no host completion within the window; slot cleared"
                );
                Err(TransportError::Timeout(kind))
            }
        }
    }

    async fn start_probe(&self) -> Result<ProbeHandle, TransportError> {
        let rx = self.pending.begin(OpKind::SessionProbe)?;

        if let Err(e) = self.bridge.dispatch(&BridgeRequest::SessionProbe) {
            self.pending.cancel(OpKind::SessionProbe);
            return Err(e);
        }
        tracing::debug!("session probe dispatched to host environment");

        Ok(ProbeHandle::new(rx, Arc::clone(&self.pending)))
    }
}

// =========================================================================
// Tests
// =========================================================================
