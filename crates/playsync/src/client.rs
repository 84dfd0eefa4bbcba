//! Composition-root constructors.
//!
//! The application builds exactly one session manager at startup, wired
//! for its execution environment. These helpers do the wiring so every
//! embedder shares the same construction order — and so no global state
//! is ever involved: tests call these too, as many times as they like.

use std::sync::Arc;

use playsync_cache::LocalCache;
use playsync_session::{SessionConfig, SessionManager};
use playsync_transport::{
    AccountService, BridgedBackend, BridgedConfig, DirectBackend, HostBridge,
};
use tokio::sync::Mutex;

/// Builds a session manager over a directly awaitable account service.
///
/// For environments where the remote call can be awaited in the caller's
/// own control flow (native builds, tools, servers).
pub fn direct_session_manager<S, C>(
    service: S,
    cache: C,
    config: SessionConfig,
) -> SessionManager<DirectBackend<S>, C>
where
    S: AccountService,
    C: LocalCache,
{
    SessionManager::new(
        Arc::new(DirectBackend::new(service)),
        Arc::new(Mutex::new(cache)),
        config,
    )
}

/// Builds a session manager over a host-bridged backend.
///
/// Returns the manager and a handle to the backend. The handle is what
/// the embedder wires into the host environment's callback glue: every
/// host completion lands through
/// [`BridgedBackend::complete`](playsync_transport::BridgedBackend::complete)
/// (or `complete_json`) on that handle.
pub fn bridged_session_manager<H, C>(
    bridge: H,
    bridged_config: BridgedConfig,
    cache: C,
    config: SessionConfig,
) -> (
    SessionManager<BridgedBackend<H>, C>,
    Arc<BridgedBackend<H>>,
)
where
    H: HostBridge,
    C: LocalCache,
{
    let backend = Arc::new(BridgedBackend::new(bridge, bridged_config));
    let manager = SessionManager::new(
        Arc::clone(&backend),
        Arc::new(Mutex::new(cache)),
        config,
    );
    (manager, backend)
}
