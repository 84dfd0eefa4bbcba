//! # Playsync
//!
//! Session, identity, and player-profile synchronization for web games.
//!
//! Playsync authenticates a user (or mints a local guest identity),
//! keeps exactly one authoritative [`PlayerProfile`] consistent between
//! a local cache and a remote account service, and recovers a
//! still-valid session after a process restart. It gives two execution
//! environments an identical asynchronous contract:
//!
//! - **Direct** — the remote call is awaited in the caller's own control
//!   flow. You implement [`AccountService`] with your service client.
//! - **Bridged** — the call crosses an embedding boundary: a one-way
//!   request goes into the host environment, and a later, independently
//!   invoked completion callback resolves the awaiting future. You
//!   implement [`HostBridge`] and route the host's callbacks into
//!   [`BridgedBackend::complete`].
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use playsync::prelude::*;
//!
//! # struct MyServiceClient;
//! # impl AccountService for MyServiceClient {
//! #     async fn call(
//! #         &self,
//! #         _request: &BridgeRequest,
//! #     ) -> Result<ServiceResult, TransportError> {
//! #         Ok(ServiceResult::empty_success())
//! #     }
//! # }
//! # async fn run() -> Result<(), PlaysyncError> {
//! let mut sessions = playsync::direct_session_manager(
//!     MyServiceClient,
//!     MemoryCache::new(),
//!     SessionConfig::default(),
//! );
//!
//! // At startup, look for a surviving session before showing login UI.
//! if sessions.restore_session().await?.is_none() {
//!     let creds = Credentials::new("a@x.com", "pw");
//!     sessions.login(&creds).await?;
//! }
//! # Ok(())
//! # }
//! ```
//!
//! [`PlayerProfile`]: playsync_protocol::PlayerProfile
//! [`AccountService`]: playsync_transport::AccountService
//! [`HostBridge`]: playsync_transport::HostBridge
//! [`BridgedBackend::complete`]: playsync_transport::BridgedBackend::complete

mod client;
mod error;

pub use client::{bridged_session_manager, direct_session_manager};
pub use error::PlaysyncError;

/// Everything an embedder typically needs, in one import.
pub mod prelude {
    pub use crate::{
        bridged_session_manager, direct_session_manager, PlaysyncError,
    };
    pub use playsync_cache::{
        keys, CacheError, CacheValue, FileCache, LocalCache, MemoryCache,
    };
    pub use playsync_profile::{ProfileError, ProfileStore};
    pub use playsync_protocol::{
        AuthUser, BridgeRequest, Credentials, OpKind, PlayerProfile,
        ProtocolError, ServiceResult, SessionTokens, UserId,
    };
    pub use playsync_session::{
        GuestIdentity, Session, SessionConfig, SessionError, SessionManager,
        SessionPhase,
    };
    pub use playsync_transport::{
        AccountBackend, AccountService, BridgedBackend, BridgedConfig,
        DirectBackend, HostBridge, PendingOperations, ProbeHandle,
        ProbeStatus, TransportError,
    };
}
