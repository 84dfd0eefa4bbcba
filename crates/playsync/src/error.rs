//! Unified error type for the Playsync meta-crate.

use playsync_cache::CacheError;
use playsync_profile::ProfileError;
use playsync_protocol::ProtocolError;
use playsync_session::SessionError;
use playsync_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// When using the `playsync` meta-crate, you deal with this single error
/// type instead of importing errors from each sub-crate. The `#[from]`
/// attribute on each variant auto-generates `From` impls, so the `?`
/// operator converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum PlaysyncError {
    /// A session-level error (validation, auth, phase).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A profile-level error (reconciliation, missing record).
    #[error(transparent)]
    Profile(#[from] ProfileError),

    /// A transport-level error (delivery, timeout, in-flight guard).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A cache-level error (persistence).
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// A payload-level error (encode, decode).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}
