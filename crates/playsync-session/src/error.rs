//! Error types for the session layer.

use playsync_cache::CacheError;
use playsync_profile::ProfileError;
use playsync_transport::TransportError;

/// Errors that can occur orchestrating a session.
///
/// Every public operation returns one of these as a typed failure; none
/// panic or swallow. Retry policy belongs to the caller — the session
/// layer reports what happened and leaves the state machine consistent.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The input was rejected locally and never reached a backend
    /// (password/confirmation mismatch, empty username).
    #[error("validation failed: {0}")]
    Validation(String),

    /// The remote service rejected the credentials or the sign-in.
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// Another auth operation is mid-flight; concurrent attempts are
    /// rejected rather than queued, so the first caller is never
    /// orphaned.
    #[error("another authentication operation is already in progress")]
    AuthInProgress,

    /// A session is already established. Log out before signing in as
    /// someone else.
    #[error("a session is already active; log out first")]
    AlreadyAuthenticated,

    /// The service reported success but omitted the identity fields the
    /// session needs, so no session can be established from it.
    #[error("service result is missing identity fields")]
    IncompleteIdentity,

    /// The operation could not be delivered or completed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Profile reconciliation failed.
    #[error(transparent)]
    Profile(#[from] ProfileError),

    /// Persisting session flags failed.
    #[error(transparent)]
    Cache(#[from] CacheError),
}
