//! Error types for the profile layer.

use playsync_cache::CacheError;
use playsync_protocol::UserId;
use playsync_transport::TransportError;

/// Errors that can occur managing the player profile.
#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    /// The remote service has no record for this user.
    #[error("no player record found for {0}")]
    NotFound(UserId),

    /// The operation needs a live profile and none is loaded.
    /// Happens when progression mutations arrive before login completes
    /// (or after logout).
    #[error("no live profile to operate on")]
    NoProfile,

    /// An update tried to change the profile's user id, which is
    /// immutable once assigned.
    #[error("profile user id is immutable (live {live}, attempted {attempted})")]
    IdentityMismatch { live: UserId, attempted: UserId },

    /// The remote service processed a record operation and rejected it.
    #[error("record operation rejected: {0}")]
    Remote(String),

    /// The record operation could not be delivered or completed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Mirroring to the local cache failed.
    #[error(transparent)]
    Cache(#[from] CacheError),
}
