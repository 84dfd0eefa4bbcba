//! Error types for the transport layer.

use playsync_protocol::{OpKind, ProtocolError};

/// Errors that can occur delivering a request to the account service.
///
/// These cover *delivery* problems only. A remote service that processed
/// the request and rejected it (bad credentials, unknown record) answers
/// with a failure result, not a transport error — the distinction is what
/// lets callers tell "try different credentials" from "try again later".
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The remote call could not be completed (network failure, service
    /// unreachable).
    #[error("remote call failed: {0}")]
    Remote(String),

    /// Handing the request to the host environment failed, or the
    /// completion channel died before a result arrived.
    #[error("host bridge failed: {0}")]
    Bridge(String),

    /// A bridged operation's completion never arrived within the
    /// configured window. The pending slot is cleared; a completion
    /// arriving later is dropped with a warning.
    #[error("{0} operation timed out waiting for completion")]
    Timeout(OpKind),

    /// An operation of this kind is already in flight. Starting another
    /// would orphan the first caller, so it is rejected instead.
    #[error("a {0} operation is already in flight")]
    AlreadyInFlight(OpKind),

    /// The active backend cannot service this operation kind (e.g.
    /// provider sign-in outside a host environment).
    #[error("{0} is not supported by this backend")]
    Unsupported(OpKind),

    /// A request or completion payload failed to encode/decode.
    #[error(transparent)]
    Payload(#[from] ProtocolError),
}
