//! Session types: phase machine, configuration, and guest identities.

use std::fmt;
use std::time::Duration;

use playsync_protocol::{SessionTokens, UserId};
use rand::Rng;

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// An established session: who is signed in, and (when this side holds
/// them) the tokens that prove it.
///
/// `tokens` is `None` for guest sessions and for bridged sessions whose
/// host environment retains token custody. The identity id is always
/// present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: UserId,
    pub tokens: Option<SessionTokens>,
}

// ---------------------------------------------------------------------------
// SessionPhase
// ---------------------------------------------------------------------------

/// The lifecycle phase of the session.
///
/// ```text
///   NoSession ──(auth op)──→ Authenticating ──(success)──→ Authenticated
///       ↑                          │                            │
///       │                          │ (failure)                  ▼
///       │                          ▼                       LoggingOut
///       └──────────────────── NoSession ←──────────────────────┘
/// ```
///
/// `Authenticated` can also be entered directly at process start, when
/// session restoration finds a still-valid session.
///
/// Auth operations are mutually exclusive: only one may be
/// `Authenticating` at a time, and a second attempt is rejected rather
/// than queued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// No user is signed in.
    NoSession,
    /// An auth operation is in flight.
    Authenticating,
    /// A session is established and the profile is live.
    Authenticated,
    /// Logout teardown is running.
    LoggingOut,
}

impl SessionPhase {
    /// `true` if a session is established.
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated)
    }

    /// `true` if an operation holds the session exclusively right now.
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Authenticating | Self::LoggingOut)
    }
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoSession => write!(f, "NoSession"),
            Self::Authenticating => write!(f, "Authenticating"),
            Self::Authenticated => write!(f, "Authenticated"),
            Self::LoggingOut => write!(f, "LoggingOut"),
        }
    }
}

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Configuration for session restoration behavior.
///
/// The restore poll loop exists for the bridged backend, where the host
/// environment needs time to initialize and answer the session probe.
/// The defaults give it 1.5 s of warm-up and then about ten seconds of
/// polling before giving up — giving up is a normal "no session" outcome,
/// not an error.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Delay between issuing the session probe and the first poll.
    pub restore_initial_delay: Duration,

    /// Fixed delay between restore poll attempts.
    pub restore_poll_interval: Duration,

    /// Hard cap on restore poll attempts after the initial check.
    pub restore_max_attempts: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            restore_initial_delay: Duration::from_millis(1_500),
            restore_poll_interval: Duration::from_millis(500),
            restore_max_attempts: 20,
        }
    }
}

// ---------------------------------------------------------------------------
// GuestIdentity
// ---------------------------------------------------------------------------

/// A locally minted identity for players who don't want an account.
///
/// Never synced to the remote service. The id's `guest_` prefix is what
/// every other layer branches on to keep guest data local.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuestIdentity {
    pub id: UserId,
    pub display_name: String,
}

impl GuestIdentity {
    /// Generates a fresh guest identity.
    ///
    /// The id carries 128 bits of entropy as 32 hex characters, so two
    /// guests on the same device (or any two devices) won't collide. The
    /// display name is a friendlier `Guest<4 digits>`.
    pub fn generate() -> Self {
        let mut rng = rand::rng();
        let bytes: [u8; 16] = rng.random();
        let entropy: String =
            bytes.iter().map(|b| format!("{b:02x}")).collect();

        Self {
            id: UserId::guest(&entropy),
            display_name: format!("Guest{}", rng.random_range(1000..10000)),
        }
    }
}
