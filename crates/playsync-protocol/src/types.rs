//! Identity, profile, and bridge payload types.
//!
//! Every type here is either held by the session layer (profile, tokens)
//! or travels across the backend boundary as JSON (requests, results).
//! The serde attributes are load-bearing: the bridged variant hands these
//! payloads to a host environment whose glue code builds and parses the
//! exact same JSON shapes.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// Prefix that distinguishes locally generated guest ids from ids issued
/// by the remote account service.
const GUEST_ID_PREFIX: &str = "guest_";

/// A unique identifier for a user.
///
/// Newtype over the opaque id string the account service issues. Guest
/// identities are generated locally and carry the `guest_` prefix so every
/// layer can tell them apart from remote ids without extra state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Wraps a raw id string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Builds a guest id from locally generated entropy.
    pub fn guest(entropy: &str) -> Self {
        Self(format!("{GUEST_ID_PREFIX}{entropy}"))
    }

    /// Returns the raw id string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `true` if this id was generated locally for a guest identity.
    ///
    /// Guest profiles never sync to the remote service, so several layers
    /// branch on this.
    pub fn is_guest(&self) -> bool {
        self.0.starts_with(GUEST_ID_PREFIX)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Email/password credentials for register and login.
///
/// Ephemeral: built by the caller, handed to the backend, never persisted.
/// `Debug` redacts the password so credentials can appear in error context
/// and logs without leaking secrets.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// The identity fields a successful auth operation returns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: UserId,
    pub email: String,
}

/// Opaque access/refresh token pair issued by the account service.
///
/// The session layer never inspects these — it holds them for the session's
/// lifetime and drops them on logout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionTokens {
    pub access_token: String,
    pub refresh_token: String,
}

// ---------------------------------------------------------------------------
// PlayerProfile
// ---------------------------------------------------------------------------

/// The authoritative record of a player's progression, currency, and
/// unlocks.
///
/// Exactly one profile is live in memory at any time (owned by the profile
/// store). The serde field names match the remote record schema, so this
/// type serializes directly into record create/update payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerProfile {
    /// Immutable once assigned. Remote id for registered accounts,
    /// `guest_`-prefixed for local guest identities.
    pub user_id: UserId,
    pub email: String,
    pub username: String,
    /// Progression counter: highest level index the player has unlocked.
    pub levels_unlocked: u32,
    /// Soft-currency balance.
    pub current_money: i64,
    /// Ids of unlocked cosmetics. A `BTreeSet` keeps serialization order
    /// stable so repeated saves of the same state are byte-identical.
    pub unlocked_cosmetics: BTreeSet<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PlayerProfile {
    /// Progression value for a brand-new profile. Level indices below this
    /// are menu and tutorial entries, so "nothing unlocked yet" still
    /// points at the first playable level.
    pub const INITIAL_LEVELS_UNLOCKED: u32 = 6;

    /// Email recorded on guest profiles, which have no real address.
    pub const GUEST_EMAIL: &'static str = "guest@local";

    /// Builds a fresh profile in the first-unlock state: initial
    /// progression, zero currency, no cosmetics.
    pub fn new(
        user_id: UserId,
        email: impl Into<String>,
        username: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            user_id,
            email: email.into(),
            username: username.into(),
            levels_unlocked: Self::INITIAL_LEVELS_UNLOCKED,
            current_money: 0,
            unlocked_cosmetics: BTreeSet::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Builds a fresh guest profile. Same defaults as [`new`](Self::new)
    /// with the placeholder guest email.
    pub fn new_guest(guest_id: UserId, username: impl Into<String>) -> Self {
        Self::new(guest_id, Self::GUEST_EMAIL, username)
    }

    /// `true` if this profile belongs to a local guest identity and must
    /// never generate remote record traffic.
    pub fn is_guest(&self) -> bool {
        self.user_id.is_guest()
    }

    /// Advances `updated_at` for a remote write.
    ///
    /// `updated_at` must strictly increase on every successful write, so a
    /// clock that hasn't moved (or moved backwards) still produces a
    /// larger value than the previous one.
    pub fn touch(&mut self) {
        let floor = self.updated_at + Duration::milliseconds(1);
        self.updated_at = Utc::now().max(floor);
    }
}

// ---------------------------------------------------------------------------
// OpKind — the operation kinds tracked as pending slots
// ---------------------------------------------------------------------------

/// The kind of an asynchronous backend operation.
///
/// The pending-operation registry holds at most one in-flight operation per
/// kind, and host completion callbacks name the kind they resolve.
///
/// `GuestSignIn` is the one kind that never crosses a backend — guest
/// identities are minted locally — but it participates in the session
/// layer's one-auth-operation-at-a-time contract, so it lives here with
/// the rest.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum OpKind {
    Login,
    Register,
    GuestSignIn,
    ProviderSignIn,
    SessionProbe,
    SignOut,
    RecordCreate,
    RecordFetch,
    RecordUpdate,
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Login => "login",
            Self::Register => "register",
            Self::GuestSignIn => "guest_sign_in",
            Self::ProviderSignIn => "provider_sign_in",
            Self::SessionProbe => "session_probe",
            Self::SignOut => "sign_out",
            Self::RecordCreate => "record_create",
            Self::RecordFetch => "record_fetch",
            Self::RecordUpdate => "record_update",
        };
        write!(f, "{name}")
    }
}

// ---------------------------------------------------------------------------
// BridgeRequest — what the session layer asks a backend to do
// ---------------------------------------------------------------------------

/// A request to the remote account service.
///
/// The direct backend matches on this and awaits the corresponding remote
/// call; the bridged backend serializes it and fires it one-way into the
/// host environment.
///
/// `#[serde(tag = "op")]` produces internally tagged JSON, e.g.
/// `{ "op": "login", "email": "...", "password": "..." }` — the shape the
/// host glue code dispatches on.
///
/// There is deliberately no `GuestSignIn` variant: guest sign-in never
/// touches a backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum BridgeRequest {
    Register {
        email: String,
        password: String,
        username: String,
    },
    Login {
        email: String,
        password: String,
    },
    /// Third-party provider sign-in, driven entirely by the host
    /// environment (OAuth redirect and all).
    ProviderSignIn,
    /// "Is there a still-valid session for this client?" Used by session
    /// restoration after a process restart.
    SessionProbe,
    SignOut,
    RecordCreate {
        record: PlayerProfile,
    },
    RecordFetch {
        user_id: UserId,
    },
    RecordUpdate {
        record: PlayerProfile,
    },
}

impl BridgeRequest {
    /// The operation kind this request occupies in the pending registry.
    pub fn kind(&self) -> OpKind {
        match self {
            Self::Register { .. } => OpKind::Register,
            Self::Login { .. } => OpKind::Login,
            Self::ProviderSignIn => OpKind::ProviderSignIn,
            Self::SessionProbe => OpKind::SessionProbe,
            Self::SignOut => OpKind::SignOut,
            Self::RecordCreate { .. } => OpKind::RecordCreate,
            Self::RecordFetch { .. } => OpKind::RecordFetch,
            Self::RecordUpdate { .. } => OpKind::RecordUpdate,
        }
    }

    /// Serializes the request for a host environment dispatch.
    pub fn to_json(&self) -> Result<String, crate::ProtocolError> {
        serde_json::to_string(self).map_err(crate::ProtocolError::Encode)
    }
}

// ---------------------------------------------------------------------------
// ServiceResult — what comes back
// ---------------------------------------------------------------------------

/// The outcome of a backend operation.
///
/// This is both the direct service's return value and the payload a host
/// environment delivers to the completion callback. "Failure" here means
/// the remote service processed the request and said no (bad credentials,
/// unknown record); delivery problems are transport errors, not results.
///
/// All success fields are optional because different operations return
/// different subsets: auth operations carry `user` and usually `session`,
/// record fetches carry `record` (or nothing, for a missing record), and
/// sign-out carries none of them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ServiceResult {
    Success {
        #[serde(default)]
        user: Option<AuthUser>,
        #[serde(default)]
        session: Option<SessionTokens>,
        #[serde(default)]
        record: Option<PlayerProfile>,
    },
    Failure {
        message: String,
    },
}

impl ServiceResult {
    /// A success carrying nothing (sign-out, fire-and-forget acks).
    pub fn empty_success() -> Self {
        Self::Success {
            user: None,
            session: None,
            record: None,
        }
    }

    /// A success carrying identity fields from an auth operation.
    pub fn authenticated(
        user: AuthUser,
        session: Option<SessionTokens>,
    ) -> Self {
        Self::Success {
            user: Some(user),
            session,
            record: None,
        }
    }

    /// A success carrying a fetched or written record.
    pub fn with_record(record: PlayerProfile) -> Self {
        Self::Success {
            user: None,
            session: None,
            record: Some(record),
        }
    }

    /// A remote-level rejection with a human-readable reason.
    pub fn failure(message: impl Into<String>) -> Self {
        Self::Failure {
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Parses a completion payload delivered by the host environment.
    pub fn from_json(payload: &str) -> Result<Self, crate::ProtocolError> {
        serde_json::from_str(payload).map_err(crate::ProtocolError::Decode)
    }

    /// Serializes the result; used by host glue and test doubles.
    pub fn to_json(&self) -> Result<String, crate::ProtocolError> {
        serde_json::to_string(self).map_err(crate::ProtocolError::Encode)
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    //! Tests for payload types and their JSON shapes.
    //!
    //! The bridged backend exchanges these payloads with host glue code
    //! as JSON strings, so the serde attributes must produce exactly the
    //! shapes documented on each type.

    use super::*;

    // =====================================================================
    // UserId
    // =====================================================================

    #[test]
    fn test_user_id_serializes_as_plain_string() {
        // `#[serde(transparent)]`: UserId("u-1") → `"u-1"`, not `{"0":...}`.
        let json = serde_json::to_string(&UserId::new("u-1")).unwrap();
        assert_eq!(json, "\"u-1\"");
    }

    #[test]
    fn test_user_id_guest_prefix_detected() {
        let guest = UserId::guest("abc123");
        assert!(guest.is_guest());
        assert_eq!(guest.as_str(), "guest_abc123");

        let remote = UserId::new("7f3b9c");
        assert!(!remote.is_guest());
    }

    #[test]
    fn test_user_id_display_is_raw_id() {
        assert_eq!(UserId::new("u-42").to_string(), "u-42");
    }

    // =====================================================================
    // Credentials
    // =====================================================================

    #[test]
    fn test_credentials_debug_redacts_password() {
        let creds = Credentials::new("a@x.com", "hunter2");
        let debug = format!("{creds:?}");
        assert!(debug.contains("a@x.com"));
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("<redacted>"));
    }

    // =====================================================================
    // PlayerProfile
    // =====================================================================

    #[test]
    fn test_new_profile_has_first_unlock_defaults() {
        let p = PlayerProfile::new(UserId::new("u-1"), "a@x.com", "Ann");
        assert_eq!(
            p.levels_unlocked,
            PlayerProfile::INITIAL_LEVELS_UNLOCKED
        );
        assert_eq!(p.current_money, 0);
        assert!(p.unlocked_cosmetics.is_empty());
        assert_eq!(p.created_at, p.updated_at);
    }

    #[test]
    fn test_new_guest_profile_is_flagged_and_uses_guest_email() {
        let p = PlayerProfile::new_guest(UserId::guest("xyz"), "Guest1234");
        assert!(p.is_guest());
        assert_eq!(p.email, PlayerProfile::GUEST_EMAIL);
    }

    #[test]
    fn test_touch_strictly_increases_updated_at() {
        let mut p = PlayerProfile::new(UserId::new("u-1"), "a@x.com", "Ann");
        let before = p.updated_at;
        // Two touches in the same instant must still each move forward.
        p.touch();
        let first = p.updated_at;
        p.touch();
        assert!(first > before);
        assert!(p.updated_at > first);
    }

    #[test]
    fn test_profile_round_trip_preserves_cosmetics_set() {
        let mut p =
            PlayerProfile::new(UserId::new("u-1"), "a@x.com", "Ann");
        p.unlocked_cosmetics.insert("hat_red".into());
        p.unlocked_cosmetics.insert("cape_blue".into());

        let json = serde_json::to_string(&p).unwrap();
        let decoded: PlayerProfile = serde_json::from_str(&json).unwrap();
        assert_eq!(p, decoded);
    }

    #[test]
    fn test_profile_json_uses_record_field_names() {
        // The field names are the remote record schema — renaming one
        // silently breaks record create/update payloads.
        let p = PlayerProfile::new(UserId::new("u-1"), "a@x.com", "Ann");
        let json: serde_json::Value = serde_json::to_value(&p).unwrap();

        assert_eq!(json["user_id"], "u-1");
        assert_eq!(json["levels_unlocked"], 6);
        assert_eq!(json["current_money"], 0);
        assert!(json["unlocked_cosmetics"].is_array());
        assert!(json["created_at"].is_string());
    }

    // =====================================================================
    // OpKind
    // =====================================================================

    #[test]
    fn test_op_kind_serializes_snake_case() {
        let json = serde_json::to_string(&OpKind::ProviderSignIn).unwrap();
        assert_eq!(json, "\"provider_sign_in\"");
    }

    #[test]
    fn test_op_kind_display_matches_serde_name() {
        assert_eq!(OpKind::SessionProbe.to_string(), "session_probe");
        assert_eq!(OpKind::RecordUpdate.to_string(), "record_update");
    }

    // =====================================================================
    // BridgeRequest
    // =====================================================================

    #[test]
    fn test_bridge_request_login_json_format() {
        // `#[serde(tag = "op")]`: internally tagged, fields inline.
        let req = BridgeRequest::Login {
            email: "a@x.com".into(),
            password: "pw".into(),
        };
        let json: serde_json::Value = serde_json::to_value(&req).unwrap();

        assert_eq!(json["op"], "login");
        assert_eq!(json["email"], "a@x.com");
        assert_eq!(json["password"], "pw");
    }

    #[test]
    fn test_bridge_request_kind_mapping() {
        let req = BridgeRequest::RecordFetch {
            user_id: UserId::new("u-1"),
        };
        assert_eq!(req.kind(), OpKind::RecordFetch);
        assert_eq!(BridgeRequest::SessionProbe.kind(), OpKind::SessionProbe);
        assert_eq!(BridgeRequest::SignOut.kind(), OpKind::SignOut);
    }

    #[test]
    fn test_bridge_request_record_update_round_trip() {
        let req = BridgeRequest::RecordUpdate {
            record: PlayerProfile::new(UserId::new("u-1"), "a@x.com", "Ann"),
        };
        let json = req.to_json().unwrap();
        let decoded: BridgeRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(req, decoded);
    }

    // =====================================================================
    // ServiceResult
    // =====================================================================

    #[test]
    fn test_service_result_success_json_format() {
        let result = ServiceResult::authenticated(
            AuthUser {
                id: UserId::new("u-1"),
                email: "a@x.com".into(),
            },
            Some(SessionTokens {
                access_token: "at".into(),
                refresh_token: "rt".into(),
            }),
        );
        let json: serde_json::Value =
            serde_json::to_value(&result).unwrap();

        assert_eq!(json["status"], "success");
        assert_eq!(json["user"]["id"], "u-1");
        assert_eq!(json["session"]["access_token"], "at");
        assert!(json["record"].is_null());
    }

    #[test]
    fn test_service_result_failure_json_format() {
        let result = ServiceResult::failure("invalid credentials");
        let json: serde_json::Value =
            serde_json::to_value(&result).unwrap();

        assert_eq!(json["status"], "failure");
        assert_eq!(json["message"], "invalid credentials");
    }

    #[test]
    fn test_service_result_from_json_tolerates_missing_fields() {
        // Host glue may omit fields it has nothing for — `#[serde(default)]`
        // fills them with None instead of failing the parse.
        let result =
            ServiceResult::from_json(r#"{"status":"success"}"#).unwrap();
        assert!(matches!(
            result,
            ServiceResult::Success {
                user: None,
                session: None,
                record: None,
            }
        ));
    }

    #[test]
    fn test_service_result_from_json_garbage_returns_decode_error() {
        let result = ServiceResult::from_json("not json");
        assert!(result.is_err());
    }

    #[test]
    fn test_service_result_from_json_unknown_status_returns_error() {
        let result =
            ServiceResult::from_json(r#"{"status":"exploded"}"#);
        assert!(result.is_err());
    }
}
