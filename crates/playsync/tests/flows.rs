//! Integration tests for full session flows on both backend variants.
//!
//! The direct variant runs against an in-memory account service that
//! behaves like the real thing (accounts, records, an active session).
//! The bridged variant runs against a channel-backed host double: a
//! spawned "host" task receives one-way requests and answers through the
//! completion entry point, exactly as host glue code would.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use playsync::prelude::*;
use tokio::sync::mpsc;

fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// =========================================================================
// Direct variant: in-memory account service
// =========================================================================

#[derive(Default)]
struct ServiceState {
    /// email → (password, user id)
    accounts: HashMap<String, (String, UserId)>,
    /// user id → record
    records: HashMap<String, PlayerProfile>,
    /// The service-side session, surviving until sign-out.
    active_session: Option<AuthUser>,
    next_id: u64,
    calls: u64,
}

/// An account service double with realistic semantics, shareable across
/// "process restarts" (multiple managers over the same state).
#[derive(Clone, Default)]
struct SharedService(Arc<StdMutex<ServiceState>>);

impl SharedService {
    fn new() -> Self {
        Self::default()
    }

    fn calls(&self) -> u64 {
        self.0.lock().unwrap().calls
    }
}

fn tokens() -> SessionTokens {
    SessionTokens {
        access_token: "tok-access".into(),
        refresh_token: "tok-refresh".into(),
    }
}

impl AccountService for SharedService {
    async fn call(
        &self,
        request: &BridgeRequest,
    ) -> Result<ServiceResult, TransportError> {
        let mut st = self.0.lock().unwrap();
        st.calls += 1;

        Ok(match request {
            BridgeRequest::Register { email, password, .. } => {
                if st.accounts.contains_key(email) {
                    ServiceResult::failure("email already registered")
                } else {
                    let id = UserId::new(format!("u-{}", st.next_id));
                    st.next_id += 1;
                    st.accounts
                        .insert(email.clone(), (password.clone(), id.clone()));
                    let user = AuthUser {
                        id,
                        email: email.clone(),
                    };
                    st.active_session = Some(user.clone());
                    ServiceResult::authenticated(user, Some(tokens()))
                }
            }
            BridgeRequest::Login { email, password } => {
                match st.accounts.get(email) {
                    Some((pw, id)) if pw == password => {
                        let user = AuthUser {
                            id: id.clone(),
                            email: email.clone(),
                        };
                        st.active_session = Some(user.clone());
                        ServiceResult::authenticated(user, Some(tokens()))
                    }
                    _ => ServiceResult::failure("invalid credentials"),
                }
            }
            BridgeRequest::ProviderSignIn => {
                ServiceResult::failure("provider sign-in not available")
            }
            BridgeRequest::SessionProbe => match &st.active_session {
                Some(user) => ServiceResult::authenticated(
                    user.clone(),
                    Some(tokens()),
                ),
                None => ServiceResult::failure("no session"),
            },
            BridgeRequest::SignOut => {
                st.active_session = None;
                ServiceResult::empty_success()
            }
            BridgeRequest::RecordCreate { record } => {
                st.records
                    .insert(record.user_id.as_str().into(), record.clone());
                ServiceResult::with_record(record.clone())
            }
            BridgeRequest::RecordFetch { user_id } => {
                match st.records.get(user_id.as_str()) {
                    Some(record) => ServiceResult::with_record(record.clone()),
                    None => ServiceResult::empty_success(),
                }
            }
            BridgeRequest::RecordUpdate { record } => {
                if st.records.contains_key(record.user_id.as_str()) {
                    st.records.insert(
                        record.user_id.as_str().into(),
                        record.clone(),
                    );
                    ServiceResult::with_record(record.clone())
                } else {
                    ServiceResult::failure("no record to update")
                }
            }
        })
    }
}

type DirectManager = SessionManager<DirectBackend<SharedService>, MemoryCache>;

fn direct_manager(service: &SharedService) -> DirectManager {
    playsync::direct_session_manager(
        service.clone(),
        MemoryCache::new(),
        SessionConfig::default(),
    )
}

fn creds() -> Credentials {
    Credentials::new("a@x.com", "pw")
}

// =========================================================================
// Direct flows
// =========================================================================

#[tokio::test]
async fn test_direct_register_login_logout_scenario() {
    init_tracing();
    let service = SharedService::new();
    let mut mgr = direct_manager(&service);

    // Register: fresh profile in the first-unlock state.
    let registered = mgr
        .register(&creds(), "pw", "Ann")
        .await
        .expect("register should succeed");
    {
        let profile = mgr.profile().current().expect("profile is live");
        assert_eq!(
            profile.levels_unlocked,
            PlayerProfile::INITIAL_LEVELS_UNLOCKED
        );
        assert_eq!(profile.current_money, 0);
        assert!(profile.unlocked_cosmetics.is_empty());
    }

    // Logout: everything local is gone.
    mgr.logout().await.expect("logout should succeed");
    assert!(mgr.profile().current().is_none());
    assert!(mgr.session().is_none());

    // The logout flag suppresses exactly one restore.
    assert!(mgr.restore_session().await.unwrap().is_none());

    // Login with the same credentials: same user id as at register time.
    let logged_in = mgr.login(&creds()).await.expect("login should succeed");
    assert_eq!(logged_in.user_id, registered.user_id);
}

#[tokio::test]
async fn test_direct_login_wrong_password_is_auth_failed() {
    let service = SharedService::new();
    let mut mgr = direct_manager(&service);
    mgr.register(&creds(), "pw", "Ann").await.unwrap();
    mgr.logout().await.unwrap();

    let wrong = Credentials::new("a@x.com", "not-the-password");
    let result = mgr.login(&wrong).await;

    assert!(matches!(result, Err(SessionError::AuthFailed(_))));
}

#[tokio::test]
async fn test_direct_unlocks_survive_logout_and_relogin() {
    // Progression written through persist must come back from the
    // remote record on the next login — remote wins, nothing is lost.
    let service = SharedService::new();
    let mut mgr = direct_manager(&service);
    mgr.register(&creds(), "pw", "Ann").await.unwrap();

    mgr.profile_mut().unlock_cosmetic("hat_red").await.unwrap();
    mgr.profile_mut().set_money(120).await.unwrap();
    mgr.profile_mut().unlock_level(8).await.unwrap();

    mgr.logout().await.unwrap();
    assert!(mgr.restore_session().await.unwrap().is_none()); // eat the flag

    mgr.login(&creds()).await.unwrap();
    let profile = mgr.profile().current().unwrap();
    assert!(profile.unlocked_cosmetics.contains("hat_red"));
    assert_eq!(profile.current_money, 120);
    assert_eq!(profile.levels_unlocked, 8);
}

#[tokio::test]
async fn test_direct_guest_lifecycle_never_reaches_service() {
    init_tracing();
    let service = SharedService::new();
    let cache = MemoryCache::new();

    let mut mgr = playsync::direct_session_manager(
        service.clone(),
        cache,
        SessionConfig::default(),
    );

    let session = mgr.login_as_guest().await.unwrap();
    assert!(session.user_id.is_guest());
    assert!(mgr
        .profile()
        .current()
        .unwrap()
        .unlocked_cosmetics
        .is_empty());

    // Guest progression persists locally only.
    mgr.profile_mut().unlock_level(7).await.unwrap();

    assert_eq!(service.calls(), 0, "guests generate no remote traffic");
}

#[tokio::test]
async fn test_direct_guest_restores_across_restart() {
    let service = SharedService::new();
    let cache = Arc::new(tokio::sync::Mutex::new(MemoryCache::new()));

    let backend =
        Arc::new(DirectBackend::new(service.clone()));
    let mut first_run = SessionManager::new(
        Arc::clone(&backend),
        Arc::clone(&cache),
        SessionConfig::default(),
    );
    let original = first_run.login_as_guest().await.unwrap();
    first_run.profile_mut().unlock_level(7).await.unwrap();

    // "Restart": a fresh manager over the same cache.
    let mut next_run = SessionManager::new(
        Arc::clone(&backend),
        Arc::clone(&cache),
        SessionConfig::default(),
    );
    let restored = next_run
        .restore_session()
        .await
        .unwrap()
        .expect("guest session should restore from cache");

    assert_eq!(restored.user_id, original.user_id);
    assert_eq!(
        next_run.profile().current().unwrap().levels_unlocked,
        7
    );
    assert_eq!(service.calls(), 0);
}

#[tokio::test]
async fn test_direct_restore_finds_surviving_remote_session() {
    // The service still holds a session from the previous run; a fresh
    // manager must discover it without a login.
    let service = SharedService::new();
    let mut previous_run = direct_manager(&service);
    let original = previous_run.register(&creds(), "pw", "Ann").await.unwrap();
    // No logout — the process just died.

    let mut next_run = direct_manager(&service);
    let restored = next_run
        .restore_session()
        .await
        .unwrap()
        .expect("session should be discovered");

    assert_eq!(restored.user_id, original.user_id);
    assert_eq!(next_run.phase(), SessionPhase::Authenticated);
    assert_eq!(
        next_run.profile().current().map(|p| p.username.as_str()),
        Some("Ann")
    );
}

#[tokio::test]
async fn test_direct_provider_sign_in_is_unsupported() {
    let service = SharedService::new();
    let mut mgr = direct_manager(&service);

    let result = mgr.sign_in_with_provider().await;

    assert!(matches!(
        result,
        Err(SessionError::Transport(TransportError::Unsupported(
            OpKind::ProviderSignIn
        )))
    ));
    assert_eq!(service.calls(), 0, "refused before any remote traffic");
}

// =========================================================================
// Bridged variant: channel-backed host double
// =========================================================================

/// Outbound half of the host boundary: requests go into a channel the
/// "host" task drains.
struct ChannelBridge {
    tx: mpsc::UnboundedSender<BridgeRequest>,
}

impl HostBridge for ChannelBridge {
    fn dispatch(&self, request: &BridgeRequest) -> Result<(), TransportError> {
        self.tx
            .send(request.clone())
            .map_err(|_| TransportError::Bridge("host is gone".into()))
    }
}

type BridgedManager =
    SessionManager<BridgedBackend<ChannelBridge>, MemoryCache>;

/// Builds a bridged manager plus a host task that answers requests with
/// `respond`. Returning `None` leaves the request unanswered, like host
/// glue that lost the callback.
fn bridged_manager<F>(
    respond: F,
    completion_timeout: Duration,
) -> (BridgedManager, Arc<BridgedBackend<ChannelBridge>>)
where
    F: Fn(&BridgeRequest) -> Option<ServiceResult> + Send + Sync + 'static,
{
    let (tx, mut rx) = mpsc::unbounded_channel();
    let (manager, backend) = playsync::bridged_session_manager(
        ChannelBridge { tx },
        BridgedConfig { completion_timeout },
        MemoryCache::new(),
        SessionConfig::default(),
    );

    let completer = Arc::clone(&backend);
    tokio::spawn(async move {
        while let Some(request) = rx.recv().await {
            if let Some(result) = respond(&request) {
                completer.complete(request.kind(), result);
            }
        }
    });

    (manager, backend)
}

fn bridged_user(id: &str, email: &str) -> ServiceResult {
    ServiceResult::authenticated(
        AuthUser {
            id: UserId::new(id),
            email: email.into(),
        },
        None, // host keeps token custody
    )
}

// =========================================================================
// Bridged flows
// =========================================================================

#[tokio::test]
async fn test_bridged_login_resolves_via_host_completion() {
    init_tracing();
    let (mut mgr, _backend) = bridged_manager(
        |request| match request {
            BridgeRequest::Login { .. } => {
                Some(bridged_user("u-77", "a@x.com"))
            }
            BridgeRequest::RecordFetch { user_id } => {
                Some(ServiceResult::with_record(PlayerProfile::new(
                    user_id.clone(),
                    "a@x.com",
                    "Ann",
                )))
            }
            _ => None,
        },
        Duration::from_secs(5),
    );

    let session = mgr.login(&creds()).await.expect("login should succeed");

    assert_eq!(session.user_id.as_str(), "u-77");
    assert!(session.tokens.is_none(), "host retains token custody");
    assert!(mgr.profile().current().is_some());
}

#[tokio::test]
async fn test_bridged_register_creates_record_through_host() {
    let (mut mgr, _backend) = bridged_manager(
        |request| match request {
            BridgeRequest::Register { .. } => {
                Some(bridged_user("u-5", "a@x.com"))
            }
            BridgeRequest::RecordCreate { record } => {
                Some(ServiceResult::with_record(record.clone()))
            }
            _ => None,
        },
        Duration::from_secs(5),
    );

    let session = mgr.register(&creds(), "pw", "Ann").await.unwrap();

    assert_eq!(session.user_id.as_str(), "u-5");
    assert_eq!(mgr.profile().current().unwrap().username, "Ann");
}

#[tokio::test(start_paused = true)]
async fn test_bridged_timeout_then_retry_succeeds() {
    // The host drops the first login on the floor; the operation times
    // out, the slot is cleared, and a retry goes through cleanly.
    let attempts = Arc::new(StdMutex::new(0u32));
    let seen = Arc::clone(&attempts);

    let (mut mgr, _backend) = bridged_manager(
        move |request| match request {
            BridgeRequest::Login { .. } => {
                let mut n = seen.lock().unwrap();
                *n += 1;
                if *n == 1 {
                    None // lost callback
                } else {
                    Some(bridged_user("u-1", "a@x.com"))
                }
            }
            BridgeRequest::RecordFetch { user_id } => {
                Some(ServiceResult::with_record(PlayerProfile::new(
                    user_id.clone(),
                    "a@x.com",
                    "Ann",
                )))
            }
            _ => None,
        },
        Duration::from_millis(100),
    );

    let first = mgr.login(&creds()).await;
    assert!(matches!(
        first,
        Err(SessionError::Transport(TransportError::Timeout(
            OpKind::Login
        )))
    ));
    assert_eq!(mgr.phase(), SessionPhase::NoSession);

    let second = mgr.login(&creds()).await.expect("retry should succeed");
    assert_eq!(second.user_id.as_str(), "u-1");
}

#[tokio::test(start_paused = true)]
async fn test_bridged_restore_polls_until_host_answers() {
    init_tracing();
    let (mut mgr, _backend) = bridged_manager(
        |request| match request {
            BridgeRequest::SessionProbe => {
                Some(bridged_user("u-3", "a@x.com"))
            }
            BridgeRequest::RecordFetch { user_id } => {
                Some(ServiceResult::with_record(PlayerProfile::new(
                    user_id.clone(),
                    "a@x.com",
                    "Ann",
                )))
            }
            _ => None,
        },
        Duration::from_secs(5),
    );

    let restored = mgr
        .restore_session()
        .await
        .unwrap()
        .expect("probe should find the session");

    assert_eq!(restored.user_id.as_str(), "u-3");
    assert_eq!(mgr.phase(), SessionPhase::Authenticated);
}

#[tokio::test(start_paused = true)]
async fn test_bridged_restore_gives_up_when_host_stays_silent() {
    let (mut mgr, _backend) = bridged_manager(
        |_request| None, // host never answers anything
        Duration::from_secs(5),
    );

    let restored = mgr.restore_session().await.unwrap();

    assert!(restored.is_none(), "exhaustion is a normal no-session");
    assert_eq!(mgr.phase(), SessionPhase::NoSession);
}

#[tokio::test]
async fn test_bridged_provider_sign_in_first_time_user() {
    let (mut mgr, _backend) = bridged_manager(
        |request| match request {
            BridgeRequest::ProviderSignIn => {
                Some(bridged_user("u-9", "bob@provider.test"))
            }
            // First-time provider user: no record yet, then create.
            BridgeRequest::RecordFetch { .. } => {
                Some(ServiceResult::empty_success())
            }
            BridgeRequest::RecordCreate { record } => {
                Some(ServiceResult::with_record(record.clone()))
            }
            _ => None,
        },
        Duration::from_secs(5),
    );

    let session = mgr.sign_in_with_provider().await.unwrap();

    assert_eq!(session.user_id.as_str(), "u-9");
    assert_eq!(mgr.profile().current().unwrap().username, "bob");
}

#[tokio::test]
async fn test_bridged_unsolicited_completion_is_dropped() {
    // The host completes an operation nobody started: logged and
    // dropped, nothing crashes, nothing changes.
    let (mgr, backend) = bridged_manager(
        |_request| None,
        Duration::from_secs(5),
    );

    let delivered = backend.complete(
        OpKind::Login,
        ServiceResult::empty_success(),
    );

    assert!(!delivered);
    assert!(mgr.session().is_none());
    assert_eq!(mgr.phase(), SessionPhase::NoSession);
}

#[tokio::test]
async fn test_bridged_completion_payload_from_json() {
    // Host glue delivers raw JSON; the typed result comes out the other
    // side of the pending slot.
    let (mut mgr, backend) = bridged_manager(
        |_request| None, // this test completes by hand
        Duration::from_secs(5),
    );

    let completer = Arc::clone(&backend);
    let host = tokio::spawn(async move {
        while !completer.pending().is_pending(OpKind::Login) {
            tokio::task::yield_now().await;
        }
        completer
            .complete_json(
                OpKind::Login,
                r#"{
                    "status": "success",
                    "user": { "id": "u-json", "email": "a@x.com" },
                    "session": {
                        "access_token": "at",
                        "refresh_token": "rt"
                    }
                }"#,
            )
            .expect("payload should parse");

        while !completer.pending().is_pending(OpKind::RecordFetch) {
            tokio::task::yield_now().await;
        }
        completer
            .complete_json(
                OpKind::RecordFetch,
                r#"{
                    "status": "success",
                    "record": {
                        "user_id": "u-json",
                        "email": "a@x.com",
                        "username": "Ann",
                        "levels_unlocked": 6,
                        "current_money": 0,
                        "unlocked_cosmetics": [],
                        "created_at": "2026-08-07T10:00:00Z",
                        "updated_at": "2026-08-07T10:00:00Z"
                    }
                }"#,
            )
            .expect("payload should parse");
    });

    let session = mgr.login(&creds()).await.expect("login should succeed");

    assert_eq!(session.user_id.as_str(), "u-json");
    assert_eq!(
        session.tokens.as_ref().map(|t| t.access_token.as_str()),
        Some("at")
    );
    host.await.unwrap();
}
