//! The session manager: orchestrates every identity operation.
//!
//! This is the single entry point the embedding application talks to.
//! Each operation picks the path through the lower layers:
//!
//! ```text
//! register ──→ backend.execute(Register) ──→ profile.create ──→ cache
//! login ─────→ backend.execute(Login) ─────→ profile.load_from_remote
//! guest ─────→ (no backend) ───────────────→ profile.create_guest
//! provider ──→ backend.execute(ProviderSignIn) → profile.load_or_create
//! logout ────→ best-effort SignOut ─────────→ unconditional teardown
//! restore ───→ probe + bounded poll ────────→ profile.load_from_remote
//! ```
//!
//! # Concurrency note
//!
//! The manager is owned by a single logical task and takes `&mut self`
//! for every operation — the phase guard exists for the cases the borrow
//! checker can't see (an embedder driving the backend through its own
//! handle, a phase left mid-way by a cancelled future). The only truly
//! concurrent entry point in the system is the bridged backend's
//! completion callback, which synchronizes through the pending-operation
//! registry, never through this type.

use std::sync::Arc;

use playsync_cache::{keys, LocalCache};
use playsync_profile::ProfileStore;
use playsync_protocol::{
    AuthUser, BridgeRequest, Credentials, ServiceResult, SessionTokens,
    UserId,
};
use playsync_transport::{AccountBackend, ProbeStatus};
use tokio::sync::Mutex;

use crate::{
    GuestIdentity, Session, SessionConfig, SessionError, SessionPhase,
};

/// Orchestrates authentication, session lifecycle, and restoration.
///
/// Construct one at the application's composition root with the backend
/// variant that matches the execution environment, and keep it for the
/// process lifetime. Tests construct as many as they need.
pub struct SessionManager<B, C> {
    backend: Arc<B>,
    cache: Arc<Mutex<C>>,
    profile: ProfileStore<B, C>,
    session: Option<Session>,
    phase: SessionPhase,
    config: SessionConfig,
}

impl<B, C> SessionManager<B, C>
where
    B: AccountBackend,
    C: LocalCache,
{
    /// Creates a manager over the given backend and cache.
    ///
    /// The profile store is built over the same handles, so the manager
    /// and its store always agree on where state lives.
    pub fn new(
        backend: Arc<B>,
        cache: Arc<Mutex<C>>,
        config: SessionConfig,
    ) -> Self {
        let profile =
            ProfileStore::new(Arc::clone(&backend), Arc::clone(&cache));
        Self {
            backend,
            cache,
            profile,
            session: None,
            phase: SessionPhase::NoSession,
            config,
        }
    }

    /// The established session, if any.
    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// The current lifecycle phase.
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Read access to the profile store.
    pub fn profile(&self) -> &ProfileStore<B, C> {
        &self.profile
    }

    /// Mutable access to the profile store, for progression and unlock
    /// events.
    pub fn profile_mut(&mut self) -> &mut ProfileStore<B, C> {
        &mut self.profile
    }

    // -----------------------------------------------------------------
    // Operations
    // -----------------------------------------------------------------

    /// Registers a new account and establishes its session.
    ///
    /// Validation failures never reach a backend. On remote failure no
    /// local profile is created — a failed registration leaves no
    /// partial state.
    pub async fn register(
        &mut self,
        credentials: &Credentials,
        confirm_password: &str,
        username: &str,
    ) -> Result<Session, SessionError> {
        if credentials.password != confirm_password {
            return Err(SessionError::Validation(
                "password and confirmation do not match".into(),
            ));
        }
        if username.trim().is_empty() {
            return Err(SessionError::Validation(
                "username must not be empty".into(),
            ));
        }

        self.begin_auth()?;
        tracing::info!(email = %credentials.email, "registering new account");

        let outcome = self
            .backend
            .execute(BridgeRequest::Register {
                email: credentials.email.clone(),
                password: credentials.password.clone(),
                username: username.to_string(),
            })
            .await
            .map_err(SessionError::from)
            .and_then(identity_of);
        let (user, tokens) = match outcome {
            Ok(identity) => identity,
            Err(e) => return Err(self.fail_auth(e)),
        };

        if let Err(e) = self
            .profile
            .create(user.id.clone(), &user.email, username)
            .await
        {
            return Err(self.fail_auth(e.into()));
        }

        Ok(self.finish_auth(user.id, tokens))
    }

    /// Signs in with email and password and loads the remote profile.
    pub async fn login(
        &mut self,
        credentials: &Credentials,
    ) -> Result<Session, SessionError> {
        self.begin_auth()?;
        tracing::info!(email = %credentials.email, "logging in");

        let outcome = self
            .backend
            .execute(BridgeRequest::Login {
                email: credentials.email.clone(),
                password: credentials.password.clone(),
            })
            .await
            .map_err(SessionError::from)
            .and_then(identity_of);
        let (user, tokens) = match outcome {
            Ok(identity) => identity,
            Err(e) => return Err(self.fail_auth(e)),
        };

        // The remote record is the authoritative profile; a login that
        // can't produce it is a failed login, not a silent null.
        if let Err(e) = self.profile.load_from_remote(&user.id).await {
            return Err(self.fail_auth(e.into()));
        }

        Ok(self.finish_auth(user.id, tokens))
    }

    /// Creates a local guest identity and signs it in.
    ///
    /// Never touches the backend. The guest flag and id are persisted so
    /// restoration can treat the cache as authoritative-by-itself.
    pub async fn login_as_guest(&mut self) -> Result<Session, SessionError> {
        self.begin_auth()?;

        let guest = GuestIdentity::generate();
        tracing::info!(
            guest_id = %guest.id,
            username = %guest.display_name,
            "creating guest identity"
        );

        {
            let mut cache = self.cache.lock().await;
            cache.set(keys::GUEST_MODE, true);
            cache.set(keys::GUEST_ID, guest.id.as_str());
            if let Err(e) = cache.save() {
                drop(cache);
                return Err(self.fail_auth(e.into()));
            }
        }

        if let Err(e) = self
            .profile
            .create_guest(guest.id.clone(), &guest.display_name)
            .await
        {
            return Err(self.fail_auth(e.into()));
        }

        Ok(self.finish_auth(guest.id, None))
    }

    /// Signs in through a third-party provider.
    ///
    /// Only meaningful under a bridged backend — the direct variant
    /// refuses immediately. First-time provider users get a profile
    /// created from their email's local part.
    pub async fn sign_in_with_provider(
        &mut self,
    ) -> Result<Session, SessionError> {
        self.begin_auth()?;
        tracing::info!("provider sign-in requested");

        let outcome = self
            .backend
            .execute(BridgeRequest::ProviderSignIn)
            .await
            .map_err(SessionError::from)
            .and_then(identity_of);
        let (user, tokens) = match outcome {
            Ok(identity) => identity,
            Err(e) => return Err(self.fail_auth(e)),
        };

        let username = user
            .email
            .split('@')
            .next()
            .unwrap_or(user.email.as_str())
            .to_string();

        if let Err(e) = self
            .profile
            .load_or_create(user.id.clone(), &user.email, &username)
            .await
        {
            return Err(self.fail_auth(e.into()));
        }

        Ok(self.finish_auth(user.id, tokens))
    }

    /// Signs out and tears down all local session state.
    ///
    /// The remote sign-out is best-effort: its failure is logged and
    /// swallowed — the one intentional swallow in this layer, because a
    /// user stuck "still logged in" is worse than an unsynced remote
    /// sign-out. Local teardown is unconditional, and the just-logged-out
    /// flag suppresses auto-login on the next restore.
    pub async fn logout(&mut self) -> Result<(), SessionError> {
        self.set_phase(SessionPhase::LoggingOut);

        let is_guest = self
            .session
            .as_ref()
            .is_some_and(|s| s.user_id.is_guest());
        if !is_guest {
            match self.backend.execute(BridgeRequest::SignOut).await {
                Ok(ServiceResult::Failure { message }) => {
                    tracing::warn!(
                        %message,
                        "remote sign-out rejected; continuing local teardown"
                    );
                }
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        "remote sign-out failed; continuing local teardown"
                    );
                }
                Ok(_) => {}
            }
        }

        self.session = None;
        self.profile.clear().await?;

        let mut cache = self.cache.lock().await;
        cache.delete(keys::GUEST_MODE);
        cache.delete(keys::GUEST_ID);
        cache.set(keys::JUST_LOGGED_OUT, true);
        cache.save()?;
        drop(cache);

        self.set_phase(SessionPhase::NoSession);
        tracing::info!("logged out; local session state cleared");
        Ok(())
    }

    /// Looks for a still-valid session at process start.
    ///
    /// Returns `None` — a normal outcome, not an error — when the
    /// previous run logged out, when no session exists, or when the
    /// restore window elapses.
    ///
    /// Order of checks:
    /// 1. The just-logged-out flag, consumed exactly once.
    /// 2. The guest flag: a cached guest profile is authoritative by
    ///    itself, no backend traffic.
    /// 3. A session probe, polled together with the profile store at a
    ///    fixed interval up to a bounded number of attempts. The direct
    ///    backend's probe is already resolved, so it settles on the
    ///    first check with no sleeps.
    pub async fn restore_session(
        &mut self,
    ) -> Result<Option<Session>, SessionError> {
        if let Some(session) = &self.session {
            return Ok(Some(session.clone()));
        }

        {
            let mut cache = self.cache.lock().await;
            if cache.get_bool(keys::JUST_LOGGED_OUT, false) {
                cache.delete(keys::JUST_LOGGED_OUT);
                cache.save()?;
                tracing::info!(
                    "previous run ended with logout; skipping auto-login"
                );
                return Ok(None);
            }
        }

        if let Some(session) = self.restore_guest().await {
            return Ok(Some(session));
        }

        self.set_phase(SessionPhase::Authenticating);
        let mut probe = match self.backend.start_probe().await {
            Ok(probe) => probe,
            Err(e) => {
                self.set_phase(SessionPhase::NoSession);
                return Err(e.into());
            }
        };

        let max_attempts = self.config.restore_max_attempts;
        for attempt in 0..=max_attempts {
            match probe.poll() {
                ProbeStatus::Ready(result) => {
                    return match identity_of(result) {
                        Ok((user, tokens)) => {
                            tracing::info!(
                                user_id = %user.id,
                                attempt,
                                "existing session found"
                            );
                            if let Err(e) =
                                self.profile.load_from_remote(&user.id).await
                            {
                                self.set_phase(SessionPhase::NoSession);
                                return Err(e.into());
                            }
                            Ok(Some(self.finish_auth(user.id, tokens)))
                        }
                        Err(_) => {
                            // The probe answered definitively: no valid
                            // session on the other side.
                            tracing::info!(attempt, "no existing session");
                            self.set_phase(SessionPhase::NoSession);
                            Ok(None)
                        }
                    };
                }
                ProbeStatus::Gone => {
                    tracing::warn!(
                        attempt,
                        "session probe channel died; giving up"
                    );
                    self.set_phase(SessionPhase::NoSession);
                    return Ok(None);
                }
                ProbeStatus::Pending => {}
            }

            // The profile may land through a different completion than
            // the probe itself; the moment it's there, the session is
            // restorable without waiting out the probe.
            if let Some(profile) = self.profile.current() {
                let user_id = profile.user_id.clone();
                tracing::info!(
                    %user_id,
                    attempt,
                    "profile available; session restored"
                );
                return Ok(Some(self.finish_auth(user_id, None)));
            }

            if attempt == max_attempts {
                break;
            }
            let delay = if attempt == 0 {
                self.config.restore_initial_delay
            } else {
                self.config.restore_poll_interval
            };
            tokio::time::sleep(delay).await;
        }

        probe.cancel();
        self.set_phase(SessionPhase::NoSession);
        tracing::info!(
            attempts = max_attempts,
            "session restore exhausted its attempts; no session"
        );
        Ok(None)
    }

    // -----------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------

    /// Restores a guest session from the cache, if the guest flag is set.
    async fn restore_guest(&mut self) -> Option<Session> {
        let guest_id = {
            let cache = self.cache.lock().await;
            if !cache.get_bool(keys::GUEST_MODE, false) {
                return None;
            }
            cache.get_str(keys::GUEST_ID, "")
        };
        if guest_id.is_empty() {
            tracing::warn!("guest flag set but no guest id cached");
            return None;
        }

        let profile = self
            .profile
            .restore_from_cache(UserId::new(guest_id))
            .await?;
        tracing::info!(
            user_id = %profile.user_id,
            "guest session restored from cache"
        );
        Some(self.finish_auth(profile.user_id, None))
    }

    /// Guards the start of an auth operation.
    fn begin_auth(&mut self) -> Result<(), SessionError> {
        match self.phase {
            SessionPhase::NoSession => {
                self.set_phase(SessionPhase::Authenticating);
                Ok(())
            }
            SessionPhase::Authenticated => {
                Err(SessionError::AlreadyAuthenticated)
            }
            SessionPhase::Authenticating | SessionPhase::LoggingOut => {
                Err(SessionError::AuthInProgress)
            }
        }
    }

    /// Rolls the phase back after a failed auth operation.
    fn fail_auth(&mut self, error: SessionError) -> SessionError {
        self.set_phase(SessionPhase::NoSession);
        error
    }

    /// Establishes the session after a successful auth operation.
    fn finish_auth(
        &mut self,
        user_id: UserId,
        tokens: Option<SessionTokens>,
    ) -> Session {
        let session = Session { user_id, tokens };
        self.session = Some(session.clone());
        self.set_phase(SessionPhase::Authenticated);
        tracing::info!(user_id = %session.user_id, "session established");
        session
    }

    fn set_phase(&mut self, next: SessionPhase) {
        if self.phase != next {
            tracing::debug!(from = %self.phase, to = %next, "session phase");
            self.phase = next;
        }
    }
}

/// Extracts the identity fields from an auth operation's result.
fn identity_of(
    result: ServiceResult,
) -> Result<(AuthUser, Option<SessionTokens>), SessionError> {
    match result {
        ServiceResult::Success {
            user: Some(user),
            session,
            ..
        } => Ok((user, session)),
        ServiceResult::Success { user: None, .. } => {
            Err(SessionError::IncompleteIdentity)
        }
        ServiceResult::Failure { message } => {
            Err(SessionError::AuthFailed(message))
        }
    }
}

// =========================================================================
// Tests
// =========================================================================
