//! The profile store: the one place the live profile is allowed to change.
//!
//! Every mutation follows the same discipline:
//!
//! 1. Decide what the new profile should be.
//! 2. Get the remote's agreement first (unless the profile is a guest).
//! 3. Only then replace the live profile and mirror it to the cache.
//!
//! The cache is written strictly after remote success so it never shows a
//! state the remote does not yet have — a cache ahead of the remote would
//! desynchronize progression across the player's devices.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use playsync_cache::{keys, LocalCache};
use playsync_protocol::{BridgeRequest, PlayerProfile, ServiceResult, UserId};
use playsync_transport::AccountBackend;
use tokio::sync::Mutex;

use crate::ProfileError;

/// Owns the live [`PlayerProfile`] and reconciles it with the remote
/// record and the local cache.
///
/// The store is held by the session manager and accessed from its single
/// logical task; the shared pieces (backend, cache) are behind handles so
/// the session manager can use the same ones for its own bookkeeping.
pub struct ProfileStore<B, C> {
    backend: Arc<B>,
    cache: Arc<Mutex<C>>,
    current: Option<PlayerProfile>,
}

impl<B, C> ProfileStore<B, C>
where
    B: AccountBackend,
    C: LocalCache,
{
    pub fn new(backend: Arc<B>, cache: Arc<Mutex<C>>) -> Self {
        Self {
            backend,
            cache,
            current: None,
        }
    }

    /// The live profile, if one is loaded.
    pub fn current(&self) -> Option<&PlayerProfile> {
        self.current.as_ref()
    }

    /// Creates a fresh profile for a newly registered user.
    ///
    /// The remote record is created first; on any remote failure no local
    /// state is touched, so a failed registration leaves no partial
    /// profile behind.
    pub async fn create(
        &mut self,
        user_id: UserId,
        email: &str,
        username: &str,
    ) -> Result<PlayerProfile, ProfileError> {
        let profile = PlayerProfile::new(user_id, email, username);

        let result = self
            .backend
            .execute(BridgeRequest::RecordCreate {
                record: profile.clone(),
            })
            .await?;

        let stored = match result {
            // Prefer the service's canonical copy (it may stamp its own
            // timestamps); fall back to what we sent.
            ServiceResult::Success { record, .. } => {
                record.unwrap_or(profile)
            }
            ServiceResult::Failure { message } => {
                return Err(ProfileError::Remote(message));
            }
        };

        tracing::info!(user_id = %stored.user_id, "player profile created");
        self.install(stored.clone()).await?;
        Ok(stored)
    }

    /// Creates a local-only guest profile.
    ///
    /// Never touches the backend — guest identities are flagged so every
    /// later operation treats the cache as their only persistence.
    pub async fn create_guest(
        &mut self,
        guest_id: UserId,
        display_name: &str,
    ) -> Result<PlayerProfile, ProfileError> {
        let profile = PlayerProfile::new_guest(guest_id, display_name);

        tracing::info!(
            user_id = %profile.user_id,
            username = %profile.username,
            "guest profile created"
        );
        self.install(profile.clone()).await?;
        Ok(profile)
    }

    /// Fetches the remote record for `user_id` and makes it live.
    ///
    /// The remote record wins wholesale: whatever was live or cached
    /// before is overwritten, never merged field-by-field. A missing
    /// record is [`ProfileError::NotFound`].
    pub async fn load_from_remote(
        &mut self,
        user_id: &UserId,
    ) -> Result<PlayerProfile, ProfileError> {
        let result = self
            .backend
            .execute(BridgeRequest::RecordFetch {
                user_id: user_id.clone(),
            })
            .await?;

        let record = match result {
            ServiceResult::Success { record, .. } => {
                record.ok_or_else(|| ProfileError::NotFound(user_id.clone()))?
            }
            ServiceResult::Failure { message } => {
                return Err(ProfileError::Remote(message));
            }
        };

        tracing::info!(user_id = %record.user_id, "profile loaded from remote");
        self.install(record.clone()).await?;
        Ok(record)
    }

    /// Fetches the record for `user_id`, creating it if the service has
    /// none. Used by provider sign-in, where first and returning users
    /// arrive through the same flow.
    pub async fn load_or_create(
        &mut self,
        user_id: UserId,
        email: &str,
        username: &str,
    ) -> Result<PlayerProfile, ProfileError> {
        match self.load_from_remote(&user_id).await {
            Ok(profile) => Ok(profile),
            Err(ProfileError::NotFound(_)) => {
                tracing::info!(%user_id, "no existing record; creating one");
                self.create(user_id, email, username).await
            }
            Err(e) => Err(e),
        }
    }

    /// Pushes `updated` as the new authoritative profile.
    ///
    /// The user id must match the live profile. `updated_at` is bumped so
    /// it strictly increases across writes. Non-guest profiles go to the
    /// remote first and the cache mirror happens only on remote success;
    /// guest profiles skip the remote entirely.
    pub async fn persist(
        &mut self,
        mut updated: PlayerProfile,
    ) -> Result<(), ProfileError> {
        let live = self.current.as_ref().ok_or(ProfileError::NoProfile)?;
        if live.user_id != updated.user_id {
            return Err(ProfileError::IdentityMismatch {
                live: live.user_id.clone(),
                attempted: updated.user_id,
            });
        }

        updated.touch();

        if updated.is_guest() {
            tracing::debug!(
                user_id = %updated.user_id,
                "guest profile persisted locally"
            );
            return self.install(updated).await;
        }

        let result = self
            .backend
            .execute(BridgeRequest::RecordUpdate {
                record: updated.clone(),
            })
            .await?;

        match result {
            ServiceResult::Success { .. } => {
                tracing::debug!(
                    user_id = %updated.user_id,
                    updated_at = %updated.updated_at,
                    "profile persisted to remote"
                );
                self.install(updated).await
            }
            ServiceResult::Failure { message } => {
                Err(ProfileError::Remote(message))
            }
        }
    }

    /// Sets the progression counter and persists.
    pub async fn unlock_level(&mut self, level: u32) -> Result<(), ProfileError> {
        let mut updated =
            self.current.clone().ok_or(ProfileError::NoProfile)?;
        updated.levels_unlocked = level;
        self.persist(updated).await
    }

    /// Sets the currency balance and persists.
    pub async fn set_money(&mut self, amount: i64) -> Result<(), ProfileError> {
        let mut updated =
            self.current.clone().ok_or(ProfileError::NoProfile)?;
        updated.current_money = amount;
        self.persist(updated).await
    }

    /// Adds a cosmetic to the unlocked set and persists.
    ///
    /// Unlocking an already-owned cosmetic is a no-op — no remote write,
    /// no timestamp bump.
    pub async fn unlock_cosmetic(
        &mut self,
        cosmetic_id: &str,
    ) -> Result<(), ProfileError> {
        let mut updated =
            self.current.clone().ok_or(ProfileError::NoProfile)?;
        if !updated.unlocked_cosmetics.insert(cosmetic_id.to_string()) {
            return Ok(());
        }
        self.persist(updated).await
    }

    /// Rebuilds a profile from cached fields and makes it live.
    ///
    /// Used for guest restoration, where the cache is authoritative by
    /// itself. Returns `None` if the cache has no profile fields.
    pub async fn restore_from_cache(
        &mut self,
        user_id: UserId,
    ) -> Option<PlayerProfile> {
        let cache = self.cache.lock().await;
        cache.get(keys::USERNAME)?;

        let cosmetics = serde_json::from_str(
            &cache.get_str(keys::UNLOCKED_COSMETICS, "[]"),
        )
        .unwrap_or_default();

        let profile = PlayerProfile {
            user_id,
            email: cache.get_str(keys::EMAIL, PlayerProfile::GUEST_EMAIL),
            username: cache.get_str(keys::USERNAME, "Player"),
            levels_unlocked: cache.get_i64(
                keys::LEVELS_UNLOCKED,
                i64::from(PlayerProfile::INITIAL_LEVELS_UNLOCKED),
            ) as u32,
            current_money: cache.get_i64(keys::CURRENT_MONEY, 0),
            unlocked_cosmetics: cosmetics,
            created_at: parse_cached_time(
                &cache.get_str(keys::CREATED_AT, ""),
            ),
            updated_at: parse_cached_time(
                &cache.get_str(keys::UPDATED_AT, ""),
            ),
        };
        drop(cache);

        tracing::info!(
            user_id = %profile.user_id,
            "profile restored from cache"
        );
        self.current = Some(profile.clone());
        Some(profile)
    }

    /// The cached display name, defaulting to `"Player"`.
    pub async fn username(&self) -> String {
        self.cache.lock().await.get_str(keys::USERNAME, "Player")
    }

    /// Drops the live profile and deletes its cached mirror.
    pub async fn clear(&mut self) -> Result<(), ProfileError> {
        self.current = None;

        let mut cache = self.cache.lock().await;
        for key in keys::PROFILE_KEYS {
            cache.delete(key);
        }
        cache.save()?;

        tracing::info!("profile cleared");
        Ok(())
    }

    /// Makes `profile` live and mirrors it to the cache.
    async fn install(
        &mut self,
        profile: PlayerProfile,
    ) -> Result<(), ProfileError> {
        let mut cache = self.cache.lock().await;
        cache.set(keys::AUTHENTICATED, !profile.is_guest());
        cache.set(keys::USERNAME, profile.username.as_str());
        cache.set(keys::EMAIL, profile.email.as_str());
        cache.set(keys::LEVELS_UNLOCKED, profile.levels_unlocked);
        cache.set(keys::CURRENT_MONEY, profile.current_money);
        cache.set(
            keys::UNLOCKED_COSMETICS,
            serde_json::to_string(&profile.unlocked_cosmetics)
                .map_err(playsync_cache::CacheError::Serialize)?,
        );
        cache.set(keys::CREATED_AT, profile.created_at.to_rfc3339());
        cache.set(keys::UPDATED_AT, profile.updated_at.to_rfc3339());
        cache.save()?;
        drop(cache);

        self.current = Some(profile);
        Ok(())
    }
}

/// Parses a cached RFC 3339 timestamp, falling back to now for caches
/// written before the timestamp keys existed.
fn parse_cached_time(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

// =========================================================================
// Tests
// =========================================================================
