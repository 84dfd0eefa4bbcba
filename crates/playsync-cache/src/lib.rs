//! Local key/value cache for Playsync.
//!
//! A small persisted map that survives process restarts. It holds the
//! last-known profile fields and session flags so the client can show
//! something sensible before the remote service answers — and so session
//! restoration knows whether a guest identity or a just-logged-out flag
//! is waiting for it.
//!
//! Two implementations of the [`LocalCache`] trait:
//!
//! - [`MemoryCache`] — plain in-memory map; for tests and embedders that
//!   bring their own persistence.
//! - [`FileCache`] — JSON file on disk, written atomically.
//!
//! By contract, only the profile store and the session manager write
//! profile/session keys. Everything else reads.

mod error;
mod file;

pub use error::CacheError;
pub use file::FileCache;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// The keys this layer persists.
///
/// Kept in one place so the profile store and session manager cannot
/// drift apart on spelling. These names are also the on-disk format —
/// renaming one orphans existing caches.
pub mod keys {
    /// `true` while a registered (non-guest) session is active.
    pub const AUTHENTICATED: &str = "authenticated";
    /// `true` while the active identity is a local guest.
    pub const GUEST_MODE: &str = "guest_mode";
    /// The generated guest id, present only in guest mode.
    pub const GUEST_ID: &str = "guest_id";
    pub const USERNAME: &str = "username";
    pub const EMAIL: &str = "email";
    /// Progression counter mirror.
    pub const LEVELS_UNLOCKED: &str = "levels_unlocked";
    /// Currency balance mirror.
    pub const CURRENT_MONEY: &str = "current_money";
    /// Unlocked cosmetic ids, serialized as a JSON array string.
    pub const UNLOCKED_COSMETICS: &str = "unlocked_cosmetics";
    /// Set by logout, consumed exactly once by the next session
    /// restoration to suppress auto-login.
    pub const JUST_LOGGED_OUT: &str = "just_logged_out";
    pub const CREATED_AT: &str = "created_at";
    pub const UPDATED_AT: &str = "updated_at";

    /// Every key that mirrors profile state. Cleared together on logout.
    pub const PROFILE_KEYS: &[&str] = &[
        AUTHENTICATED,
        USERNAME,
        EMAIL,
        LEVELS_UNLOCKED,
        CURRENT_MONEY,
        UNLOCKED_COSMETICS,
        CREATED_AT,
        UPDATED_AT,
    ];
}

// ---------------------------------------------------------------------------
// CacheValue
// ---------------------------------------------------------------------------

/// A cached value: string, integer, or flag.
///
/// `#[serde(untagged)]` stores values as their natural JSON type
/// (`true`, `42`, `"Ann"`) instead of wrapping them in a variant object,
/// which keeps the cache file hand-readable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CacheValue {
    Bool(bool),
    Int(i64),
    Str(String),
}

impl From<bool> for CacheValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for CacheValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<u32> for CacheValue {
    fn from(v: u32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<&str> for CacheValue {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<String> for CacheValue {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

// ---------------------------------------------------------------------------
// LocalCache trait
// ---------------------------------------------------------------------------

/// A persisted key→value map.
///
/// Mutations are in-memory until [`save`](Self::save) is called; `save` is
/// the only fallible persistence point. The typed getters return the
/// caller's default when the key is missing *or* holds a value of another
/// type — a half-written cache must degrade to defaults, never to an error.
pub trait LocalCache: Send + Sync + 'static {
    /// Returns the raw value for `key`, if present.
    fn get(&self, key: &str) -> Option<&CacheValue>;

    /// Sets `key` to `value`, replacing any previous value.
    fn set(&mut self, key: &str, value: impl Into<CacheValue>);

    /// Removes `key`. Removing an absent key is a no-op.
    fn delete(&mut self, key: &str);

    /// Flushes pending mutations to the backing store.
    fn save(&mut self) -> Result<(), CacheError>;

    /// String value of `key`, or `default` if missing/mistyped.
    fn get_str(&self, key: &str, default: &str) -> String {
        match self.get(key) {
            Some(CacheValue::Str(s)) => s.clone(),
            _ => default.to_string(),
        }
    }

    /// Integer value of `key`, or `default` if missing/mistyped.
    fn get_i64(&self, key: &str, default: i64) -> i64 {
        match self.get(key) {
            Some(CacheValue::Int(i)) => *i,
            _ => default,
        }
    }

    /// Flag value of `key`, or `default` if missing/mistyped.
    fn get_bool(&self, key: &str, default: bool) -> bool {
        match self.get(key) {
            Some(CacheValue::Bool(b)) => *b,
            _ => default,
        }
    }
}

// ---------------------------------------------------------------------------
// MemoryCache
// ---------------------------------------------------------------------------

/// An in-memory [`LocalCache`] with no backing store.
///
/// `save` always succeeds. Used in tests and by embedders whose host
/// environment owns persistence.
#[derive(Debug, Default)]
pub struct MemoryCache {
    map: HashMap<String, CacheValue>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl LocalCache for MemoryCache {
    fn get(&self, key: &str) -> Option<&CacheValue> {
        self.map.get(key)
    }

    fn set(&mut self, key: &str, value: impl Into<CacheValue>) {
        self.map.insert(key.to_string(), value.into());
    }

    fn delete(&mut self, key: &str) {
        self.map.remove(key);
    }

    fn save(&mut self) -> Result<(), CacheError> {
        Ok(())
    }
}

// =========================================================================
// Tests
// =========================================================================
