//! Persistent key/value cache with per-entry expiry
//!
//! Backs the version resolver. Entries carry their own expiry time and are
//! never returned once expired. The file cache leaves expired files for a
//! periodic sweep.
//!
//! # Keys
//!
//! | Key | Value |
//! |-----|-------|
//! | `<module path>` | latest `VersionInfo` from the module proxy |
//! | `<network fingerprint>-err-<domain>` | failure marker for a domain |

pub mod file;
pub mod memory;

pub use file::FileCache;
pub use memory::MemoryCache;

use crate::error::GoptResult;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

/// A stored cache record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Key the entry was stored under
    pub key: String,

    /// Stored value
    pub value: serde_json::Value,

    /// When the entry stops being valid
    pub expires_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Create an entry that expires `ttl` after `now`, saturating at the
    /// latest representable instant
    pub fn new(key: &str, value: serde_json::Value, now: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            key: key.to_string(),
            value,
            expires_at: now.checked_add_signed(ttl).unwrap_or(DateTime::<Utc>::MAX_UTC),
        }
    }

    /// Check if the entry is expired at the given instant
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Cache storage shared by resolver lookups
#[async_trait]
pub trait VersionCache: Send + Sync {
    /// Get an unexpired value
    async fn get(&self, key: &str) -> GoptResult<Option<serde_json::Value>>;

    /// Store a value for `ttl`, replacing any previous value
    async fn set(&self, key: &str, value: serde_json::Value, ttl: Duration) -> GoptResult<()>;

    /// Remove a value
    async fn remove(&self, key: &str) -> GoptResult<()>;

    /// Remove every entry, returning how many were removed
    async fn clear(&self) -> GoptResult<usize>;

    /// Evict expired entries, returning how many were removed
    async fn sweep(&self) -> GoptResult<usize>;

    /// Check for an unexpired value
    async fn has(&self, key: &str) -> GoptResult<bool> {
        Ok(self.get(key).await?.is_some())
    }
}

/// Source of the current time for expiry checks
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Move the clock forward
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}
