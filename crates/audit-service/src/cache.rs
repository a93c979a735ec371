//! Two-namespace, positive-only credential cache.
//!
//! The bearer and share namespaces differ in key derivation and expiry semantics but
//! share one underlying concurrent map: this is a policy over a single store, not two
//! stores. Negative verification results are never cached -- a forged token must not be
//! able to block a later, correctly signed attempt at the same key.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use dashmap::DashMap;
use sha2::{Digest, Sha256};

use crate::models::{CachedCredential, Credential};

#[derive(Clone)]
struct Entry {
    cached: CachedCredential,
    inserted_at: Instant,
}

/// Concurrent, TTL-swept store backing both the bearer and share namespaces.
///
/// Readers never block each other; a write briefly excludes readers of the same shard
/// (`DashMap`'s sharded-lock discipline), and the background sweep task acquires the
/// same locks as any other writer.
pub struct CredentialCache {
    bearer: DashMap<String, Entry>,
    share: DashMap<String, Entry>,
    jwt_ttl: Duration,
    share_ttl: Duration,
    len_hint: AtomicU64,
}

pub struct CacheStats {
    pub items: usize,
    pub jwt_ttl: Duration,
    pub share_ttl: Duration,
}

impl CredentialCache {
    pub fn new(jwt_ttl: Duration, share_ttl: Duration) -> Arc<Self> {
        Arc::new(Self {
            bearer: DashMap::new(),
            share: DashMap::new(),
            jwt_ttl,
            share_ttl,
            len_hint: AtomicU64::new(0),
        })
    }

    /// Bearer cache key: `jwt:<hex(sha256(token))>`. The raw token is never stored.
    fn bearer_key(token: &str) -> String {
        let digest = Sha256::digest(token.as_bytes());
        format!("jwt:{}", hex::encode(digest))
    }

    /// Share cache key: `share:<token>:<session_id>`, carrying the session context so a
    /// share token cannot be confused with a grant for a different session.
    fn share_key(token: &str, session_id: &str) -> String {
        format!("share:{token}:{session_id}")
    }

    /// Looks up a cached bearer credential. A hit whose embedded `expires_at` has
    /// already passed is treated as a miss, and the entry is evicted as a side effect.
    pub fn get_bearer(&self, token: &str) -> Option<CachedCredential> {
        let key = Self::bearer_key(token);
        let hit = self.bearer.get(&key).map(|e| e.cached.clone())?;
        if hit.expires_at <= Utc::now() {
            self.bearer.remove(&key);
            return None;
        }
        Some(hit)
    }

    pub fn set_bearer(&self, token: &str, credential: Credential, expires_at: chrono::DateTime<Utc>) {
        let key = Self::bearer_key(token);
        self.bearer.insert(
            key,
            Entry {
                cached: CachedCredential {
                    credential,
                    expires_at,
                },
                inserted_at: Instant::now(),
            },
        );
    }

    pub fn invalidate_bearer(&self, token: &str) {
        self.bearer.remove(&Self::bearer_key(token));
    }

    /// Looks up a cached share credential. Unlike the bearer namespace, there is no
    /// embedded-expiry check here: TTL alone governs freshness (the sweep removes
    /// entries whose insertion-relative TTL has elapsed).
    pub fn get_share(&self, token: &str, session_id: &str) -> Option<CachedCredential> {
        let key = Self::share_key(token, session_id);
        let entry = self.share.get(&key)?;
        if entry.inserted_at.elapsed() >= self.share_ttl {
            drop(entry);
            self.share.remove(&key);
            return None;
        }
        Some(entry.cached.clone())
    }

    pub fn set_share(&self, token: &str, session_id: &str, credential: Credential, expires_at: chrono::DateTime<Utc>) {
        let key = Self::share_key(token, session_id);
        self.share.insert(
            key,
            Entry {
                cached: CachedCredential {
                    credential,
                    expires_at,
                },
                inserted_at: Instant::now(),
            },
        );
    }

    pub fn invalidate_share(&self, token: &str, session_id: &str) {
        self.share.remove(&Self::share_key(token, session_id));
    }

    pub fn jwt_ttl(&self) -> Duration {
        self.jwt_ttl
    }

    pub fn share_ttl(&self) -> Duration {
        self.share_ttl
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            items: self.bearer.len() + self.share.len(),
            jwt_ttl: self.jwt_ttl,
            share_ttl: self.share_ttl,
        }
    }

    /// Removes entries whose TTL (bearer: embedded `expires_at`; share: insertion-relative
    /// TTL) has elapsed. Intended to be driven by [`spawn_cleanup_sweep`] on a fixed
    /// interval independent of either namespace's TTL.
    fn sweep(&self) {
        let now = Utc::now();
        self.bearer.retain(|_, e| e.cached.expires_at > now);
        let share_ttl = self.share_ttl;
        self.share.retain(|_, e| e.inserted_at.elapsed() < share_ttl);
        self.len_hint
            .store((self.bearer.len() + self.share.len()) as u64, Ordering::Relaxed);
    }
}

/// Spawns the background expiry sweep. `interval` is independent of `jwt_ttl`/`share_ttl`.
pub fn spawn_cleanup_sweep(cache: Arc<CredentialCache>, interval: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            cache.sweep();
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    fn cache() -> Arc<CredentialCache> {
        CredentialCache::new(Duration::from_secs(300), Duration::from_secs(3600))
    }

    #[test]
    fn bearer_key_never_equals_raw_token() {
        let key = CredentialCache::bearer_key("super-secret-jwt");
        assert_ne!(key, "super-secret-jwt");
        assert!(key.starts_with("jwt:"));
        assert!(!key.contains("super-secret-jwt"));
    }

    #[test]
    fn bearer_roundtrip_hit() {
        let cache = cache();
        let cred = Credential::Bearer {
            user_id: "user-1".to_string(),
        };
        cache.set_bearer("tok", cred.clone(), Utc::now() + ChronoDuration::minutes(5));
        let hit = cache.get_bearer("tok").expect("expected hit");
        assert_eq!(hit.credential, cred);
    }

    #[test]
    fn bearer_miss_for_unknown_token() {
        let cache = cache();
        assert!(cache.get_bearer("never-set").is_none());
    }

    #[test]
    fn expired_bearer_entry_is_observationally_a_miss_and_is_evicted() {
        let cache = cache();
        let cred = Credential::Bearer {
            user_id: "user-1".to_string(),
        };
        cache.set_bearer("tok", cred, Utc::now() - ChronoDuration::seconds(1));
        assert!(cache.get_bearer("tok").is_none());
        // Side effect: the stale entry was removed, not merely skipped.
        assert_eq!(cache.stats().items, 0);
    }

    #[test]
    fn invalidate_bearer_forces_a_miss() {
        let cache = cache();
        let cred = Credential::Bearer {
            user_id: "user-1".to_string(),
        };
        cache.set_bearer("tok", cred, Utc::now() + ChronoDuration::minutes(5));
        cache.invalidate_bearer("tok");
        assert!(cache.get_bearer("tok").is_none());
    }

    #[test]
    fn share_roundtrip_hit_is_keyed_by_session() {
        let cache = cache();
        let cred = Credential::Share {
            session_id: "sess-1".to_string(),
        };
        cache.set_share("stk", "sess-1", cred.clone(), Utc::now() + ChronoDuration::hours(24));
        assert_eq!(cache.get_share("stk", "sess-1").unwrap().credential, cred);
        // Same token, different session -> miss.
        assert!(cache.get_share("stk", "sess-2").is_none());
    }

    #[test]
    fn sweep_removes_expired_bearer_and_stale_share_entries() {
        let cache = cache();
        cache.set_bearer(
            "expired",
            Credential::Bearer {
                user_id: "u".to_string(),
            },
            Utc::now() - ChronoDuration::seconds(1),
        );
        cache.set_bearer(
            "fresh",
            Credential::Bearer {
                user_id: "u".to_string(),
            },
            Utc::now() + ChronoDuration::minutes(5),
        );
        cache.sweep();
        assert!(cache.bearer.get(&CredentialCache::bearer_key("expired")).is_none());
        assert!(cache.bearer.get(&CredentialCache::bearer_key("fresh")).is_some());
    }
}
