//! Revoked refresh-token tracking: an in-process TTL cache keyed by `jti`,
//! the ephemeral store for revoked-token ids external to the core.
//!
//! A refresh token's `jti` is recorded here the moment it is redeemed for a
//! new access token, so it cannot be redeemed twice. Entries expire
//! alongside the token's own `exp`, so the cache never outgrows the set of
//! still-valid-but-revoked tokens.

use std::time::Duration;

use moka::future::Cache;

pub struct RevocationCache {
    cache: Cache<String, ()>,
}

impl RevocationCache {
    pub fn new(refresh_ttl: Duration) -> Self {
        Self {
            cache: Cache::builder().time_to_live(refresh_ttl).build(),
        }
    }

    pub async fn revoke(&self, jti: &str) {
        self.cache.insert(jti.to_string(), ()).await;
    }

    pub async fn is_revoked(&self, jti: &str) -> bool {
        self.cache.get(jti).await.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn a_revoked_jti_is_reported_as_revoked() {
        let cache = RevocationCache::new(Duration::from_secs(60));
        assert!(!cache.is_revoked("jti-1").await);
        cache.revoke("jti-1").await;
        assert!(cache.is_revoked("jti-1").await);
    }
}
