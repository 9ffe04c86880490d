//! Credential store trait and bounded-TTL cache
//!
//! The service authenticates clients against a username/password pair held
//! in an external key-value secret service. The store is read-only from
//! the core's point of view; [`CredentialCache`] bounds how often it is
//! read without letting staleness exceed a configured window, so secrets
//! can be rotated without redeploying the service.

use crate::error::Result;
use crate::request::Credentials;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Trait for external secret services
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Read the value of a named secret.
    ///
    /// Fails with [`Error::SecretNotFound`](crate::Error::SecretNotFound)
    /// if the secret is unset.
    async fn get(&self, name: &str) -> Result<String>;
}

/// Read-mostly cache in front of a [`CredentialStore`]
///
/// Holds the expected username/password pair for at most `ttl`; concurrent
/// readers share the cached value, and the first reader past expiry
/// refreshes it. A failed refresh is returned to the caller rather than
/// served stale.
pub struct CredentialCache {
    store: Arc<dyn CredentialStore>,
    username_secret: String,
    password_secret: String,
    ttl: Duration,
    cached: RwLock<Option<(Credentials, Instant)>>,
}

impl CredentialCache {
    /// Create a cache reading the two named secrets from `store`
    pub fn new(
        store: Arc<dyn CredentialStore>,
        username_secret: impl Into<String>,
        password_secret: impl Into<String>,
        ttl: Duration,
    ) -> Self {
        Self {
            store,
            username_secret: username_secret.into(),
            password_secret: password_secret.into(),
            ttl,
            cached: RwLock::new(None),
        }
    }

    /// The current expected credentials, refreshed when older than the TTL
    pub async fn current(&self) -> Result<Credentials> {
        if let Some((creds, fetched_at)) = self.cached.read().await.as_ref() {
            if fetched_at.elapsed() < self.ttl {
                return Ok(creds.clone());
            }
        }

        let mut slot = self.cached.write().await;
        // Another writer may have refreshed while we waited for the lock
        if let Some((creds, fetched_at)) = slot.as_ref() {
            if fetched_at.elapsed() < self.ttl {
                return Ok(creds.clone());
            }
        }

        tracing::debug!("Refreshing credentials from secret store");
        let username = self.store.get(&self.username_secret).await?;
        let password = self.store.get(&self.password_secret).await?;
        let creds = Credentials { username, password };
        *slot = Some((creds.clone(), Instant::now()));
        Ok(creds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingStore {
        secrets: HashMap<String, String>,
        get_count: AtomicUsize,
    }

    impl CountingStore {
        fn new(pairs: &[(&str, &str)]) -> Self {
            Self {
                secrets: pairs
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
                get_count: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl CredentialStore for CountingStore {
        async fn get(&self, name: &str) -> Result<String> {
            self.get_count.fetch_add(1, Ordering::SeqCst);
            self.secrets
                .get(name)
                .cloned()
                .ok_or_else(|| crate::Error::SecretNotFound(name.to_string()))
        }
    }

    #[tokio::test]
    async fn fresh_reads_hit_the_cache() {
        let store = Arc::new(CountingStore::new(&[
            ("user", "superg"),
            ("pass", "hunter2"),
        ]));
        let cache = CredentialCache::new(
            Arc::clone(&store) as Arc<dyn CredentialStore>,
            "user",
            "pass",
            Duration::from_secs(300),
        );

        let first = cache.current().await.unwrap();
        let second = cache.current().await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.username, "superg");
        // Two secrets, fetched exactly once
        assert_eq!(store.get_count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn expired_cache_refreshes() {
        let store = Arc::new(CountingStore::new(&[
            ("user", "superg"),
            ("pass", "hunter2"),
        ]));
        let cache = CredentialCache::new(
            Arc::clone(&store) as Arc<dyn CredentialStore>,
            "user",
            "pass",
            Duration::from_millis(0),
        );

        cache.current().await.unwrap();
        cache.current().await.unwrap();
        assert_eq!(store.get_count.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn missing_secret_propagates() {
        let store = Arc::new(CountingStore::new(&[("user", "superg")]));
        let cache = CredentialCache::new(
            store as Arc<dyn CredentialStore>,
            "user",
            "pass",
            Duration::from_secs(300),
        );

        let err = cache.current().await.unwrap_err();
        assert!(matches!(err, crate::Error::SecretNotFound(_)));
    }
}
