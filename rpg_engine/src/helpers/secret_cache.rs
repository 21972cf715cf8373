use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use log::*;
use rpg_common::Secret;
use tokio::sync::RwLock;

/// How long a fetched webhook secret stays valid before it is re-fetched.
pub const DEFAULT_SECRET_TTL: Duration = Duration::from_secs(3600);

/// A time-bounded cache for the account webhook signing secret.
///
/// Fetching the secret costs a remote call, which would otherwise happen on every webhook delivery. The cache
/// trades a small staleness window (the TTL) for that throughput. Cloning is cheap and clones share the cache.
#[derive(Clone)]
pub struct SecretCache {
    ttl: Duration,
    entry: Arc<RwLock<Option<(Secret<String>, Instant)>>>,
}

impl Default for SecretCache {
    fn default() -> Self {
        Self::new(DEFAULT_SECRET_TTL)
    }
}

impl SecretCache {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl, entry: Arc::new(RwLock::new(None)) }
    }

    /// Returns the cached secret, or fetches a fresh one through `fetch` when the cache is empty or expired.
    pub async fn get_or_fetch<F, Fut, E>(&self, fetch: F) -> Result<Secret<String>, E>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<Secret<String>, E>>,
    {
        {
            let guard = self.entry.read().await;
            if let Some((secret, fetched_at)) = guard.as_ref() {
                if fetched_at.elapsed() < self.ttl {
                    return Ok(secret.clone());
                }
            }
        }
        debug!("Webhook secret cache is stale. Fetching a fresh secret.");
        let secret = fetch().await?;
        let mut guard = self.entry.write().await;
        *guard = Some((secret.clone(), Instant::now()));
        Ok(secret)
    }

    /// Drops the cached value so the next lookup re-fetches.
    pub async fn invalidate(&self) {
        let mut guard = self.entry.write().await;
        *guard = None;
    }
}
