//! TTL caching decorator applied to every registered source.

use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use crate::chain::ResolutionContext;
use crate::error::SourceError;
use crate::source::{SecretSource, SourceKind};

/// Cached value with its fetch instant.
#[derive(Debug, Clone)]
struct CacheEntry {
    value: String,
    fetched_at: Instant,
}

impl CacheEntry {
    fn new(value: String) -> Self {
        Self { value, fetched_at: Instant::now() }
    }

    fn is_expired(&self, ttl: Duration) -> bool {
        self.fetched_at.elapsed() > ttl
    }
}

/// TTL cache in front of exactly one [`SecretSource`].
///
/// An unexpired entry answers without touching the underlying source.
/// Entries are created on successful, non-empty fetches and never
/// proactively evicted; a lookup past its expiry is treated as absent and
/// triggers a fresh fetch. Absent and empty results are never cached, and
/// delegate failures propagate unmodified (not cached).
///
/// A zero TTL disables caching entirely: every call delegates and nothing
/// is stored.
///
/// # Thread Safety
///
/// The cache is an `RwLock`ed map safe for concurrent lookups from any
/// number of tasks. Two concurrent misses for the same key may both hit
/// the delegate; expiry stampedes are accepted, not deduplicated.
pub struct CachedSource {
    inner: Box<dyn SecretSource>,
    ttl: Duration,
    cache: RwLock<HashMap<String, CacheEntry>>,
}

impl CachedSource {
    /// Wrap `inner` with a cache holding values for `ttl`.
    pub fn new(inner: Box<dyn SecretSource>, ttl: Duration) -> Self {
        Self { inner, ttl, cache: RwLock::new(HashMap::new()) }
    }

    /// The configured time-to-live.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Number of entries currently cached (expired ones included).
    pub async fn cached_entries(&self) -> usize {
        self.cache.read().await.len()
    }
}

#[async_trait::async_trait]
impl SecretSource for CachedSource {
    fn kind(&self) -> SourceKind {
        self.inner.kind()
    }

    async fn fetch(
        &self,
        ctx: &mut ResolutionContext,
        key: &str,
    ) -> Result<Option<String>, SourceError> {
        if !self.ttl.is_zero() {
            let cache = self.cache.read().await;
            if let Some(entry) = cache.get(key) {
                if !entry.is_expired(self.ttl) {
                    tracing::debug!(key = %key, source = %self.kind(), "cache hit");
                    return Ok(Some(entry.value.clone()));
                }
                tracing::debug!(key = %key, source = %self.kind(), "cached value expired");
            }
        }

        let fetched = self.inner.fetch(ctx, key).await?;
        match fetched {
            Some(value) if !value.is_empty() => {
                if !self.ttl.is_zero() {
                    let mut cache = self.cache.write().await;
                    cache.insert(key.to_string(), CacheEntry::new(value.clone()));
                }
                Ok(Some(value))
            }
            // Empty results are normalized to absent and never cached, so
            // a transiently blank value cannot shadow later sources for a
            // whole TTL window.
            _ => Ok(None),
        }
    }

    async fn is_ready(&self) -> bool {
        self.inner.is_ready().await
    }

    async fn release(&self) -> Result<(), SourceError> {
        self.cache.write().await.clear();
        self.inner.release().await
    }
}

impl std::fmt::Debug for CachedSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedSource").field("kind", &self.kind()).field("ttl", &self.ttl).finish()
    }
}
