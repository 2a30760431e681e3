//! The ordered resolution chain and its re-entrancy guard.

use std::collections::HashSet;

use crate::cached::CachedSource;
use crate::error::{ResolveError, SourceError};
use crate::source::{SecretSource, SourceKind};

/// In-flight key set for one top-level resolution call.
///
/// A context is created per [`ResolutionChain::resolve`] call and threaded
/// by reference through every nested lookup, replacing the ambient
/// per-thread state a runtime with implicit thread-locals would use. A key
/// appears in the set at most once; attempting to resolve a key that is
/// already in flight on the same context signals a circular reference.
///
/// Contexts in different tasks are independent: two tasks resolving the
/// same key concurrently never observe each other's in-flight state.
#[derive(Debug, Default)]
pub struct ResolutionContext {
    in_flight: HashSet<String>,
}

impl ResolutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `key` is currently being resolved on this context.
    pub fn is_resolving(&self, key: &str) -> bool {
        self.in_flight.contains(key)
    }

    fn enter(&mut self, key: &str) -> Result<(), ResolveError> {
        if !self.in_flight.insert(key.to_string()) {
            return Err(ResolveError::circular(key));
        }
        Ok(())
    }

    fn exit(&mut self, key: &str) {
        self.in_flight.remove(key);
    }
}

/// Ordered sequence of cached sources consulted per lookup.
///
/// Sources are consulted in registration order and the first non-empty
/// value wins; earlier sources strictly shadow later ones. A source that
/// is unreachable or lacks the key never aborts the chain; only an
/// internal source error does.
///
/// The chain is immutable once built. Reconfiguration happens by building
/// a new chain and publishing it atomically (see
/// [`SecretResolver::reinitialize`](crate::SecretResolver::reinitialize)),
/// which also gives every source a fresh, empty cache.
pub struct ResolutionChain {
    sources: Vec<CachedSource>,
}

impl ResolutionChain {
    /// Build a chain from already-wrapped sources.
    ///
    /// Configuration-driven construction (which guarantees a non-empty
    /// chain) lives in [`SecretResolver`](crate::SecretResolver); an
    /// explicitly built empty chain resolves nothing.
    pub fn new(sources: Vec<CachedSource>) -> Self {
        Self { sources }
    }

    /// Number of sources in the chain.
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// The configured source kinds, in consultation order.
    pub fn kinds(&self) -> Vec<SourceKind> {
        self.sources.iter().map(|s| s.kind()).collect()
    }

    pub(crate) fn sources(&self) -> &[CachedSource] {
        &self.sources
    }

    /// Resolve `key` on a fresh context.
    ///
    /// Ends in exactly one of a returned non-empty value or a classified
    /// [`ResolveError`]; absence is always an error here.
    pub async fn resolve(&self, key: &str) -> Result<String, ResolveError> {
        let mut ctx = ResolutionContext::new();
        self.resolve_with(&mut ctx, key).await
    }

    /// Resolve `key` on an existing context.
    ///
    /// This is the re-entrant entry point: a source that needs another
    /// secret mid-fetch calls back in with the context it was handed, and
    /// a lookup of a key already in flight on that context fails with the
    /// circular-reference error.
    pub async fn resolve_with(
        &self,
        ctx: &mut ResolutionContext,
        key: &str,
    ) -> Result<String, ResolveError> {
        let key = key.trim();
        if key.is_empty() {
            return Err(ResolveError::InvalidKey);
        }

        ctx.enter(key)?;
        let result = self.lookup(ctx, key).await;
        // The key leaves the in-flight set on every exit path: value,
        // exhaustion, or source failure.
        ctx.exit(key);
        result
    }

    async fn lookup(
        &self,
        ctx: &mut ResolutionContext,
        key: &str,
    ) -> Result<String, ResolveError> {
        for source in &self.sources {
            match source.fetch(ctx, key).await {
                Ok(Some(value)) => {
                    tracing::debug!(key = %key, source = %source.kind(), "secret resolved");
                    return Ok(value);
                }
                Ok(None) => {
                    tracing::debug!(key = %key, source = %source.kind(), "source has no value");
                }
                Err(err) if err.is_operational() => {
                    tracing::debug!(
                        key = %key,
                        source = %source.kind(),
                        error = %err,
                        "source failed, continuing with next source"
                    );
                }
                Err(err) => {
                    return Err(ResolveError::source_failure(source.kind().to_string(), err));
                }
            }
        }

        Err(ResolveError::not_found(key))
    }

    /// Release every source, logging failures without aborting the rest.
    pub(crate) async fn release_all(&self) {
        for source in &self.sources {
            if let Err(err) = source.release().await {
                tracing::warn!(source = %source.kind(), error = %err, "failed to release source");
            }
        }
    }
}

impl std::fmt::Debug for ResolutionChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolutionChain").field("sources", &self.kinds()).finish()
    }
}

/// Wrap bare sources with the uniform caching decorator.
pub(crate) fn wrap_sources(
    sources: Vec<Box<dyn SecretSource>>,
    ttl: std::time::Duration,
) -> Vec<CachedSource> {
    sources.into_iter().map(|source| CachedSource::new(source, ttl)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::time::Duration;

    struct MapSource(HashMap<String, String>);

    impl MapSource {
        fn new(pairs: &[(&str, &str)]) -> Self {
            Self(pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect())
        }
    }

    #[async_trait]
    impl SecretSource for MapSource {
        fn kind(&self) -> SourceKind {
            SourceKind::File
        }

        async fn fetch(
            &self,
            _ctx: &mut ResolutionContext,
            key: &str,
        ) -> Result<Option<String>, SourceError> {
            Ok(self.0.get(key).cloned())
        }
    }

    struct FatalSource;

    #[async_trait]
    impl SecretSource for FatalSource {
        fn kind(&self) -> SourceKind {
            SourceKind::Vault
        }

        async fn fetch(
            &self,
            _ctx: &mut ResolutionContext,
            _key: &str,
        ) -> Result<Option<String>, SourceError> {
            Err(SourceError::internal("corrupted source state"))
        }
    }

    fn chain_of(sources: Vec<Box<dyn SecretSource>>) -> ResolutionChain {
        ResolutionChain::new(wrap_sources(sources, Duration::from_secs(60)))
    }

    #[tokio::test]
    async fn test_blank_keys_are_rejected() {
        let chain = chain_of(vec![Box::new(MapSource::new(&[("k", "v")]))]);

        assert!(matches!(chain.resolve("").await, Err(ResolveError::InvalidKey)));
        assert!(matches!(chain.resolve("   ").await, Err(ResolveError::InvalidKey)));
    }

    #[tokio::test]
    async fn test_keys_are_trimmed_before_lookup() {
        let chain = chain_of(vec![Box::new(MapSource::new(&[("k", "v")]))]);
        assert_eq!(chain.resolve("  k  ").await.unwrap(), "v");
    }

    #[tokio::test]
    async fn test_first_match_wins() {
        let chain = chain_of(vec![
            Box::new(MapSource::new(&[("k", "first")])),
            Box::new(MapSource::new(&[("k", "second")])),
        ]);
        assert_eq!(chain.resolve("k").await.unwrap(), "first");
    }

    #[tokio::test]
    async fn test_exhaustion_is_not_found() {
        let chain = chain_of(vec![
            Box::new(MapSource::new(&[])),
            Box::new(MapSource::new(&[])),
        ]);
        assert!(matches!(
            chain.resolve("absent").await,
            Err(ResolveError::NotFound { key }) if key == "absent"
        ));
    }

    #[tokio::test]
    async fn test_internal_error_aborts_chain() {
        let chain = chain_of(vec![
            Box::new(FatalSource),
            Box::new(MapSource::new(&[("k", "v")])),
        ]);
        let err = chain.resolve("k").await.unwrap_err();
        assert!(matches!(err, ResolveError::SourceFailure { ref source, .. } if source == "vault"));
    }

    #[tokio::test]
    async fn test_reentrant_lookup_is_circular() {
        let chain = chain_of(vec![Box::new(MapSource::new(&[("k", "v")]))]);
        let mut ctx = ResolutionContext::new();
        ctx.enter("k").unwrap();

        let err = chain.resolve_with(&mut ctx, "k").await.unwrap_err();
        assert!(matches!(err, ResolveError::CircularReference { ref key } if key == "k"));

        // The outer frame's entry is untouched by the failed nested call.
        assert!(ctx.is_resolving("k"));
    }

    #[tokio::test]
    async fn test_context_is_cleared_on_every_exit_path() {
        let found = chain_of(vec![Box::new(MapSource::new(&[("k", "v")]))]);
        let mut ctx = ResolutionContext::new();
        found.resolve_with(&mut ctx, "k").await.unwrap();
        assert!(!ctx.is_resolving("k"));

        let missing = chain_of(vec![Box::new(MapSource::new(&[]))]);
        missing.resolve_with(&mut ctx, "k").await.unwrap_err();
        assert!(!ctx.is_resolving("k"));

        let failing = chain_of(vec![Box::new(FatalSource)]);
        failing.resolve_with(&mut ctx, "k").await.unwrap_err();
        assert!(!ctx.is_resolving("k"));
    }

    #[tokio::test]
    async fn test_empty_chain_resolves_nothing() {
        let chain = ResolutionChain::new(Vec::new());
        assert!(chain.is_empty());
        assert!(matches!(chain.resolve("k").await, Err(ResolveError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_kinds_reports_consultation_order() {
        let chain = chain_of(vec![
            Box::new(FatalSource),
            Box::new(MapSource::new(&[])),
        ]);
        assert_eq!(chain.kinds(), vec![SourceKind::Vault, SourceKind::File]);
    }
}
