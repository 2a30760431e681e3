//! The resolver: owns the chain, handles reinitialization and shutdown.

use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};

use crate::chain::{wrap_sources, ResolutionChain, ResolutionContext};
use crate::config::ResolverConfig;
use crate::error::{InjectError, ResolveError};
use crate::inject::SecretTarget;
use crate::source::{SecretSource, SourceKind};
use crate::sources::{EnvSource, FileSource, VaultSource};

#[cfg(feature = "aws")]
use crate::sources::AwsSource;

/// Diagnostics entry for one configured source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SourceInfo {
    pub kind: SourceKind,
    pub ready: bool,
}

#[derive(Debug, Default)]
struct Lifecycle {
    shut_down: bool,
}

/// Owner of the resolution chain.
///
/// Construct one explicitly and share it (behind an `Arc`) wherever
/// secrets are needed; there is no process-wide instance. The chain is
/// published as an `Arc` snapshot: readers resolve against a consistent
/// chain even while [`reinitialize`](Self::reinitialize) swaps in a new
/// one. In-flight calls may complete against either chain during a
/// transition, never a partially-updated one.
///
/// # Example
///
/// ```rust,ignore
/// use secretchain::{ResolverConfig, SecretResolver};
///
/// let resolver = SecretResolver::from_env().await;
/// let token = resolver.resolve("API_TOKEN").await?;
///
/// // Reconfigure at runtime; caches do not survive the swap.
/// resolver.reinitialize(ResolverConfig::from_env()).await;
///
/// resolver.shutdown().await;
/// ```
pub struct SecretResolver {
    chain: RwLock<Arc<ResolutionChain>>,
    lifecycle: Mutex<Lifecycle>,
}

impl SecretResolver {
    /// Build a resolver from an explicit configuration.
    pub async fn new(config: ResolverConfig) -> Self {
        let chain = build_chain(&config).await;
        Self { chain: RwLock::new(Arc::new(chain)), lifecycle: Mutex::new(Lifecycle::default()) }
    }

    /// Build a resolver from `SECRETCHAIN_*` environment configuration.
    pub async fn from_env() -> Self {
        Self::new(ResolverConfig::from_env()).await
    }

    /// Build a resolver over explicitly constructed sources, each wrapped
    /// with the uniform TTL cache. An empty list installs the default
    /// environment source, keeping the chain non-empty.
    pub async fn with_sources(sources: Vec<Box<dyn SecretSource>>, cache_ttl: Duration) -> Self {
        let sources: Vec<Box<dyn SecretSource>> = if sources.is_empty() {
            tracing::warn!("no sources supplied; defaulting to the environment source");
            vec![Box::new(EnvSource::new())]
        } else {
            sources
        };
        let chain = ResolutionChain::new(wrap_sources(sources, cache_ttl));
        Self { chain: RwLock::new(Arc::new(chain)), lifecycle: Mutex::new(Lifecycle::default()) }
    }

    /// The chain snapshot current at this instant.
    pub async fn chain(&self) -> Arc<ResolutionChain> {
        self.chain.read().await.clone()
    }

    /// Resolve `key` against the current chain. See
    /// [`ResolutionChain::resolve`].
    pub async fn resolve(&self, key: &str) -> Result<String, ResolveError> {
        self.chain().await.resolve(key).await
    }

    /// Resolve `key` on an existing context (re-entrant form). See
    /// [`ResolutionChain::resolve_with`].
    pub async fn resolve_with(
        &self,
        ctx: &mut ResolutionContext,
        key: &str,
    ) -> Result<String, ResolveError> {
        self.chain().await.resolve_with(ctx, key).await
    }

    /// Populate `target`'s secret bindings against the current chain. See
    /// [`ResolutionChain::inject`].
    pub async fn inject<T>(&self, target: &mut T) -> Result<(), InjectError>
    where
        T: SecretTarget + ?Sized,
    {
        self.chain().await.inject(target).await
    }

    /// Replace the chain with one built from `config`.
    ///
    /// The new chain is published atomically and arrives with fresh,
    /// empty caches; the replaced sources are then released. Mutually
    /// exclusive with [`shutdown`](Self::shutdown), not with in-flight
    /// resolution.
    pub async fn reinitialize(&self, config: ResolverConfig) {
        let mut lifecycle = self.lifecycle.lock().await;
        let new_chain = Arc::new(build_chain(&config).await);

        let old_chain = {
            let mut chain = self.chain.write().await;
            std::mem::replace(&mut *chain, new_chain)
        };

        // A chain that already went through shutdown had its sources
        // released; releasing them again would break the once-per-source
        // contract.
        if !lifecycle.shut_down {
            tracing::info!(sources = ?old_chain.kinds(), "releasing replaced sources");
            old_chain.release_all().await;
        }
        lifecycle.shut_down = false;
    }

    /// Release every source exactly once.
    ///
    /// Individual release failures are logged and never abort the
    /// remaining releases. Idempotent: a second call is a no-op (until a
    /// [`reinitialize`](Self::reinitialize) installs fresh sources).
    pub async fn shutdown(&self) {
        let mut lifecycle = self.lifecycle.lock().await;
        if lifecycle.shut_down {
            tracing::debug!("resolver already shut down");
            return;
        }
        lifecycle.shut_down = true;

        let chain = self.chain.read().await.clone();
        tracing::info!(sources = ?chain.kinds(), "shutting down resolver");
        chain.release_all().await;
    }

    /// Read-only snapshot of the currently configured sources.
    pub async fn sources(&self) -> Vec<SourceInfo> {
        let chain = self.chain().await;
        let mut infos = Vec::with_capacity(chain.len());
        for source in chain.sources() {
            infos.push(SourceInfo { kind: source.kind(), ready: source.is_ready().await });
        }
        infos
    }
}

impl std::fmt::Debug for SecretResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretResolver").finish()
    }
}

async fn build_chain(config: &ResolverConfig) -> ResolutionChain {
    let mut sources: Vec<Box<dyn SecretSource>> = Vec::with_capacity(config.sources.len());
    for kind in &config.sources {
        sources.push(build_source(*kind).await);
    }
    tracing::info!(
        sources = ?config.sources,
        ttl_secs = config.cache_ttl.as_secs(),
        "initialized resolution chain"
    );
    ResolutionChain::new(wrap_sources(sources, config.cache_ttl))
}

async fn build_source(kind: SourceKind) -> Box<dyn SecretSource> {
    match kind {
        SourceKind::Env => Box::new(EnvSource::new()),
        SourceKind::File => Box::new(FileSource::from_env()),
        SourceKind::Vault => Box::new(VaultSource::from_env()),
        #[cfg(feature = "aws")]
        SourceKind::Aws => Box::new(AwsSource::from_env().await),
        #[cfg(not(feature = "aws"))]
        SourceKind::Aws => {
            tracing::warn!(
                "built without the aws feature; using the environment source in its place"
            );
            Box::new(EnvSource::new())
        }
        SourceKind::Gcp => {
            tracing::warn!(
                "the gcp source is not available yet; using the environment source in its place"
            );
            Box::new(EnvSource::new())
        }
    }
}
