//! # secretchain
//!
//! Ordered-source secret resolution with per-source TTL caching and typed
//! field injection.
//!
//! Applications name the secrets they need (database passwords, API tokens,
//! connection strings); secretchain resolves each name by consulting an
//! ordered chain of backing sources (environment variables, a JSON file,
//! HashiCorp Vault, or cloud secret managers) and returns the first
//! non-empty value it finds. Every source sits behind a TTL cache, and a
//! per-call resolution context detects circular references when a source
//! calls back into the chain.
//!
//! # Architecture
//!
//! ```text
//! caller → SecretResolver::resolve(key)
//!            → [CachedSource₁ → Source₁, CachedSource₂ → Source₂, …]
//!            → first non-empty value wins
//! ```
//!
//! - [`SecretSource`]: the capability each backing source implements
//! - [`CachedSource`]: TTL caching decorator applied uniformly to every source
//! - [`ResolutionChain`]: the ordered chain with fallback and the
//!   circular-reference guard
//! - [`SecretTarget`] + [`ResolutionChain::inject`]: populates annotated
//!   application fields from resolved secrets
//! - [`SecretResolver`]: owns the current chain; supports atomic
//!   reinitialization and shutdown
//!
//! # Basic Example
//!
//! ```rust,ignore
//! use secretchain::{ResolverConfig, SecretResolver};
//!
//! // Chain order and cache TTL come from SECRETCHAIN_SOURCES and
//! // SECRETCHAIN_CACHE_TTL_SECS; an empty configuration yields the
//! // environment source alone.
//! let resolver = SecretResolver::from_env().await;
//!
//! let password = resolver.resolve("DB_PASSWORD").await?;
//! ```
//!
//! # Injection Example
//!
//! ```rust,ignore
//! use secretchain::{SecretDescriptor, SecretField, SecretTarget};
//!
//! #[derive(Default)]
//! struct DatabaseConfig {
//!     url: String,
//!     password: String,
//! }
//!
//! impl SecretTarget for DatabaseConfig {
//!     fn secret_fields(&mut self) -> Vec<SecretField<'_>> {
//!         vec![
//!             SecretField::text("url", SecretDescriptor::new("DB_URL"), &mut self.url),
//!             SecretField::text("password", SecretDescriptor::new("DB_PASSWORD"), &mut self.password),
//!         ]
//!     }
//! }
//!
//! let mut config = DatabaseConfig::default();
//! resolver.inject(&mut config).await?;
//! ```
//!
//! # Failure Policy
//!
//! Operational source failures (unreachable network, denied permission,
//! missing key) are logged and mean "try the next source"; a flaky backend
//! never aborts resolution. Internal source errors abort the whole chain
//! immediately. Resolution ends in exactly one of a returned non-empty value
//! or a classified [`ResolveError`]; absence is always an error at the
//! public entry point, never a silent empty value.

pub mod cached;
pub mod chain;
pub mod config;
pub mod error;
pub mod inject;
pub mod resolver;
pub mod source;
pub mod sources;

// Re-export main types
pub use cached::CachedSource;
pub use chain::{ResolutionChain, ResolutionContext};
pub use config::{ResolverConfig, DEFAULT_CACHE_TTL_SECS};
pub use error::{InjectError, ResolveError, SourceError};
pub use inject::{SecretDescriptor, SecretField, SecretSlot, SecretTarget};
pub use resolver::{SecretResolver, SourceInfo};
pub use source::{SecretSource, SourceKind};
pub use sources::{EnvSource, FileSource, VaultConfig, VaultSource};

#[cfg(feature = "aws")]
pub use sources::AwsSource;

/// Library version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
