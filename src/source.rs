//! Core secret source trait and source identifiers.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::chain::ResolutionContext;
use crate::error::SourceError;

/// Identifier for a kind of backing source.
///
/// Used for configuration parsing (`SECRETCHAIN_SOURCES`) and for the
/// diagnostics snapshot exposed by the resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Process environment variables
    Env,
    /// Flat JSON file
    File,
    /// HashiCorp Vault
    Vault,
    /// AWS Secrets Manager
    Aws,
    /// GCP Secret Manager
    Gcp,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Env => "env",
            Self::File => "file",
            Self::Vault => "vault",
            Self::Aws => "aws",
            Self::Gcp => "gcp",
        }
    }
}

impl FromStr for SourceKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "env" => Ok(Self::Env),
            "file" => Ok(Self::File),
            "vault" => Ok(Self::Vault),
            "aws" => Ok(Self::Aws),
            "gcp" => Ok(Self::Gcp),
            other => Err(format!("unknown source kind: {}", other)),
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Trait for secret backing sources.
///
/// A source answers "what is the value for this key" for a single backend.
/// Implementations must be `Send + Sync`; the chain owns each registered
/// source exclusively and may call it from any number of tasks.
///
/// # Failure Contract
///
/// `fetch` distinguishes three outcomes: a value, absence (`Ok(None)`),
/// and a classified [`SourceError`]. Operational errors (network down,
/// permission denied, malformed response) let the chain continue to the
/// next source; [`SourceError::Internal`] aborts resolution.
///
/// Implementations MUST NOT log secret values.
///
/// # Resolution Context
///
/// `fetch` receives the calling resolution's context. Leaf sources ignore
/// it; a source that itself resolves secrets (for example to obtain its
/// own credentials) passes it back into
/// [`ResolutionChain::resolve_with`](crate::ResolutionChain::resolve_with)
/// so that re-entrant lookups of an in-flight key are detected.
#[async_trait]
pub trait SecretSource: Send + Sync {
    /// The kind identifier for this source.
    fn kind(&self) -> SourceKind;

    /// Retrieve the value for `key`, or `None` if this source does not
    /// have it.
    async fn fetch(
        &self,
        ctx: &mut ResolutionContext,
        key: &str,
    ) -> Result<Option<String>, SourceError>;

    /// Whether this source is currently able to serve secrets.
    ///
    /// Advisory only: surfaced in diagnostics, never consulted during
    /// resolution.
    async fn is_ready(&self) -> bool {
        true
    }

    /// Best-effort resource cleanup.
    ///
    /// Invoked exactly once per source by the resolver, on shutdown or
    /// when a reinitialization replaces the chain. Failures are logged by
    /// the caller and never abort the remaining releases.
    async fn release(&self) -> Result<(), SourceError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_kind_roundtrip() {
        for kind in
            [SourceKind::Env, SourceKind::File, SourceKind::Vault, SourceKind::Aws, SourceKind::Gcp]
        {
            let parsed: SourceKind = kind.as_str().parse().unwrap();
            assert_eq!(kind, parsed);
        }
    }

    #[test]
    fn test_source_kind_parse_is_case_insensitive() {
        assert_eq!("VAULT".parse::<SourceKind>().unwrap(), SourceKind::Vault);
        assert_eq!("  Env ".parse::<SourceKind>().unwrap(), SourceKind::Env);
    }

    #[test]
    fn test_source_kind_parse_rejects_unknown() {
        assert!("consul".parse::<SourceKind>().is_err());
    }

    #[test]
    fn test_source_kind_serialization() {
        let json = serde_json::to_string(&SourceKind::Aws).unwrap();
        assert_eq!(json, "\"aws\"");
        let parsed: SourceKind = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, SourceKind::Aws);
    }
}
