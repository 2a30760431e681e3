//! Resolver configuration: ordered source kinds and the global cache TTL.

use std::str::FromStr;
use std::time::Duration;

use crate::source::SourceKind;

/// Environment variable naming the ordered, comma-separated source list.
pub const SOURCES_VAR: &str = "SECRETCHAIN_SOURCES";

/// Environment variable carrying the global cache TTL in seconds.
pub const CACHE_TTL_VAR: &str = "SECRETCHAIN_CACHE_TTL_SECS";

/// Fallback TTL when the configured value is absent or unparsable.
pub const DEFAULT_CACHE_TTL_SECS: u64 = 3600;

/// Configuration consumed when a resolver is (re)initialized.
///
/// Parsing is deliberately lenient: configuration mistakes degrade to the
/// environment source with a warning instead of failing startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverConfig {
    /// Source kinds in consultation order. Never empty: an empty
    /// configured list means the environment source alone.
    pub sources: Vec<SourceKind>,
    /// Time-to-live applied to every source's cache. Zero disables
    /// caching.
    pub cache_ttl: Duration,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            sources: vec![SourceKind::Env],
            cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
        }
    }
}

impl ResolverConfig {
    /// Build a configuration from an explicit source order, applying the
    /// empty-list fallback.
    pub fn new(sources: Vec<SourceKind>, cache_ttl: Duration) -> Self {
        let sources = if sources.is_empty() {
            tracing::warn!("no sources configured; defaulting to the environment source");
            vec![SourceKind::Env]
        } else {
            sources
        };
        Self { sources, cache_ttl }
    }

    /// Load the configuration from `SECRETCHAIN_SOURCES` and
    /// `SECRETCHAIN_CACHE_TTL_SECS`.
    pub fn from_env() -> Self {
        let raw_sources = std::env::var(SOURCES_VAR).ok();
        let raw_ttl = std::env::var(CACHE_TTL_VAR).ok();
        Self::parse(raw_sources.as_deref(), raw_ttl.as_deref())
    }

    /// Parse raw configuration values.
    ///
    /// Blank list items are skipped; unrecognized identifiers warn and map
    /// to the environment source; a non-numeric TTL warns and falls back
    /// to [`DEFAULT_CACHE_TTL_SECS`]; a TTL at or below zero disables
    /// caching.
    pub fn parse(raw_sources: Option<&str>, raw_ttl: Option<&str>) -> Self {
        let sources = raw_sources
            .unwrap_or("")
            .split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(|item| {
                SourceKind::from_str(item).unwrap_or_else(|_| {
                    tracing::warn!(
                        source = %item,
                        "unknown source kind; defaulting to the environment source"
                    );
                    SourceKind::Env
                })
            })
            .collect();

        Self::new(sources, parse_ttl(raw_ttl))
    }
}

fn parse_ttl(raw: Option<&str>) -> Duration {
    let Some(raw) = raw else {
        return Duration::from_secs(DEFAULT_CACHE_TTL_SECS);
    };

    match raw.trim().parse::<i64>() {
        Ok(secs) if secs <= 0 => Duration::ZERO,
        Ok(secs) => Duration::from_secs(secs as u64),
        Err(_) => {
            tracing::warn!(
                ttl = %raw,
                default_secs = DEFAULT_CACHE_TTL_SECS,
                "invalid cache TTL; using default"
            );
            Duration::from_secs(DEFAULT_CACHE_TTL_SECS)
        }
    }
}
