//! Environment variable source.
//!
//! Reads the requested key verbatim from the process environment. Keys
//! are caller-chosen names, not crate-namespaced, so `DB_PASSWORD`
//! resolves from the `DB_PASSWORD` variable. This source is the
//! configured fallback for unrecognized source identifiers and the
//! default chain when nothing is configured.

use async_trait::async_trait;
use std::env;

use crate::chain::ResolutionContext;
use crate::error::SourceError;
use crate::source::{SecretSource, SourceKind};

/// Process environment source.
#[derive(Debug, Clone, Default)]
pub struct EnvSource;

impl EnvSource {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SecretSource for EnvSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Env
    }

    async fn fetch(
        &self,
        _ctx: &mut ResolutionContext,
        key: &str,
    ) -> Result<Option<String>, SourceError> {
        Ok(env::var(key).ok())
    }
}
