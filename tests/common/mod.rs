//! Shared test sources for the integration suite.

#![allow(dead_code)]

use async_trait::async_trait;
use secretchain::{ResolutionContext, SecretSource, SourceError, SourceKind};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Route test logs through RUST_LOG when debugging a failure.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

/// In-memory source with shared, mutable backing data and a fetch
/// counter. Cloning shares state, so tests keep a handle for assertions
/// after handing a clone to the resolver.
#[derive(Clone)]
pub struct MemorySource {
    kind: SourceKind,
    values: Arc<Mutex<HashMap<String, String>>>,
    calls: Arc<AtomicUsize>,
}

impl MemorySource {
    pub fn new(kind: SourceKind, pairs: &[(&str, &str)]) -> Self {
        let values = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Self { kind, values: Arc::new(Mutex::new(values)), calls: Arc::new(AtomicUsize::new(0)) }
    }

    pub fn set(&self, key: &str, value: &str) {
        self.values.lock().unwrap().insert(key.to_string(), value.to_string());
    }

    pub fn remove(&self, key: &str) {
        self.values.lock().unwrap().remove(key);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SecretSource for MemorySource {
    fn kind(&self) -> SourceKind {
        self.kind
    }

    async fn fetch(
        &self,
        _ctx: &mut ResolutionContext,
        key: &str,
    ) -> Result<Option<String>, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.values.lock().unwrap().get(key).cloned())
    }
}

/// Source whose every fetch fails with an operational connection error.
#[derive(Clone, Default)]
pub struct UnreachableSource {
    calls: Arc<AtomicUsize>,
}

impl UnreachableSource {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SecretSource for UnreachableSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Vault
    }

    async fn fetch(
        &self,
        _ctx: &mut ResolutionContext,
        _key: &str,
    ) -> Result<Option<String>, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(SourceError::connection("connection refused"))
    }
}

/// Source whose every fetch fails with an internal (chain-aborting) error.
#[derive(Clone, Default)]
pub struct BrokenSource;

#[async_trait]
impl SecretSource for BrokenSource {
    fn kind(&self) -> SourceKind {
        SourceKind::File
    }

    async fn fetch(
        &self,
        _ctx: &mut ResolutionContext,
        _key: &str,
    ) -> Result<Option<String>, SourceError> {
        Err(SourceError::internal("broken source invariant"))
    }
}
