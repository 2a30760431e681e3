//! JSON file source.
//!
//! Serves keys from a flat JSON object (`{"DB_PASSWORD": "hunter2", ...}`)
//! named by `SECRETCHAIN_SECRETS_FILE`. The file is parsed once per source
//! instance and the parsed map is reused for the instance's lifetime;
//! reinitializing the resolver builds a fresh instance and therefore
//! re-reads the file.
//!
//! An unset path or a missing file makes the source inert (every key is
//! absent), so later sources in the chain still run. A file that exists
//! but cannot be read or parsed is an operational error.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::chain::ResolutionContext;
use crate::error::SourceError;
use crate::source::{SecretSource, SourceKind};

/// Environment variable naming the secrets file.
pub const FILE_PATH_VAR: &str = "SECRETCHAIN_SECRETS_FILE";

/// Flat-JSON-file source.
pub struct FileSource {
    path: Option<PathBuf>,
    entries: RwLock<Option<Arc<HashMap<String, String>>>>,
}

impl FileSource {
    /// Source backed by an explicit file path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: Some(path.into()), entries: RwLock::new(None) }
    }

    /// Source configured from `SECRETCHAIN_SECRETS_FILE`; inert when the
    /// variable is unset or blank.
    pub fn from_env() -> Self {
        let path = std::env::var(FILE_PATH_VAR)
            .ok()
            .map(|raw| raw.trim().to_string())
            .filter(|raw| !raw.is_empty())
            .map(PathBuf::from);
        Self { path, entries: RwLock::new(None) }
    }

    /// Load and memoize the file contents. A missing file is absent and
    /// is NOT memoized, so the source picks the file up once it appears.
    async fn snapshot(&self) -> Result<Option<Arc<HashMap<String, String>>>, SourceError> {
        if let Some(entries) = self.entries.read().await.as_ref() {
            return Ok(Some(entries.clone()));
        }

        let Some(path) = &self.path else {
            return Ok(None);
        };

        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "secrets file not found");
                return Ok(None);
            }
            Err(err) => {
                return Err(SourceError::backend(format!(
                    "failed to read secrets file {}: {}",
                    path.display(),
                    err
                )));
            }
        };

        let root: Value = serde_json::from_slice(&bytes).map_err(|err| {
            SourceError::backend(format!(
                "failed to parse secrets file {}: {}",
                path.display(),
                err
            ))
        })?;

        let Value::Object(object) = root else {
            return Err(SourceError::backend(format!(
                "secrets file {} must contain a top-level JSON object",
                path.display()
            )));
        };

        // Scalar values are stringified; structured values are skipped so
        // they read as absent rather than leaking JSON syntax as a secret.
        let entries: HashMap<String, String> = object
            .into_iter()
            .filter_map(|(key, value)| match value {
                Value::String(s) => Some((key, s)),
                Value::Number(n) => Some((key, n.to_string())),
                Value::Bool(b) => Some((key, b.to_string())),
                _ => None,
            })
            .collect();

        let entries = Arc::new(entries);
        *self.entries.write().await = Some(entries.clone());
        tracing::debug!(path = %path.display(), count = entries.len(), "loaded secrets file");
        Ok(Some(entries))
    }
}

#[async_trait]
impl SecretSource for FileSource {
    fn kind(&self) -> SourceKind {
        SourceKind::File
    }

    async fn fetch(
        &self,
        _ctx: &mut ResolutionContext,
        key: &str,
    ) -> Result<Option<String>, SourceError> {
        match self.snapshot().await? {
            Some(entries) => Ok(entries.get(key).cloned()),
            None => Ok(None),
        }
    }

    async fn is_ready(&self) -> bool {
        match &self.path {
            Some(path) => path.exists(),
            None => false,
        }
    }
}

impl std::fmt::Debug for FileSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileSource").field("path", &self.path).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_secrets(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[tokio::test]
    async fn test_resolves_keys_from_json_object() {
        let file = write_secrets(r#"{"A": "f1", "B": "f2"}"#);
        let source = FileSource::new(file.path());
        let mut ctx = ResolutionContext::new();

        assert_eq!(source.fetch(&mut ctx, "A").await.unwrap(), Some("f1".to_string()));
        assert_eq!(source.fetch(&mut ctx, "B").await.unwrap(), Some("f2".to_string()));
        assert_eq!(source.fetch(&mut ctx, "C").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_scalars_are_stringified_and_structures_skipped() {
        let file = write_secrets(r#"{"port": 5432, "flag": true, "nested": {"x": 1}}"#);
        let source = FileSource::new(file.path());
        let mut ctx = ResolutionContext::new();

        assert_eq!(source.fetch(&mut ctx, "port").await.unwrap(), Some("5432".to_string()));
        assert_eq!(source.fetch(&mut ctx, "flag").await.unwrap(), Some("true".to_string()));
        assert_eq!(source.fetch(&mut ctx, "nested").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_unconfigured_source_is_inert() {
        let source = FileSource { path: None, entries: RwLock::new(None) };
        let mut ctx = ResolutionContext::new();
        assert_eq!(source.fetch(&mut ctx, "anything").await.unwrap(), None);
        assert!(!source.is_ready().await);
    }

    #[tokio::test]
    async fn test_missing_file_is_absent_not_error() {
        let source = FileSource::new("/nonexistent/secretchain-test.json");
        let mut ctx = ResolutionContext::new();
        assert_eq!(source.fetch(&mut ctx, "anything").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_malformed_file_is_operational_error() {
        let file = write_secrets("not json at all");
        let source = FileSource::new(file.path());
        let mut ctx = ResolutionContext::new();

        let err = source.fetch(&mut ctx, "anything").await.unwrap_err();
        assert!(err.is_operational());
    }

    #[tokio::test]
    async fn test_non_object_root_is_operational_error() {
        let file = write_secrets(r#"["a", "b"]"#);
        let source = FileSource::new(file.path());
        let mut ctx = ResolutionContext::new();

        let err = source.fetch(&mut ctx, "anything").await.unwrap_err();
        assert!(err.is_operational());
    }

    #[tokio::test]
    async fn test_contents_are_loaded_once() {
        let file = write_secrets(r#"{"A": "before"}"#);
        let source = FileSource::new(file.path());
        let mut ctx = ResolutionContext::new();

        assert_eq!(source.fetch(&mut ctx, "A").await.unwrap(), Some("before".to_string()));

        // Rewriting the file does not change an already-loaded instance.
        std::fs::write(file.path(), r#"{"A": "after"}"#).unwrap();
        assert_eq!(source.fetch(&mut ctx, "A").await.unwrap(), Some("before".to_string()));

        // A fresh instance (as built by reinitialization) sees the change.
        let fresh = FileSource::new(file.path());
        assert_eq!(fresh.fetch(&mut ctx, "A").await.unwrap(), Some("after".to_string()));
    }
}
