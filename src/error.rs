//! Error types for secret resolution and injection.

use thiserror::Error;

/// Errors surfaced by an individual secret source.
///
/// The chain treats these in two classes. Operational errors (the backend
/// being unreachable, authentication or permission problems, a malformed
/// response) are expected in normal operation and mean "try the next
/// source". [`SourceError::Internal`] marks a programming-contract
/// violation inside a source and aborts the whole chain.
#[derive(Error, Debug)]
pub enum SourceError {
    /// The backend could not be reached.
    #[error("connection failed: {message}")]
    Connection { message: String },

    /// Authentication with the backend failed.
    #[error("authentication failed: {message}")]
    Auth { message: String },

    /// The backend refused access to the key.
    #[error("permission denied: {message}")]
    PermissionDenied { message: String },

    /// Backend-specific operational failure (bad response, parse error).
    #[error("source error: {message}")]
    Backend { message: String },

    /// Non-operational failure inside the source. Aborts the chain.
    #[error("internal source error: {message}")]
    Internal {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl SourceError {
    /// Create a connection failure.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection { message: message.into() }
    }

    /// Create an authentication failure.
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth { message: message.into() }
    }

    /// Create a permission-denied failure.
    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::PermissionDenied { message: message.into() }
    }

    /// Create a backend-specific operational failure.
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend { message: message.into() }
    }

    /// Create an internal failure.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal { message: message.into(), source: None }
    }

    /// Create an internal failure wrapping its cause.
    pub fn internal_with(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Internal { message: message.into(), source: Some(Box::new(source)) }
    }

    /// Whether the chain should swallow this error and continue to the
    /// next source. False only for [`SourceError::Internal`].
    pub fn is_operational(&self) -> bool {
        !matches!(self, Self::Internal { .. })
    }
}

/// Errors returned by [`ResolutionChain::resolve`](crate::ResolutionChain::resolve).
///
/// Resolution ends in exactly one of a returned non-empty value or one of
/// these four kinds; there is no silent-absent return.
#[derive(Error, Debug)]
pub enum ResolveError {
    /// The requested key was blank or empty.
    #[error("secret key cannot be empty")]
    InvalidKey,

    /// The key is already being resolved further up this call's context.
    #[error("circular reference detected for key: {key}")]
    CircularReference { key: String },

    /// A source failed in a non-operational way, aborting the chain.
    #[error("source '{source}' failed while resolving secret")]
    SourceFailure {
        source: String,
        #[source]
        cause: SourceError,
    },

    /// Every configured source was consulted and none had the key.
    #[error("missing required secret: {key}")]
    NotFound { key: String },
}

impl ResolveError {
    pub(crate) fn circular(key: impl Into<String>) -> Self {
        Self::CircularReference { key: key.into() }
    }

    pub(crate) fn not_found(key: impl Into<String>) -> Self {
        Self::NotFound { key: key.into() }
    }

    pub(crate) fn source_failure(source: impl Into<String>, cause: SourceError) -> Self {
        Self::SourceFailure { source: source.into(), cause }
    }
}

/// Errors returned by the injection pass.
#[derive(Error, Debug)]
pub enum InjectError {
    /// A required binding had no resolvable value and no default.
    #[error("missing secret for field '{field}' (key: {key})")]
    MissingSecret { field: String, key: String },

    /// A binding's apply function rejected the resolved value.
    #[error("failed to write field '{field}': {reason}")]
    FieldWrite { field: String, reason: String },

    /// Resolution failed for a reason other than simple absence.
    #[error(transparent)]
    Resolution(#[from] ResolveError),
}
