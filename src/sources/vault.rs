//! HashiCorp Vault source.
//!
//! Fetches secrets with a token-authenticated `GET {addr}/v1/{key}`; the
//! key is the API path of the secret (for KV v2, `secret/data/myapp`).
//! Responses from both KV engine versions are handled: the KV v2
//! `data.data` wrapper is unwrapped, KV v1 payloads are read from `data`
//! directly. Within the payload, the field named like the key wins;
//! otherwise a payload holding exactly one field yields that field.
//!
//! A source without an address and token is inert (every key absent), so
//! a chain configured with `vault` degrades gracefully on hosts without
//! Vault access. An unreachable server is an operational error the chain
//! continues past.

use async_trait::async_trait;
use serde_json::Value;

use crate::chain::ResolutionContext;
use crate::error::SourceError;
use crate::source::{SecretSource, SourceKind};

/// Environment variables consulted for the Vault address, in order.
pub const VAULT_ADDR_VARS: [&str; 2] = ["SECRETCHAIN_VAULT_ADDR", "VAULT_ADDR"];

/// Environment variables consulted for the Vault token, in order.
pub const VAULT_TOKEN_VARS: [&str; 2] = ["SECRETCHAIN_VAULT_TOKEN", "VAULT_TOKEN"];

/// Connection settings for the Vault source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultConfig {
    /// Server address, e.g. `https://vault.example.com:8200`.
    pub address: String,
    /// Client token sent as `X-Vault-Token`.
    pub token: String,
}

impl VaultConfig {
    /// Read the address and token from the environment. Returns `None`
    /// unless both are present and non-blank.
    pub fn from_env() -> Option<Self> {
        let address = first_env(&VAULT_ADDR_VARS)?;
        let token = first_env(&VAULT_TOKEN_VARS)?;
        Some(Self { address, token })
    }
}

fn first_env(names: &[&str]) -> Option<String> {
    names.iter().find_map(|name| {
        std::env::var(name).ok().map(|raw| raw.trim().to_string()).filter(|raw| !raw.is_empty())
    })
}

/// Vault-backed source.
pub struct VaultSource {
    config: Option<VaultConfig>,
    client: Option<reqwest::Client>,
}

impl VaultSource {
    /// Source talking to an explicitly configured server.
    pub fn new(config: VaultConfig) -> Self {
        let client = match reqwest::Client::builder().build() {
            Ok(client) => Some(client),
            Err(err) => {
                tracing::warn!(error = %err, "failed to build Vault HTTP client; source is inert");
                None
            }
        };
        Self { config: Some(config), client }
    }

    /// Source configured from the environment; inert when the address or
    /// token is missing.
    pub fn from_env() -> Self {
        match VaultConfig::from_env() {
            Some(config) => Self::new(config),
            None => {
                tracing::debug!("Vault address or token not configured; source is inert");
                Self { config: None, client: None }
            }
        }
    }

    fn request_url(address: &str, key: &str) -> String {
        format!("{}/v1/{}", address.trim_end_matches('/'), key)
    }

    /// Pull the value for `key` out of a Vault read response.
    fn extract_value(body: &Value, key: &str) -> Option<String> {
        let mut data = body.get("data")?;
        // KV v2 wraps the fields in a second "data" object.
        if let Some(inner) = data.get("data").filter(|inner| inner.is_object()) {
            data = inner;
        }
        let fields = data.as_object()?;

        let value = match fields.get(key) {
            Some(value) => value,
            None if fields.len() == 1 => fields.values().next()?,
            None => return None,
        };

        match value {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }
}

#[async_trait]
impl SecretSource for VaultSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Vault
    }

    async fn fetch(
        &self,
        _ctx: &mut ResolutionContext,
        key: &str,
    ) -> Result<Option<String>, SourceError> {
        let (Some(config), Some(client)) = (&self.config, &self.client) else {
            return Ok(None);
        };

        let url = Self::request_url(&config.address, key);
        let response = client
            .get(&url)
            .header("X-Vault-Token", &config.token)
            .send()
            .await
            .map_err(|err| {
                if err.is_connect() || err.is_timeout() {
                    SourceError::connection(format!(
                        "Vault unreachable at {}: {}",
                        config.address, err
                    ))
                } else {
                    SourceError::backend(format!("Vault request failed: {}", err))
                }
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if status == reqwest::StatusCode::FORBIDDEN {
            return Err(SourceError::permission_denied(format!(
                "Vault denied access to {}",
                key
            )));
        }
        if !status.is_success() {
            tracing::warn!(key = %key, status = %status, "unexpected Vault response status");
            return Ok(None);
        }

        let body: Value = response
            .json()
            .await
            .map_err(|err| SourceError::backend(format!("invalid Vault response body: {}", err)))?;

        Ok(Self::extract_value(&body, key))
    }

    async fn is_ready(&self) -> bool {
        self.config.is_some() && self.client.is_some()
    }
}

impl std::fmt::Debug for VaultSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Token is deliberately absent from the output.
        f.debug_struct("VaultSource")
            .field("address", &self.config.as_ref().map(|c| &c.address))
            .finish()
    }
}
