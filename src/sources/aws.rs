//! AWS Secrets Manager source (feature `aws`).
//!
//! Looks keys up as secret ids via `GetSecretValue`. Credentials and
//! region come from the SDK's default chain (environment, shared config,
//! instance metadata), so this source carries no configuration of its
//! own. Binary-only secrets are treated as absent: the chain deals in
//! opaque strings.

use async_trait::async_trait;
use aws_sdk_secretsmanager::Client as SecretsManagerClient;

use crate::chain::ResolutionContext;
use crate::error::SourceError;
use crate::source::{SecretSource, SourceKind};

/// AWS Secrets Manager source.
pub struct AwsSource {
    client: SecretsManagerClient,
}

impl AwsSource {
    /// Source over an already-built client.
    pub fn new(client: SecretsManagerClient) -> Self {
        Self { client }
    }

    /// Build the client from the SDK's default configuration chain.
    pub async fn from_env() -> Self {
        let sdk_config = aws_config::defaults(aws_config::BehaviorVersion::latest()).load().await;
        Self { client: SecretsManagerClient::new(&sdk_config) }
    }
}

#[async_trait]
impl SecretSource for AwsSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Aws
    }

    async fn fetch(
        &self,
        _ctx: &mut ResolutionContext,
        key: &str,
    ) -> Result<Option<String>, SourceError> {
        match self.client.get_secret_value().secret_id(key).send().await {
            Ok(output) => Ok(output.secret_string().map(str::to_string)),
            Err(err) => {
                if let Some(service_err) = err.as_service_error() {
                    if service_err.is_resource_not_found_exception() {
                        return Ok(None);
                    }
                }
                // Region/credential problems and throttling are all
                // operational: the chain moves on to the next source.
                Err(SourceError::backend(format!("AWS Secrets Manager: {}", err)))
            }
        }
    }
}

impl std::fmt::Debug for AwsSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsSource").finish()
    }
}
