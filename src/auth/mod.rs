//! Access token providers for the Runtime Configurator API.
//!
//! The fetcher never looks up credentials on its own. It is handed a
//! [`TokenProvider`] at construction time, which keeps the ambient
//! "application default credentials" lookup swappable in tests.

mod gcloud;
mod key_file;
mod metadata;

pub use gcloud::GcloudCli;
pub use key_file::{CLOUDSDK_CONFIG_ENV, CREDENTIALS_ENV, KeyFileCredentials, well_known_path};
pub use metadata::{METADATA_CONNECT_TIMEOUT, METADATA_HOST_ENV, METADATA_TIMEOUT, MetadataServer};

use crate::error::{Result, RuntimeConfigError};
use async_trait::async_trait;
use serde::Deserialize;
use std::fmt;

/// OAuth scope required to read Runtime Configurator variables.
pub const RUNTIMECONFIG_SCOPE: &str = "https://www.googleapis.com/auth/cloudruntimeconfig";

/// A bearer token as issued by a token endpoint.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct AccessToken {
    /// The token sent in the `Authorization` header.
    #[serde(rename = "access_token")]
    pub token: String,
    /// Lifetime in seconds, when the issuer reports one.
    #[serde(default)]
    pub expires_in: Option<u64>,
}

impl AccessToken {
    /// Create a token without expiry information.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            expires_in: None,
        }
    }

    /// Value for the `Authorization` header.
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &"<redacted>")
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

/// Source of access tokens.
///
/// Implement this trait to plug in other credential mechanisms, such as
/// workload identity federation or a token cache.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Obtain a token valid for the given OAuth scopes.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeConfigError::Credentials`] if no token can be issued.
    async fn access_token(&self, scopes: &[&str]) -> Result<AccessToken>;

    /// Human-readable name for logging.
    fn name(&self) -> String;
}

/// A fixed, pre-minted token.
///
/// # Examples
///
/// ```rust
/// use rcloadenv::auth::StaticToken;
///
/// let credentials = StaticToken::new("ya29.example");
/// ```
#[derive(Clone)]
pub struct StaticToken {
    token: AccessToken,
}

impl StaticToken {
    /// Wrap a token string.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: AccessToken::new(token),
        }
    }
}

#[async_trait]
impl TokenProvider for StaticToken {
    async fn access_token(&self, _scopes: &[&str]) -> Result<AccessToken> {
        Ok(self.token.clone())
    }

    fn name(&self) -> String {
        "static".to_string()
    }
}

/// Application default credentials.
///
/// Tries each provider in order and returns the first token issued. The
/// default chain is:
///
/// 1. the key file named by `GOOGLE_APPLICATION_CREDENTIALS`,
/// 2. the gcloud application-default file
///    (`~/.config/gcloud/application_default_credentials.json`),
/// 3. the metadata server (Compute Engine, GKE, Cloud Run, App Engine),
/// 4. the local `gcloud` CLI.
pub struct DefaultCredentials {
    providers: Vec<Box<dyn TokenProvider>>,
}

impl DefaultCredentials {
    /// Build the standard chain from the process environment.
    pub fn new() -> Self {
        Self::from_env_lookup(|key| std::env::var(key).ok())
    }

    /// Build the standard chain, reading environment variables through `lookup`.
    pub fn from_env_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut providers: Vec<Box<dyn TokenProvider>> =
            vec![Box::new(KeyFileCredentials::from_env_lookup(&lookup))];
        if let Some(path) = well_known_path(&lookup) {
            providers.push(Box::new(KeyFileCredentials::from_path(path)));
        }
        providers.push(Box::new(MetadataServer::from_env_lookup(&lookup)));
        providers.push(Box::new(GcloudCli::new()));
        Self::from_providers(providers)
    }

    /// Build a chain from explicit providers, tried in the given order.
    pub fn from_providers(providers: Vec<Box<dyn TokenProvider>>) -> Self {
        Self { providers }
    }
}

impl Default for DefaultCredentials {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TokenProvider for DefaultCredentials {
    async fn access_token(&self, scopes: &[&str]) -> Result<AccessToken> {
        let mut failures = Vec::with_capacity(self.providers.len());

        for provider in &self.providers {
            match provider.access_token(scopes).await {
                Ok(token) => {
                    tracing::debug!(provider = %provider.name(), "Obtained access token");
                    return Ok(token);
                }
                Err(e) => {
                    tracing::debug!(provider = %provider.name(), error = %e, "Credential provider failed");
                    let reason = match e {
                        RuntimeConfigError::Credentials(msg) => msg,
                        other => other.to_string(),
                    };
                    failures.push(format!("{}: {}", provider.name(), reason));
                }
            }
        }

        if failures.is_empty() {
            return Err(RuntimeConfigError::Credentials(
                "No credential providers configured".to_string(),
            ));
        }

        Err(RuntimeConfigError::Credentials(failures.join("; ")))
    }

    fn name(&self) -> String {
        let names: Vec<String> = self.providers.iter().map(|p| p.name()).collect();
        format!("default[{}]", names.join(","))
    }
}
