//! Compute metadata server token provider.

use super::{AccessToken, TokenProvider};
use crate::error::{Result, RuntimeConfigError};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

/// Environment variable overriding the metadata server host.
pub const METADATA_HOST_ENV: &str = "GCE_METADATA_HOST";

/// Connect timeout for the metadata server.
pub const METADATA_CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

/// Overall timeout for a metadata token request.
pub const METADATA_TIMEOUT: Duration = Duration::from_secs(5);

const DEFAULT_METADATA_HOST: &str = "metadata.google.internal";
const TOKEN_PATH: &str = "/computeMetadata/v1/instance/service-accounts/default/token";

/// Issues tokens for the default service account of the host instance.
///
/// Works on Compute Engine, GKE, Cloud Run, Cloud Functions and App Engine.
/// Requests give up after [`METADATA_CONNECT_TIMEOUT`] when the server cannot
/// be reached and after [`METADATA_TIMEOUT`] overall.
///
/// # Examples
///
/// ```rust,no_run
/// use rcloadenv::auth::MetadataServer;
/// use std::time::Duration;
///
/// // Honors GCE_METADATA_HOST when set.
/// let credentials = MetadataServer::new();
///
/// // Or point it somewhere explicit.
/// let credentials = MetadataServer::with_base_url("http://127.0.0.1:8080")
///     .with_timeout(Duration::from_secs(1));
/// ```
pub struct MetadataServer {
    client: Client,
    base_url: String,
}

impl MetadataServer {
    /// Create a provider for the ambient metadata server.
    pub fn new() -> Self {
        Self::from_env_lookup(&|key: &str| std::env::var(key).ok())
    }

    /// Create a provider for the metadata server named by `GCE_METADATA_HOST`
    /// in `lookup`, or the default host.
    pub fn from_env_lookup(lookup: &dyn Fn(&str) -> Option<String>) -> Self {
        let host = lookup(METADATA_HOST_ENV)
            .filter(|h| !h.is_empty())
            .unwrap_or_else(|| DEFAULT_METADATA_HOST.to_string());
        Self::with_base_url(format!("http://{}", host))
    }

    /// Create a provider for a metadata server at an explicit base URL.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            client: http_client(METADATA_TIMEOUT),
            base_url: base_url.into(),
        }
    }

    /// Replace the overall request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.client = http_client(timeout);
        self
    }

    fn token_url(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), TOKEN_PATH)
    }
}

fn http_client(timeout: Duration) -> Client {
    Client::builder()
        .connect_timeout(METADATA_CONNECT_TIMEOUT.min(timeout))
        .timeout(timeout)
        .build()
        .unwrap_or_default()
}

impl Default for MetadataServer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TokenProvider for MetadataServer {
    async fn access_token(&self, scopes: &[&str]) -> Result<AccessToken> {
        let mut request = self
            .client
            .get(self.token_url())
            .header("Metadata-Flavor", "Google");
        if !scopes.is_empty() {
            request = request.query(&[("scopes", scopes.join(","))]);
        }

        let response = request.send().await.map_err(|e| {
            RuntimeConfigError::Credentials(format!("Metadata server unreachable: {}", e))
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(RuntimeConfigError::Credentials(format!(
                "Metadata server returned status {}",
                status
            )));
        }

        response.json::<AccessToken>().await.map_err(|e| {
            RuntimeConfigError::Credentials(format!("Invalid metadata token response: {}", e))
        })
    }

    fn name(&self) -> String {
        format!("metadata:{}", self.base_url)
    }
}
