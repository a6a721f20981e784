//! Credentials read from a JSON key file.
//!
//! Two file types are understood, both identified by their `type` field:
//!
//! - `service_account`: a downloaded service-account key. A JWT assertion is
//!   signed with the private key (RS256) and exchanged at `token_uri`.
//! - `authorized_user`: the file written by `gcloud auth application-default
//!   login`. Its refresh token is exchanged at the OAuth token endpoint.

use super::{AccessToken, TokenProvider};
use crate::error::{Result, RuntimeConfigError};
use async_trait::async_trait;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable naming the key file to use.
pub const CREDENTIALS_ENV: &str = "GOOGLE_APPLICATION_CREDENTIALS";

/// Environment variable overriding the gcloud configuration directory.
pub const CLOUDSDK_CONFIG_ENV: &str = "CLOUDSDK_CONFIG";

const WELL_KNOWN_FILE: &str = "application_default_credentials.json";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: u64 = 3600;
const TOKEN_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Location of the file written by `gcloud auth application-default login`.
///
/// `$CLOUDSDK_CONFIG/application_default_credentials.json` when that variable
/// is set, otherwise under `~/.config/gcloud` (`%APPDATA%\gcloud` on Windows).
pub fn well_known_path(lookup: &dyn Fn(&str) -> Option<String>) -> Option<PathBuf> {
    let non_empty = |key: &str| lookup(key).filter(|v| !v.is_empty());

    let config_dir = match non_empty(CLOUDSDK_CONFIG_ENV) {
        Some(dir) => PathBuf::from(dir),
        None if cfg!(windows) => non_empty("APPDATA")
            .map(PathBuf::from)
            .or_else(dirs::config_dir)?
            .join("gcloud"),
        None => non_empty("HOME")
            .map(PathBuf::from)
            .or_else(dirs::home_dir)?
            .join(".config")
            .join("gcloud"),
    };
    Some(config_dir.join(WELL_KNOWN_FILE))
}

/// Contents of a credentials key file.
#[derive(Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum KeyFile {
    ServiceAccount(ServiceAccountKey),
    AuthorizedUser(AuthorizedUser),
}

#[derive(Clone, Deserialize)]
struct ServiceAccountKey {
    client_email: String,
    private_key: String,
    #[serde(default)]
    private_key_id: Option<String>,
    #[serde(default = "default_token_uri")]
    token_uri: String,
}

#[derive(Clone, Deserialize)]
struct AuthorizedUser {
    client_id: String,
    client_secret: String,
    refresh_token: String,
    #[serde(default = "default_token_uri")]
    token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

#[derive(Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: String,
    aud: &'a str,
    iat: u64,
    exp: u64,
}

impl ServiceAccountKey {
    fn assertion(&self, scopes: &[&str]) -> Result<String> {
        let iat = jsonwebtoken::get_current_timestamp();
        let claims = AssertionClaims {
            iss: &self.client_email,
            scope: scopes.join(" "),
            aud: &self.token_uri,
            iat,
            exp: iat + ASSERTION_LIFETIME_SECS,
        };

        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.private_key_id.clone();

        let key = EncodingKey::from_rsa_pem(self.private_key.as_bytes()).map_err(|e| {
            RuntimeConfigError::Credentials(format!("Invalid service account private key: {}", e))
        })?;
        jsonwebtoken::encode(&header, &claims, &key).map_err(|e| {
            RuntimeConfigError::Credentials(format!("Failed to sign token assertion: {}", e))
        })
    }
}

impl KeyFile {
    fn parse(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| RuntimeConfigError::Credentials(format!("Invalid credentials file: {}", e)))
    }

    async fn exchange(&self, client: &Client, scopes: &[&str]) -> Result<AccessToken> {
        match self {
            KeyFile::ServiceAccount(key) => {
                let assertion = key.assertion(scopes)?;
                request_token(
                    client,
                    &key.token_uri,
                    &[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())],
                )
                .await
            }
            // User credentials carry the scopes granted at login.
            KeyFile::AuthorizedUser(user) => {
                request_token(
                    client,
                    &user.token_uri,
                    &[
                        ("grant_type", "refresh_token"),
                        ("client_id", user.client_id.as_str()),
                        ("client_secret", user.client_secret.as_str()),
                        ("refresh_token", user.refresh_token.as_str()),
                    ],
                )
                .await
            }
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            KeyFile::ServiceAccount(_) => "service_account",
            KeyFile::AuthorizedUser(_) => "authorized_user",
        }
    }
}

async fn request_token(client: &Client, token_uri: &str, form: &[(&str, &str)]) -> Result<AccessToken> {
    let response = client.post(token_uri).form(form).send().await.map_err(|e| {
        RuntimeConfigError::Credentials(format!("Token endpoint unreachable: {}", e))
    })?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(RuntimeConfigError::Credentials(format!(
            "Token endpoint returned status {}: {}",
            status, body
        )));
    }

    response
        .json::<AccessToken>()
        .await
        .map_err(|e| RuntimeConfigError::Credentials(format!("Invalid token response: {}", e)))
}

/// Issues tokens from a service-account or authorized-user key file.
///
/// The file is read on every token request, so a provider pointing at a
/// file that does not exist yet is not an error until it is asked for a
/// token.
///
/// # Examples
///
/// ```rust,no_run
/// use rcloadenv::auth::KeyFileCredentials;
///
/// // Honors GOOGLE_APPLICATION_CREDENTIALS.
/// let credentials = KeyFileCredentials::from_env();
///
/// // Or an explicit key file.
/// let credentials = KeyFileCredentials::from_path("/secrets/runtimeconfig-reader.json");
/// ```
pub struct KeyFileCredentials {
    path: Option<PathBuf>,
    client: Client,
}

impl KeyFileCredentials {
    /// Use the file named by `GOOGLE_APPLICATION_CREDENTIALS`.
    pub fn from_env() -> Self {
        Self::from_env_lookup(&|key: &str| std::env::var(key).ok())
    }

    /// Use the file named by `GOOGLE_APPLICATION_CREDENTIALS` in `lookup`.
    pub fn from_env_lookup(lookup: &dyn Fn(&str) -> Option<String>) -> Self {
        let path = lookup(CREDENTIALS_ENV)
            .filter(|p| !p.is_empty())
            .map(PathBuf::from);
        Self::with_path(path)
    }

    /// Use an explicit key file.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self::with_path(Some(path.into()))
    }

    fn with_path(path: Option<PathBuf>) -> Self {
        let client = Client::builder()
            .timeout(TOKEN_REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self { path, client }
    }

    /// The key file, if one is configured.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

impl fmt::Debug for KeyFileCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyFileCredentials")
            .field("path", &self.path)
            .finish()
    }
}

#[async_trait]
impl TokenProvider for KeyFileCredentials {
    async fn access_token(&self, scopes: &[&str]) -> Result<AccessToken> {
        let Some(path) = &self.path else {
            return Err(RuntimeConfigError::Credentials(format!(
                "{} is not set",
                CREDENTIALS_ENV
            )));
        };

        let contents = std::fs::read_to_string(path).map_err(|e| {
            RuntimeConfigError::Credentials(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let key_file = KeyFile::parse(&contents)?;

        tracing::debug!(path = %path.display(), kind = key_file.kind(), "Exchanging key file credentials");
        key_file.exchange(&self.client, scopes).await
    }

    fn name(&self) -> String {
        match &self.path {
            Some(path) => format!("key_file:{}", path.display()),
            None => format!("key_file:${}", CREDENTIALS_ENV),
        }
    }
}
