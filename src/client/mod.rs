//! Runtime Configurator REST client.

mod variables;

pub use variables::{ConfigMap, Variable, into_config_map, into_relative_map};

use crate::auth::{DefaultCredentials, RUNTIMECONFIG_SCOPE, TokenProvider};
use crate::error::{Result, RuntimeConfigError};
use async_trait::async_trait;
use reqwest::{Client, Url, header::HeaderValue};
use std::sync::Arc;
use std::time::Duration;
use variables::ListVariablesResponse;

/// Default API root of the Runtime Configurator service.
pub const RUNTIMECONFIG_API_ROOT: &str = "https://runtimeconfig.googleapis.com/v1beta1/";

/// Anything that can load the variables of a config set.
///
/// [`RuntimeConfigClient`] is the production implementation; the locator
/// only depends on this trait.
#[async_trait]
pub trait ConfigFetcher: Send + Sync {
    /// Load all variables of `config_name` in `project_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if credentials cannot be obtained, the request fails,
    /// or the response cannot be parsed.
    async fn load_config(&self, project_id: &str, config_name: &str) -> Result<ConfigMap>;
}

/// Client for the `projects.configs.variables.list` endpoint.
///
/// # Examples
///
/// ```rust,no_run
/// use rcloadenv::client::{ConfigFetcher, RuntimeConfigClient};
///
/// # async fn example() -> rcloadenv::error::Result<()> {
/// let client = RuntimeConfigClient::builder().build()?;
/// let variables = client.load_config("my-project", "my-app_dev").await?;
/// println!("{} variables", variables.len());
/// # Ok(())
/// # }
/// ```
pub struct RuntimeConfigClient {
    client: Client,
    api_root: Url,
    credentials: Arc<dyn TokenProvider>,
    page_size: Option<u32>,
}

impl RuntimeConfigClient {
    /// Create a new builder for constructing a client.
    pub fn builder() -> RuntimeConfigClientBuilder {
        RuntimeConfigClientBuilder::new()
    }

    /// URL listing the variables of a config set, without query parameters.
    ///
    /// `project_id` and `config_name` are percent-encoded as single path
    /// segments.
    pub fn variables_url(&self, project_id: &str, config_name: &str) -> Result<Url> {
        let mut url = self.api_root.clone();
        url.path_segments_mut()
            .map_err(|_| RuntimeConfigError::Other(format!("Invalid API root: {}", self.api_root)))?
            .pop_if_empty()
            .extend(["projects", project_id, "configs", config_name, "variables"]);
        Ok(url)
    }

    /// Fetch every variable of a config set, following `nextPageToken`.
    pub async fn list_variables(&self, project_id: &str, config_name: &str) -> Result<Vec<Variable>> {
        let token = self.credentials.access_token(&[RUNTIMECONFIG_SCOPE]).await?;
        let auth_header = HeaderValue::from_str(&token.bearer())
            .map_err(|e| RuntimeConfigError::Credentials(format!("Invalid bearer token: {}", e)))?;

        let url = self.variables_url(project_id, config_name)?;
        let mut variables = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut query: Vec<(&str, String)> = vec![("returnValues", "true".to_string())];
            if let Some(size) = self.page_size {
                query.push(("pageSize", size.to_string()));
            }
            if let Some(token) = &page_token {
                query.push(("pageToken", token.clone()));
            }

            let response = self
                .client
                .get(url.clone())
                .header("Authorization", auth_header.clone())
                .query(&query)
                .send()
                .await?;

            let status = response.status();
            let body = response.text().await?;
            if !status.is_success() {
                return Err(RuntimeConfigError::Status {
                    status: status.as_u16(),
                    body,
                });
            }

            let page: ListVariablesResponse = serde_json::from_str(&body)?;
            variables.extend(page.variables.ok_or(RuntimeConfigError::MissingVariables)?);

            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(next) => page_token = Some(next),
                None => break,
            }
        }

        Ok(variables)
    }
}

#[async_trait]
impl ConfigFetcher for RuntimeConfigClient {
    async fn load_config(&self, project_id: &str, config_name: &str) -> Result<ConfigMap> {
        tracing::info!(project = %project_id, config = %config_name, "Fetching runtime configuration");
        let variables = self.list_variables(project_id, config_name).await?;
        Ok(into_config_map(variables))
    }
}

/// Builder for constructing a [`RuntimeConfigClient`].
///
/// # Examples
///
/// ```rust,no_run
/// use rcloadenv::auth::StaticToken;
/// use rcloadenv::client::{ConfigFetcher, RuntimeConfigClient};
/// use std::time::Duration;
///
/// # fn example() -> rcloadenv::error::Result<()> {
/// let client = RuntimeConfigClient::builder()
///     .with_credentials(StaticToken::new("ya29.token"))
///     .with_timeout(Duration::from_secs(10))
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct RuntimeConfigClientBuilder {
    api_root: String,
    credentials: Option<Arc<dyn TokenProvider>>,
    timeout: Option<Duration>,
    page_size: Option<u32>,
}

impl RuntimeConfigClientBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self {
            api_root: RUNTIMECONFIG_API_ROOT.to_string(),
            credentials: None,
            timeout: None,
            page_size: None,
        }
    }

    /// Override the API root (scheme, host and version path).
    ///
    /// A trailing `/` is added if missing.
    pub fn with_api_root(mut self, api_root: impl Into<String>) -> Self {
        let mut root = api_root.into();
        if !root.ends_with('/') {
            root.push('/');
        }
        self.api_root = root;
        self
    }

    /// Set the token provider.
    ///
    /// Defaults to [`DefaultCredentials`].
    pub fn with_credentials<P: TokenProvider + 'static>(mut self, credentials: P) -> Self {
        self.credentials = Some(Arc::new(credentials));
        self
    }

    /// Set a request timeout. Without one the transport default applies.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Ask the server for pages of at most `page_size` variables.
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = Some(page_size);
        self
    }

    /// Build the client.
    ///
    /// # Errors
    ///
    /// Returns an error if the API root is not a valid URL or the HTTP client
    /// cannot be constructed.
    pub fn build(self) -> Result<RuntimeConfigClient> {
        let api_root = Url::parse(&self.api_root).map_err(|e| {
            RuntimeConfigError::Other(format!("Invalid API root {}: {}", self.api_root, e))
        })?;

        let mut builder = Client::builder();
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| RuntimeConfigError::Other(format!("Failed to create HTTP client: {}", e)))?;

        let credentials: Arc<dyn TokenProvider> = match self.credentials {
            Some(credentials) => credentials,
            None => Arc::new(DefaultCredentials::new()),
        };

        Ok(RuntimeConfigClient {
            client,
            api_root,
            credentials,
            page_size: self.page_size,
        })
    }
}

impl Default for RuntimeConfigClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::StaticToken;

    #[test]
    fn test_default_variables_url() {
        let client = RuntimeConfigClient::builder()
            .with_credentials(StaticToken::new("t"))
            .build()
            .unwrap();

        assert_eq!(
            client.variables_url("my-project", "app_dev").unwrap().as_str(),
            "https://runtimeconfig.googleapis.com/v1beta1/projects/my-project/configs/app_dev/variables"
        );
    }

    #[test]
    fn test_api_root_gets_trailing_slash() {
        let client = RuntimeConfigClient::builder()
            .with_api_root("http://localhost:8080/v1beta1")
            .with_credentials(StaticToken::new("t"))
            .build()
            .unwrap();

        assert_eq!(
            client.variables_url("p", "c").unwrap().as_str(),
            "http://localhost:8080/v1beta1/projects/p/configs/c/variables"
        );
    }

    #[test]
    fn test_variables_url_encodes_segments() {
        let client = RuntimeConfigClient::builder()
            .with_api_root("http://localhost:8080/v1beta1")
            .with_credentials(StaticToken::new("t"))
            .build()
            .unwrap();

        assert_eq!(
            client.variables_url("my project", "app_dev?x#y/z").unwrap().as_str(),
            "http://localhost:8080/v1beta1/projects/my%20project/configs/app_dev%3Fx%23y%2Fz/variables"
        );
    }

    #[test]
    fn test_invalid_api_root() {
        let result = RuntimeConfigClient::builder()
            .with_api_root("not a url")
            .with_credentials(StaticToken::new("t"))
            .build();

        assert!(matches!(result, Err(RuntimeConfigError::Other(_))));
    }

    #[test]
    fn test_builder_options() {
        let client = RuntimeConfigClient::builder()
            .with_credentials(StaticToken::new("t"))
            .with_timeout(Duration::from_secs(5))
            .with_page_size(50)
            .build()
            .unwrap();

        assert_eq!(client.page_size, Some(50));
    }
}
