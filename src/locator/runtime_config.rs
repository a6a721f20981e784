//! Locator that turns active profiles into one merged property source.

use super::{APPLICATION_NAME_KEY, Environment, PROPERTY_SOURCE_NAME, PropertySource};
use crate::client::{ConfigFetcher, ConfigMap};
use crate::error::{Result, RuntimeConfigError};
use crate::project::project_id_from;
use std::sync::Arc;

type EnvLookup = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Locates runtime configuration for every active profile.
///
/// For an application `billing` with profiles `dev, common`, the config sets
/// `billing_dev` and `billing_common` are loaded in that order. A key defined
/// by several profiles keeps the value of the first one. A profile that fails
/// to load is logged and contributes nothing.
///
/// # Examples
///
/// ```rust,no_run
/// use rcloadenv::client::RuntimeConfigClient;
/// use rcloadenv::locator::{RuntimeConfigLocator, StaticEnvironment};
///
/// # async fn example() -> rcloadenv::error::Result<()> {
/// let locator = RuntimeConfigLocator::new(RuntimeConfigClient::builder().build()?);
/// let env = StaticEnvironment::new()
///     .with_property("application.name", "billing")
///     .with_profiles(["dev", "common"]);
///
/// let source = locator.locate(&env).await?;
/// let config = config::Config::builder().add_source(source).build().unwrap();
/// # Ok(())
/// # }
/// ```
pub struct RuntimeConfigLocator {
    fetcher: Arc<dyn ConfigFetcher>,
    project_id: Option<String>,
    env_lookup: EnvLookup,
}

impl RuntimeConfigLocator {
    /// Create a locator that reads the project id from the process environment.
    pub fn new<F: ConfigFetcher + 'static>(fetcher: F) -> Self {
        Self {
            fetcher: Arc::new(fetcher),
            project_id: None,
            env_lookup: Arc::new(|key: &str| std::env::var(key).ok()),
        }
    }

    /// Use a fixed project id instead of discovering it.
    pub fn with_project_id(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = Some(project_id.into());
        self
    }

    /// Replace the environment variable lookup used for project discovery.
    pub fn with_env_lookup<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        self.env_lookup = Arc::new(lookup);
        self
    }

    /// The config set name for one profile.
    pub fn config_name(app_name: &str, profile: &str) -> String {
        format!("{}_{}", app_name, profile)
    }

    fn project_id(&self) -> Result<String> {
        match &self.project_id {
            Some(id) => Ok(id.clone()),
            None => project_id_from(|key| (self.env_lookup)(key)),
        }
    }

    /// Load and merge the config sets of all active profiles.
    ///
    /// # Errors
    ///
    /// Fails only if `application.name` is missing from `env` or no project
    /// id is available. Per-profile failures are logged and skipped.
    pub async fn locate<E: Environment + ?Sized>(&self, env: &E) -> Result<PropertySource> {
        let app_name = env.required_property(APPLICATION_NAME_KEY)?;
        let project_id = self.project_id()?;
        let profiles = env.active_profiles();

        let mut outcomes: Vec<(String, Result<ConfigMap>)> = Vec::with_capacity(profiles.len());
        for profile in &profiles {
            let config_name = Self::config_name(&app_name, profile);
            let outcome = self.fetcher.load_config(&project_id, &config_name).await;
            outcomes.push((config_name, outcome));
        }

        let merged = outcomes.into_iter().fold(
            PropertySource::empty(PROPERTY_SOURCE_NAME),
            |mut merged, (config_name, outcome)| {
                match outcome {
                    Ok(values) => {
                        let added = merged.merge_absent(values);
                        tracing::debug!(config = %config_name, added, "Merged runtime configuration");
                    }
                    Err(e) => {
                        tracing::error!(
                            project = %project_id,
                            config = %config_name,
                            error = %e,
                            "Error loading configuration"
                        );
                    }
                }
                merged
            },
        );

        Ok(merged)
    }

    /// Blocking form of [`locate`](Self::locate).
    ///
    /// Runs on a private current-thread runtime, so it must not be called
    /// from within an async context.
    pub fn locate_blocking<E: Environment + ?Sized>(&self, env: &E) -> Result<PropertySource> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| RuntimeConfigError::Other(format!("Failed to create runtime: {}", e)))?;
        runtime.block_on(self.locate(env))
    }
}
