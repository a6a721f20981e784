//! The hosting environment a property source is located for.

use crate::error::{Result, RuntimeConfigError};
use std::collections::HashMap;

/// Property holding the application name.
pub const APPLICATION_NAME_KEY: &str = "application.name";

/// Property holding the active profiles, as a list or a comma-separated string.
pub const ACTIVE_PROFILES_KEY: &str = "profiles.active";

/// Properties and profiles of the application being configured.
pub trait Environment {
    /// Read a property that must be present.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeConfigError::MissingProperty`] if the key is not set.
    fn required_property(&self, key: &str) -> Result<String>;

    /// Active profiles, in priority order.
    fn active_profiles(&self) -> Vec<String>;
}

/// Uses a bootstrap `config::Config` as the hosting environment.
///
/// # Examples
///
/// ```rust
/// use rcloadenv::locator::Environment;
///
/// let bootstrap = config::Config::builder()
///     .set_override("application.name", "billing")
///     .unwrap()
///     .set_override("profiles.active", "dev,common")
///     .unwrap()
///     .build()
///     .unwrap();
///
/// assert_eq!(bootstrap.required_property("application.name").unwrap(), "billing");
/// assert_eq!(bootstrap.active_profiles(), vec!["dev", "common"]);
/// ```
impl Environment for config::Config {
    fn required_property(&self, key: &str) -> Result<String> {
        self.get_string(key)
            .map_err(|_| RuntimeConfigError::MissingProperty(key.to_string()))
    }

    fn active_profiles(&self) -> Vec<String> {
        if let Ok(list) = self.get::<Vec<String>>(ACTIVE_PROFILES_KEY) {
            return list;
        }
        match self.get_string(ACTIVE_PROFILES_KEY) {
            Ok(raw) => split_profiles(&raw),
            Err(_) => Vec::new(),
        }
    }
}

fn split_profiles(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(String::from)
        .collect()
}

/// In-memory environment.
///
/// # Examples
///
/// ```rust
/// use rcloadenv::locator::{Environment, StaticEnvironment};
///
/// let env = StaticEnvironment::new()
///     .with_property("application.name", "billing")
///     .with_profiles(["dev", "common"]);
///
/// assert_eq!(env.active_profiles(), vec!["dev", "common"]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct StaticEnvironment {
    properties: HashMap<String, String>,
    profiles: Vec<String>,
}

impl StaticEnvironment {
    /// Create an empty environment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a property.
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Replace the active profiles.
    pub fn with_profiles<I, S>(mut self, profiles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.profiles = profiles.into_iter().map(Into::into).collect();
        self
    }
}

impl Environment for StaticEnvironment {
    fn required_property(&self, key: &str) -> Result<String> {
        self.properties
            .get(key)
            .cloned()
            .ok_or_else(|| RuntimeConfigError::MissingProperty(key.to_string()))
    }

    fn active_profiles(&self) -> Vec<String> {
        self.profiles.clone()
    }
}
