//! The merged property source handed to the configuration framework.

use crate::client::ConfigMap;
use config::{Map, Source, Value, ValueKind};
use std::collections::HashMap;

/// Name under which located runtime configuration is registered.
pub const PROPERTY_SOURCE_NAME: &str = "rcloadenv";

/// A named, read-only set of properties.
///
/// Implements [`config::Source`], so it can be layered into a
/// `config::ConfigBuilder` like any file or environment source.
///
/// # Examples
///
/// ```rust
/// use rcloadenv::locator::PropertySource;
///
/// let mut values = std::collections::HashMap::new();
/// values.insert("db_host".to_string(), "10.0.0.5".to_string());
/// let source = PropertySource::new("runtime", values);
///
/// let config = config::Config::builder()
///     .add_source(source)
///     .build()
///     .unwrap();
/// assert_eq!(config.get_string("db_host").unwrap(), "10.0.0.5");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertySource {
    name: String,
    properties: HashMap<String, String>,
}

impl PropertySource {
    /// Create a property source from a finished map.
    pub fn new(name: impl Into<String>, properties: HashMap<String, String>) -> Self {
        Self {
            name: name.into(),
            properties,
        }
    }

    /// Create an empty property source.
    pub fn empty(name: impl Into<String>) -> Self {
        Self::new(name, HashMap::new())
    }

    /// Merge `entries` without touching keys that are already present.
    ///
    /// Returns the number of keys added.
    pub(crate) fn merge_absent(&mut self, entries: ConfigMap) -> usize {
        let before = self.properties.len();
        for (key, value) in entries {
            self.properties.entry(key).or_insert(value);
        }
        self.properties.len() - before
    }

    /// The source name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Look up one property.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    /// Whether `key` is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.properties.contains_key(key)
    }

    /// Number of properties.
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    /// Whether there are no properties.
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Iterate over all properties.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.properties
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Consume the source, returning its properties.
    pub fn into_properties(self) -> HashMap<String, String> {
        self.properties
    }
}

impl Source for PropertySource {
    fn clone_into_box(&self) -> Box<dyn Source + Send + Sync> {
        Box::new(self.clone())
    }

    fn collect(&self) -> Result<Map<String, Value>, config::ConfigError> {
        Ok(self
            .properties
            .iter()
            .map(|(key, value)| {
                (
                    key.clone(),
                    Value::new(Some(&self.name), ValueKind::String(value.clone())),
                )
            })
            .collect())
    }
}
