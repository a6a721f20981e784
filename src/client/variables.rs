//! Runtime Configurator variable payloads and their decoding.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Deserialize;
use std::collections::HashMap;

/// Variables of one config set, keyed by short name.
pub type ConfigMap = HashMap<String, String>;

const VARIABLES_SEGMENT: &str = "/variables/";

/// One variable as returned by `variables.list` with `returnValues=true`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Variable {
    /// Full resource name, e.g. `projects/p/configs/c/variables/db-host`.
    pub name: String,
    /// Plain string value.
    #[serde(default)]
    pub text: Option<String>,
    /// Base64-encoded binary value.
    #[serde(default)]
    pub value: Option<String>,
}

impl Variable {
    /// The last path segment of the resource name.
    ///
    /// Trailing slashes are ignored and a name without any `/` is used as-is.
    /// Returns `None` when nothing usable remains.
    pub fn short_name(&self) -> Option<&str> {
        let trimmed = self.name.trim_end_matches('/');
        let short = trimmed.rsplit('/').next().unwrap_or(trimmed);
        (!short.is_empty()).then_some(short)
    }

    /// The resource name relative to the config set's variable collection.
    ///
    /// `projects/p/configs/c/variables/long/path/name` gives `long/path/name`.
    /// A name outside any `variables/` collection is used as-is, minus
    /// trailing slashes. Returns `None` when nothing usable remains.
    pub fn relative_name(&self) -> Option<&str> {
        let trimmed = self.name.trim_end_matches('/');
        let relative = match trimmed.find(VARIABLES_SEGMENT) {
            Some(idx) => &trimmed[idx + VARIABLES_SEGMENT.len()..],
            None => trimmed.strip_prefix(&VARIABLES_SEGMENT[1..]).unwrap_or(trimmed),
        };
        (!relative.is_empty()).then_some(relative)
    }

    /// The variable's value: `text` when present, else the decoded `value`.
    ///
    /// Returns `None` when neither is set or `value` is not valid base64.
    pub fn resolve(&self) -> Option<String> {
        if let Some(text) = &self.text {
            return Some(text.clone());
        }

        let encoded = self.value.as_ref()?;
        match STANDARD.decode(encoded) {
            Ok(bytes) => Some(String::from_utf8_lossy(&bytes).into_owned()),
            Err(e) => {
                tracing::warn!(variable = %self.name, error = %e, "Skipping variable with undecodable value");
                None
            }
        }
    }
}

/// Body of a `variables.list` response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ListVariablesResponse {
    #[serde(default)]
    pub(crate) variables: Option<Vec<Variable>>,
    #[serde(default)]
    pub(crate) next_page_token: Option<String>,
}

/// Build a [`ConfigMap`] from listed variables.
///
/// Variables without a usable value or name are skipped. When two variables
/// share a short name, the later one wins.
pub fn into_config_map(variables: impl IntoIterator<Item = Variable>) -> ConfigMap {
    collect_by(variables, Variable::short_name)
}

/// Build a map keyed by [`Variable::relative_name`] instead of the short name.
///
/// Nested variables such as `long/path/name` keep their full relative path.
pub fn into_relative_map(variables: impl IntoIterator<Item = Variable>) -> ConfigMap {
    collect_by(variables, Variable::relative_name)
}

fn collect_by<F>(variables: impl IntoIterator<Item = Variable>, key: F) -> ConfigMap
where
    F: Fn(&Variable) -> Option<&str>,
{
    let mut config = ConfigMap::new();
    for variable in variables {
        let Some(value) = variable.resolve() else {
            tracing::debug!(variable = %variable.name, "Skipping variable without value");
            continue;
        };
        let Some(name) = key(&variable) else {
            tracing::debug!(variable = %variable.name, "Skipping variable without name");
            continue;
        };
        tracing::debug!(variable = %name, "Found config variable");
        config.insert(name.to_string(), value);
    }
    config
}
