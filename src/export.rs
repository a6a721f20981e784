//! Exporting config variables as process environment variables.
//!
//! Variables are keyed by their name relative to the config set's
//! `variables/` collection (see [`into_relative_map`]), so nested variables
//! such as `long/path/name` can be told apart by the filter.
//!
//! [`into_relative_map`]: crate::client::into_relative_map

use crate::client::ConfigMap;
use std::collections::BTreeMap;

/// Environment variable name for a config variable.
///
/// The last path segment is upper-cased with `-` replaced by `_`:
/// `db-host` -> `DB_HOST`, `long/path/name` -> `NAME`.
pub fn env_var_name(variable: &str) -> String {
    let last = variable.rsplit('/').next().unwrap_or(variable);
    last.to_uppercase().replace('-', "_")
}

/// Selects which config variables are exported.
///
/// A variable listed in `except` is never exported. When `only` is non-empty,
/// only the variables it lists are exported. Both lists hold names relative
/// to the config set's `variables/` collection, e.g. `long/path/name`, and
/// match exactly.
#[derive(Debug, Clone, Default)]
pub struct VariableFilter {
    only: Vec<String>,
    except: Vec<String>,
}

impl VariableFilter {
    /// A filter that allows everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict the export to these variables.
    pub fn only<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.only.extend(names.into_iter().map(Into::into));
        self
    }

    /// Never export these variables.
    pub fn except<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.except.extend(names.into_iter().map(Into::into));
        self
    }

    /// Whether `name` passes the filter.
    pub fn allows(&self, name: &str) -> bool {
        if self.except.iter().any(|n| n == name) {
            return false;
        }
        self.only.is_empty() || self.only.iter().any(|n| n == name)
    }
}

/// Merge config variables into an environment map.
///
/// Existing entries are kept unless `override_existing` is set. Returns the
/// environment names that were written.
pub fn merge_into_env(
    variables: &ConfigMap,
    env: &mut BTreeMap<String, String>,
    filter: &VariableFilter,
    override_existing: bool,
) -> Vec<String> {
    let mut names: Vec<&String> = variables.keys().collect();
    names.sort();

    let mut written = Vec::new();
    for name in names {
        if !filter.allows(name) {
            tracing::debug!(variable = %name, "Skipping config variable");
            continue;
        }

        let key = env_var_name(name);
        let value = &variables[name];
        if !env.contains_key(&key) {
            tracing::debug!(envvar = %key, "Setting envvar");
        } else if override_existing {
            tracing::debug!(envvar = %key, "Overriding envvar");
        } else {
            tracing::debug!(envvar = %key, "Envvar already set");
            continue;
        }
        env.insert(key.clone(), value.clone());
        written.push(key);
    }
    written
}

/// A shell `export` statement with the value single-quoted.
pub fn export_line(key: &str, value: &str) -> String {
    format!("export {}='{}'", key, value.replace('\'', r"'\''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn variables() -> ConfigMap {
        [
            ("var1", "binval"),
            ("var2", "txtval"),
            ("long/path/name", "value3"),
            ("Name-With-Dashes", "value4"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    fn env(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_env_var_name() {
        assert_eq!(env_var_name("db-host"), "DB_HOST");
        assert_eq!(env_var_name("Name-With-Dashes"), "NAME_WITH_DASHES");
        assert_eq!(env_var_name("PORT"), "PORT");
        assert_eq!(env_var_name("long/path/name"), "NAME");
    }

    #[test]
    fn test_transforms() {
        let mut target = BTreeMap::new();
        merge_into_env(&variables(), &mut target, &VariableFilter::new(), false);

        assert_eq!(
            target,
            env(&[
                ("VAR1", "binval"),
                ("VAR2", "txtval"),
                ("NAME", "value3"),
                ("NAME_WITH_DASHES", "value4"),
            ])
        );
    }

    #[test]
    fn test_except() {
        let filter = VariableFilter::new().except(["var1", "VAR2", "long/path/name"]);
        let mut target = BTreeMap::new();
        merge_into_env(&variables(), &mut target, &filter, false);

        assert_eq!(
            target,
            env(&[("VAR2", "txtval"), ("NAME_WITH_DASHES", "value4")])
        );
    }

    #[test]
    fn test_only() {
        let filter = VariableFilter::new().only(["var1", "VAR2", "long/path/name"]);
        let mut target = BTreeMap::new();
        merge_into_env(&variables(), &mut target, &filter, false);

        assert_eq!(target, env(&[("VAR1", "binval"), ("NAME", "value3")]));
    }

    #[test]
    fn test_filter_needs_full_relative_path() {
        let filter = VariableFilter::new().except(["name"]);
        let mut target = BTreeMap::new();
        merge_into_env(&variables(), &mut target, &filter, false);
        assert_eq!(target.get("NAME").map(String::as_str), Some("value3"));

        let filter = VariableFilter::new().only(["path/name"]);
        let mut target = BTreeMap::new();
        merge_into_env(&variables(), &mut target, &filter, false);
        assert!(target.is_empty());
    }

    #[test]
    fn test_no_override() {
        let mut target = env(&[("VAR1", "original")]);
        let written = merge_into_env(&variables(), &mut target, &VariableFilter::new(), false);

        assert_eq!(target.get("VAR1").map(String::as_str), Some("original"));
        assert_eq!(written.len(), 3);
        assert!(!written.contains(&"VAR1".to_string()));
    }

    #[test]
    fn test_override() {
        let mut target = env(&[("VAR1", "original")]);
        let written = merge_into_env(&variables(), &mut target, &VariableFilter::new(), true);

        assert_eq!(target.get("VAR1").map(String::as_str), Some("binval"));
        assert_eq!(written.len(), 4);
    }

    #[test]
    fn test_export_line_quoting() {
        assert_eq!(export_line("A", "plain"), "export A='plain'");
        assert_eq!(export_line("B", "it's"), r"export B='it'\''s'");
    }
}
