//! Project id discovery.

use crate::error::{Result, RuntimeConfigError};

/// Environment variables consulted for the project id, in order.
pub const PROJECT_ENV_VARS: [&str; 2] = ["GOOGLE_CLOUD_PROJECT", "GCLOUD_PROJECT"];

/// Resolve the project id through `lookup`.
///
/// The first of [`PROJECT_ENV_VARS`] with a non-empty value wins.
///
/// # Examples
///
/// ```rust
/// use rcloadenv::project::project_id_from;
///
/// let project = project_id_from(|key| match key {
///     "GCLOUD_PROJECT" => Some("legacy-project".to_string()),
///     _ => None,
/// })
/// .unwrap();
/// assert_eq!(project, "legacy-project");
/// ```
pub fn project_id_from<F>(lookup: F) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    PROJECT_ENV_VARS
        .iter()
        .filter_map(|key| lookup(key))
        .find(|value| !value.is_empty())
        .ok_or(RuntimeConfigError::MissingProjectId)
}

/// Resolve the project id from the process environment.
pub fn project_id_from_env() -> Result<String> {
    project_id_from(|key| std::env::var(key).ok())
}
