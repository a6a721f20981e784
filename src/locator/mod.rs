//! Property source location for a hosting configuration environment.

mod environment;
mod property_source;
mod runtime_config;

pub use environment::{ACTIVE_PROFILES_KEY, APPLICATION_NAME_KEY, Environment, StaticEnvironment};
pub use property_source::{PROPERTY_SOURCE_NAME, PropertySource};
pub use runtime_config::RuntimeConfigLocator;
