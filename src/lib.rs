//! # rcloadenv
//!
//! Load Google Cloud Runtime Configurator variables as application configuration.
//!
//! ## Overview
//!
//! `rcloadenv` provides two building blocks:
//! - [`RuntimeConfigClient`](client::RuntimeConfigClient): lists the variables of
//!   one config set and decodes them into a flat `name -> value` map
//! - [`RuntimeConfigLocator`](locator::RuntimeConfigLocator): loads the config
//!   set of every active profile (`<app>_<profile>`) and merges them into a
//!   [`PropertySource`](locator::PropertySource) that plugs into `config-rs`
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rcloadenv::prelude::*;
//! use serde::Deserialize;
//!
//! #[derive(Debug, Deserialize)]
//! struct AppConfig {
//!     db_host: String,
//!     port: u16,
//! }
//!
//! # async fn example() -> std::result::Result<(), Box<dyn std::error::Error>> {
//! // application.name and profiles.active come from the bootstrap config
//! let bootstrap = config::Config::builder()
//!     .add_source(config::File::with_name("config/bootstrap"))
//!     .build()?;
//!
//! let locator = RuntimeConfigLocator::new(RuntimeConfigClient::builder().build()?);
//! let runtime = locator.locate(&bootstrap).await?;
//!
//! // Files < runtime config < environment
//! let settings: AppConfig = config::Config::builder()
//!     .add_source(config::File::with_name("config/default"))
//!     .add_source(runtime)
//!     .add_source(config::Environment::with_prefix("APP"))
//!     .build()?
//!     .try_deserialize()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature Flags
//!
//! - `cli` (default): the `rcloadenv` launcher binary
//! - `yaml`, `toml`: extra file formats for `config-rs` bootstrap files

#![warn(missing_docs, rust_2024_compatibility)]
#![deny(unsafe_code)]

pub mod auth;
pub mod client;
pub mod error;
pub mod export;
pub mod locator;
pub mod project;

/// Convenient re-exports for common usage patterns.
pub mod prelude {
    pub use crate::auth::{DefaultCredentials, StaticToken, TokenProvider};
    pub use crate::client::{ConfigFetcher, ConfigMap, RuntimeConfigClient};
    pub use crate::error::{Result, RuntimeConfigError};
    pub use crate::locator::{Environment, PropertySource, RuntimeConfigLocator, StaticEnvironment};
}
