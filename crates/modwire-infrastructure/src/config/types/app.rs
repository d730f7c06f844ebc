//! Main application configuration

use std::collections::BTreeMap;

use modwire_domain::value_objects::ConfigurationObject;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use super::container::ContainerConfig;
pub use super::logging::LoggingConfig;

/// Application configuration
///
/// ```toml
/// [logging]
/// level = "debug"
///
/// [container]
/// conflict_policy = "strict"
/// eager = true
///
/// [modules.config]
/// folder = "./config"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Provider container configuration
    #[serde(default)]
    pub container: ContainerConfig,

    /// Dynamic module options keyed by module identity
    #[serde(default)]
    pub modules: BTreeMap<String, Value>,
}

impl AppConfig {
    /// Configuration object for the dynamic module `name`
    ///
    /// Modules without a configured section receive an empty object.
    pub fn module_config(&self, name: &str) -> ConfigurationObject {
        self.modules
            .get(name)
            .cloned()
            .map_or_else(ConfigurationObject::empty, ConfigurationObject::new)
    }

    /// Set the options of the dynamic module `name`
    pub fn with_module_config(mut self, name: impl Into<String>, options: Value) -> Self {
        self.modules.insert(name.into(), options);
        self
    }
}
