//! Configuration value objects

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// Value Object: Dynamic Module Configuration
///
/// Opaque value handed to a dynamic module factory. It is scoped to a single
/// resolution call and never shared between modules; factories extract the
/// typed options they understand with [`ConfigurationObject::parse`].
///
/// ## Example
///
/// ```rust
/// use modwire_domain::value_objects::ConfigurationObject;
/// use serde::Deserialize;
///
/// #[derive(Deserialize)]
/// struct ConfigOptions {
///     folder: String,
/// }
///
/// let config = ConfigurationObject::new(serde_json::json!({ "folder": "./config" }));
/// let options: ConfigOptions = config.parse().unwrap();
/// assert_eq!(options.folder, "./config");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigurationObject(Value);

impl ConfigurationObject {
    /// Wrap a JSON value
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// Configuration carrying no options
    pub fn empty() -> Self {
        Self(Value::Null)
    }

    /// Build from any serializable options type
    pub fn from_serializable<T: Serialize>(options: &T) -> Result<Self> {
        Ok(Self(serde_json::to_value(options)?))
    }

    /// Extract typed options
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T> {
        T::deserialize(&self.0).map_err(|e| {
            Error::configuration_with_source("Invalid dynamic module configuration", e)
        })
    }

    /// Top-level option by key
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Underlying JSON value
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Whether no options are present
    pub fn is_empty(&self) -> bool {
        match &self.0 {
            Value::Null => true,
            Value::Object(map) => map.is_empty(),
            _ => false,
        }
    }
}

impl From<Value> for ConfigurationObject {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

/// Tie-break policy when several imports expose a provider for one token
///
/// A module's own providers always shadow imported ones, and global modules
/// only fill tokens that are not otherwise visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictPolicy {
    /// The first import in declaration order wins
    #[default]
    FirstImport,
    /// The last import in declaration order wins
    LastImport,
    /// Two different origins for one token are an error
    Strict,
}
