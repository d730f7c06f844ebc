//! Dynamic Module Factory Port

use crate::error::Result;
use crate::value_objects::{ConfigurationObject, DynamicModuleDescriptor};

/// Produces a module's composition metadata from runtime configuration
///
/// Any `Fn(&ConfigurationObject) -> Result<DynamicModuleDescriptor>` is a
/// factory, so plain functions can be passed where a factory is expected.
///
/// ## Example
///
/// ```rust
/// use modwire_domain::error::Result;
/// use modwire_domain::ports::DynamicModuleFactory;
/// use modwire_domain::value_objects::{
///     ConfigurationObject, DynamicModuleDescriptor, ProviderEntry,
/// };
///
/// fn config_module(config: &ConfigurationObject) -> Result<DynamicModuleDescriptor> {
///     Ok(DynamicModuleDescriptor::builder("config")
///         .provider(ProviderEntry::value("CONFIG_OPTIONS", config.clone()))
///         .export("CONFIG_OPTIONS")
///         .build_dynamic())
/// }
///
/// let descriptor = config_module.register(&ConfigurationObject::empty()).unwrap();
/// assert_eq!(descriptor.module.as_str(), "config");
/// ```
pub trait DynamicModuleFactory: Send + Sync {
    /// Build the module's descriptor for `config`
    fn register(&self, config: &ConfigurationObject) -> Result<DynamicModuleDescriptor>;
}

impl<F> DynamicModuleFactory for F
where
    F: Fn(&ConfigurationObject) -> Result<DynamicModuleDescriptor> + Send + Sync,
{
    fn register(&self, config: &ConfigurationObject) -> Result<DynamicModuleDescriptor> {
        self(config)
    }
}
