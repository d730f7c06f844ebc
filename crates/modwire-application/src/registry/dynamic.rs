//! Dynamic Module Catalog
//!
//! Auto-registration system for dynamic modules. Crates that ship a
//! configurable module submit an entry to [`DYNAMIC_MODULES`] with
//! `#[linkme::distributed_slice]`; applications then enable the module by
//! name and pass it runtime configuration.
//!
//! ```rust,ignore
//! #[linkme::distributed_slice(DYNAMIC_MODULES)]
//! static CONFIG_MODULE: DynamicModuleEntry = DynamicModuleEntry {
//!     module: "config",
//!     description: "Loads configuration files from a folder",
//!     factory: config_module,
//! };
//! ```

use modwire_domain::error::{Error, Result};
use modwire_domain::value_objects::{
    ConfigurationObject, DynamicModuleDescriptor, ModuleDescriptor,
};

use crate::resolver::DynamicModuleResolver;

/// Catalog entry for a dynamic module
pub struct DynamicModuleEntry {
    /// Module identity the factory answers for
    pub module: &'static str,
    /// Human-readable description
    pub description: &'static str,
    /// Factory producing the module's descriptor from configuration
    pub factory: fn(&ConfigurationObject) -> Result<DynamicModuleDescriptor>,
}

#[linkme::distributed_slice]
pub static DYNAMIC_MODULES: [DynamicModuleEntry] = [..];

/// Catalog entry for `module`; the first submitted entry wins
pub fn find_dynamic_module(module: &str) -> Option<&'static DynamicModuleEntry> {
    DYNAMIC_MODULES.iter().find(|entry| entry.module == module)
}

/// List all cataloged dynamic modules
///
/// # Returns
/// Vector of (identity, description) tuples
pub fn list_dynamic_modules() -> Vec<(&'static str, &'static str)> {
    DYNAMIC_MODULES
        .iter()
        .map(|entry| (entry.module, entry.description))
        .collect()
}

/// Resolve a cataloged dynamic module by identity
///
/// # Returns
/// * `Ok(ModuleDescriptor)` - descriptor produced by the cataloged factory
/// * `Err(Error::Configuration)` - no module is cataloged under `module`
pub fn resolve_registered_module(
    module: &str,
    config: ConfigurationObject,
) -> Result<ModuleDescriptor> {
    let entry = find_dynamic_module(module).ok_or_else(|| {
        let available: Vec<&str> = DYNAMIC_MODULES.iter().map(|entry| entry.module).collect();
        Error::configuration(format!(
            "Unknown dynamic module '{module}'. Available modules: {available:?}"
        ))
    })?;

    DynamicModuleResolver::new().resolve(entry.module, &entry.factory, config)
}
