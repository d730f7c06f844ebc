//! Module Registry
//!
//! Holds every declared module's metadata during initialization. Once all
//! modules are known the registry is frozen into a shared, read-only
//! [`FrozenRegistry`] that the graph builder and container consume.
//!
//! ## Registration checks
//!
//! - a module identity is registered at most once
//! - a module declares each provider token at most once
//! - a module without imports can only export tokens it provides
//! - a re-exported module must be imported
//!
//! Exports that may come from imports are checked by the graph builder,
//! once every imported module is known.

pub mod dynamic;

use std::collections::{HashMap, HashSet};
use std::ops::Deref;
use std::sync::Arc;

use modwire_domain::error::{Error, Result};
use modwire_domain::ports::DynamicModuleFactory;
use modwire_domain::value_objects::{
    ConfigurationObject, ExportEntry, ModuleDescriptor, ModuleId,
};
use tracing::debug;

use crate::resolver::DynamicModuleResolver;

pub use dynamic::{
    DYNAMIC_MODULES, DynamicModuleEntry, find_dynamic_module, list_dynamic_modules,
    resolve_registered_module,
};

/// Registry of module descriptors, in registration order
#[derive(Debug, Default)]
pub struct ModuleRegistry {
    modules: Vec<ModuleDescriptor>,
    index: HashMap<ModuleId, usize>,
}

impl ModuleRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a static (or already resolved) module
    pub fn register(&mut self, descriptor: ModuleDescriptor) -> Result<()> {
        if self.index.contains_key(&descriptor.id) {
            return Err(Error::DuplicateModule {
                module: descriptor.id,
            });
        }
        validate_descriptor(&descriptor)?;

        debug!(
            module = %descriptor.id,
            imports = descriptor.imports.len(),
            providers = descriptor.providers.len(),
            exports = descriptor.exports.len(),
            global = descriptor.global,
            "Registered module"
        );
        self.index.insert(descriptor.id.clone(), self.modules.len());
        self.modules.push(descriptor);
        Ok(())
    }

    /// Resolve a dynamic module through its factory and register it
    pub fn register_dynamic<F>(
        &mut self,
        identity: impl Into<ModuleId>,
        factory: &F,
        config: ConfigurationObject,
    ) -> Result<ModuleId>
    where
        F: DynamicModuleFactory + ?Sized,
    {
        let descriptor = DynamicModuleResolver::new().resolve(identity, factory, config)?;
        let id = descriptor.id.clone();
        self.register(descriptor)?;
        Ok(id)
    }

    /// Descriptor of a registered module
    pub fn get(&self, id: impl AsRef<str>) -> Option<&ModuleDescriptor> {
        self.index
            .get(id.as_ref())
            .map(|&position| &self.modules[position])
    }

    /// Whether a module is registered
    pub fn contains(&self, id: impl AsRef<str>) -> bool {
        self.index.contains_key(id.as_ref())
    }

    /// Registration position of a module
    pub fn position(&self, id: impl AsRef<str>) -> Option<usize> {
        self.index.get(id.as_ref()).copied()
    }

    /// Number of registered modules
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// Whether no module is registered
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Registered descriptors in registration order
    pub fn iter(&self) -> impl Iterator<Item = &ModuleDescriptor> {
        self.modules.iter()
    }

    /// Registered identities in registration order
    pub fn module_ids(&self) -> Vec<ModuleId> {
        self.modules.iter().map(|module| module.id.clone()).collect()
    }

    /// End registration; the result is shared and read-only
    pub fn freeze(self) -> FrozenRegistry {
        debug!(modules = self.modules.len(), "Module registry frozen");
        FrozenRegistry {
            inner: Arc::new(self),
        }
    }
}

/// Read-only registry shared after initialization
#[derive(Debug, Clone)]
pub struct FrozenRegistry {
    inner: Arc<ModuleRegistry>,
}

impl Deref for FrozenRegistry {
    type Target = ModuleRegistry;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

fn validate_descriptor(descriptor: &ModuleDescriptor) -> Result<()> {
    let mut seen = HashSet::new();
    for provider in &descriptor.providers {
        if !seen.insert(&provider.token) {
            return Err(Error::DuplicateProvider {
                module: descriptor.id.clone(),
                token: provider.token.clone(),
            });
        }
    }

    for export in &descriptor.exports {
        match export {
            ExportEntry::Token(token) => {
                if !descriptor.provides(token) && descriptor.imports.is_empty() {
                    return Err(Error::export_not_provided(&descriptor.id, export.to_string()));
                }
            }
            ExportEntry::Module(module) => {
                if !descriptor.imports_module(module) {
                    return Err(Error::export_not_provided(&descriptor.id, export.to_string()));
                }
            }
        }
    }
    Ok(())
}
