//! Dynamic Module Resolver
//!
//! Invokes a dynamic module's configuration factory and normalizes the
//! returned metadata into the same [`ModuleDescriptor`] shape a static
//! declaration produces.
//!
//! ```text
//! identity + ConfigurationObject
//!              │
//!              ▼
//! ┌──────────────────────────────┐
//! │ factory.register(&config)    │  → DynamicModuleDescriptor
//! └──────────────────────────────┘
//!              │  module == identity ?
//!              ▼
//!       ModuleDescriptor
//! ```
//!
//! The configuration object is consumed by the call and never shared with
//! other modules. No I/O happens here.

use modwire_domain::error::{Error, Result};
use modwire_domain::ports::DynamicModuleFactory;
use modwire_domain::value_objects::{ConfigurationObject, ModuleDescriptor, ModuleId};
use tracing::debug;

/// Resolver turning dynamic module factories into static descriptors
#[derive(Debug, Clone, Copy, Default)]
pub struct DynamicModuleResolver;

impl DynamicModuleResolver {
    /// Create a resolver
    pub fn new() -> Self {
        Self
    }

    /// Invoke `factory` with `config` and validate the returned identity
    ///
    /// # Returns
    /// * `Ok(ModuleDescriptor)` - descriptor equivalent to a static declaration
    /// * `Err(Error::IdentityMismatch)` - the factory answered for another module
    pub fn resolve<F>(
        &self,
        identity: impl Into<ModuleId>,
        factory: &F,
        config: ConfigurationObject,
    ) -> Result<ModuleDescriptor>
    where
        F: DynamicModuleFactory + ?Sized,
    {
        let identity = identity.into();
        debug!(module = %identity, configured = !config.is_empty(), "Resolving dynamic module");

        let dynamic = factory.register(&config)?;
        if dynamic.module != identity {
            return Err(Error::IdentityMismatch {
                expected: identity,
                actual: dynamic.module,
            });
        }

        let descriptor = dynamic.into_descriptor();
        debug!(
            module = %descriptor.id,
            providers = descriptor.providers.len(),
            exports = descriptor.exports.len(),
            "Dynamic module resolved"
        );
        Ok(descriptor)
    }
}

/// Resolve a dynamic module with a default resolver
pub fn resolve_dynamic_module<F>(
    identity: impl Into<ModuleId>,
    factory: &F,
    config: ConfigurationObject,
) -> Result<ModuleDescriptor>
where
    F: DynamicModuleFactory + ?Sized,
{
    DynamicModuleResolver::new().resolve(identity, factory, config)
}
