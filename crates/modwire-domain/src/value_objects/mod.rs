//! Domain Value Objects
//!
//! Immutable value objects describing module composition.
//!
//! ## Value Objects
//!
//! | Value Object | Description |
//! |--------------|-------------|
//! | [`Token`] | Provider identity (name, symbol or type) |
//! | [`ModuleId`] | Module identity |
//! | [`ModuleDescriptor`] | Resolved module composition metadata |
//! | [`DynamicModuleDescriptor`] | Metadata returned by a dynamic module factory |
//! | [`ProviderEntry`] | Token bound to a construction strategy |
//! | [`ConfigurationObject`] | Options passed to a dynamic module factory |

/// Configuration value objects
pub mod config;
/// Dependencies handed to provider constructors
pub mod dependencies;
/// Module descriptors and builders
pub mod module;
/// Provider entries and strategies
pub mod provider;
/// Provider tokens
pub mod token;

pub use config::{ConfigurationObject, ConflictPolicy};
pub use dependencies::{DeferredRef, Dependencies};
pub use module::{
    DynamicModuleDescriptor, ExportEntry, ModuleBuilder, ModuleDescriptor, ModuleId,
    ModuleImport, ModuleShape,
};
pub use provider::{
    ConstructFn, Dependency, FactoryFn, Instance, Lifetime, ProviderEntry, ProviderStrategy,
    ShutdownHook, downcast_instance,
};
pub use token::Token;
