//! # modwire
//!
//! Module composition and dependency injection for a hosting application.
//!
//! Modules declare the providers they offer, the modules they import and
//! what they export. Dynamic modules produce that metadata from runtime
//! configuration. At startup the modules are resolved, the import graph is
//! validated, and providers are served from an explicitly owned container,
//! one instance per module scope and token.
//!
//! ## Example
//!
//! ```ignore
//! use modwire::prelude::*;
//!
//! fn config_module(config: &ConfigurationObject) -> Result<DynamicModuleDescriptor> {
//!     let folder = config.get("folder").cloned().unwrap_or_default();
//!     Ok(DynamicModuleDescriptor::builder("config")
//!         .provider(ProviderEntry::value("CONFIG_OPTIONS", folder))
//!         .export("CONFIG_OPTIONS")
//!         .build_dynamic())
//! }
//!
//! let app = ModuleDescriptor::builder("app").import("config").build();
//! let context = ApplicationBuilder::new(AppConfig::default(), app)
//!     .dynamic_module("config", config_module, ConfigurationObject::new(options))
//!     .build()
//!     .await?;
//! ```
//!
//! ## Architecture
//!
//! - `domain` - tokens, descriptors, provider entries, ports and errors
//! - `application` - module registry, dynamic resolver, graph, container
//! - `infrastructure` - configuration, logging, lifecycle and bootstrap

/// Domain layer - descriptors, tokens, ports and errors
///
/// Re-exports from the domain crate for convenience
pub mod domain {
    pub use modwire_domain::*;
}

/// Application layer - registry, resolution, graph and container
///
/// Re-exports from the application crate for convenience
pub mod application {
    pub use modwire_application::*;
}

/// Infrastructure layer - configuration, logging and bootstrap
///
/// Re-exports from the infrastructure crate for convenience
pub mod infrastructure {
    pub use modwire_infrastructure::*;
}

// Re-export commonly used domain types at the crate root
pub use domain::*;

// Re-export the composition engine
pub use application::{
    DependencyGraph, DynamicModuleResolver, ModuleRegistry, ProviderContainer,
    resolve_dynamic_module,
};

// Re-export the application entry point
pub use infrastructure::{AppConfig, AppContext, ApplicationBuilder, init_app, init_logging};

/// Everything needed to declare modules and start an application
pub mod prelude {
    pub use modwire_application::{
        DYNAMIC_MODULES, DynamicModuleEntry, ModuleRegistry, ProviderContainer,
    };
    pub use modwire_domain::error::{Error, Result};
    pub use modwire_domain::ports::DynamicModuleFactory;
    pub use modwire_domain::value_objects::{
        ConfigurationObject, ConflictPolicy, DeferredRef, Dependencies, DynamicModuleDescriptor,
        ModuleDescriptor, ModuleId, ProviderEntry, Token,
    };
    pub use modwire_infrastructure::{
        AppConfig, AppContext, ApplicationBuilder, ConfigLoader, LifecyclePhase, init_app,
    };
}
