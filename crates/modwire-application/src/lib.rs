//! # modwire Application Layer
//!
//! Module composition engine:
//!
//! - [`registry`]: module registry and the dynamic module catalog
//! - [`resolver`]: dynamic module resolution
//! - [`graph`]: import graph, exports and per-module visibility
//! - [`container`]: lazily constructed, scope-cached provider instances
//!
//! ```text
//! ModuleRegistry ──freeze──► DependencyGraph ──► ProviderContainer
//!       ▲
//!       └── DynamicModuleResolver (runtime-configured modules)
//! ```

pub mod container;
pub mod graph;
pub mod registry;
pub mod resolver;

pub use container::{EntryPoint, ProviderContainer};
pub use graph::{DeferredCycle, DependencyGraph, ProviderKey, TokenMap};
pub use registry::{
    DYNAMIC_MODULES, DynamicModuleEntry, FrozenRegistry, ModuleRegistry, find_dynamic_module,
    list_dynamic_modules, resolve_registered_module,
};
pub use resolver::{DynamicModuleResolver, resolve_dynamic_module};
