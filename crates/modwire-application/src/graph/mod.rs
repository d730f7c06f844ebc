//! Dependency Graph Builder
//!
//! Turns a frozen [`ModuleRegistry`](crate::registry::ModuleRegistry) into a
//! validated graph: import edges are resolved and checked for cycles, export
//! sets are computed, and every module gets the set of tokens visible inside
//! it together with the module whose provider backs each token.
//!
//! ## Build steps
//!
//! | Step | Failure |
//! |------|---------|
//! | imports name registered modules | [`Error::UnknownModule`] |
//! | import cycles carry deferred markers on every edge | [`Error::Cycle`] |
//! | exports settle to a fixed point | [`Error::Internal`] |
//! | exports are provided or imported | [`Error::ExportNotProvided`] |
//! | visibility under the conflict policy | [`Error::AmbiguousToken`] |
//! | required dependencies are visible | [`Error::UnresolvableToken`] |
//! | provider dependency cycles are deferred | [`Error::Cycle`] |
//!
//! Building is synchronous and single-threaded; the result is immutable.

mod cycles;
mod visibility;

use std::collections::HashMap;
use std::fmt;

use modwire_domain::constants::SCOPE_SEPARATOR;
use modwire_domain::error::{CycleKind, Error, Result};
use modwire_domain::value_objects::{
    ConflictPolicy, ModuleDescriptor, ModuleId, ProviderEntry, Token,
};
use tracing::{debug, info};

use crate::registry::FrozenRegistry;

pub use visibility::TokenMap;

/// A provider node: the module that declares the provider and its token
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProviderKey {
    /// Declaring (origin) module
    pub module: ModuleId,
    /// Provider token
    pub token: Token,
}

impl ProviderKey {
    /// Create a provider key
    pub fn new(module: impl Into<ModuleId>, token: impl Into<Token>) -> Self {
        Self {
            module: module.into(),
            token: token.into(),
        }
    }
}

impl fmt::Display for ProviderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.module, SCOPE_SEPARATOR, self.token)
    }
}

/// A cycle tolerated because every edge carries a deferred marker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeferredCycle {
    /// Import or dependency graph
    pub kind: CycleKind,
    /// Closed cycle path
    pub path: Vec<String>,
}

/// Validated module graph with per-module visibility
#[derive(Debug)]
pub struct DependencyGraph {
    registry: FrozenRegistry,
    policy: ConflictPolicy,
    module_order: Vec<ModuleId>,
    exports: HashMap<ModuleId, TokenMap>,
    visibility: HashMap<ModuleId, TokenMap>,
    provider_order: Vec<ProviderKey>,
    deferred_cycles: Vec<DeferredCycle>,
}

impl DependencyGraph {
    /// Build and validate the graph of `registry`
    pub fn build(registry: FrozenRegistry, policy: ConflictPolicy) -> Result<Self> {
        check_imports(&registry)?;

        let roots = registry.module_ids();
        let imports = cycles::traverse(&roots, |id: &ModuleId| {
            registry
                .get(id)
                .map(|descriptor| {
                    descriptor
                        .imports
                        .iter()
                        .map(|import| (import.module.clone(), import.deferred))
                        .collect()
                })
                .unwrap_or_default()
        })
        .map_err(|path| Error::cycle(CycleKind::Import, path))?;

        let mut deferred_cycles: Vec<DeferredCycle> = imports
            .deferred_cycles
            .iter()
            .map(|path| DeferredCycle {
                kind: CycleKind::Import,
                path: path.iter().map(ToString::to_string).collect(),
            })
            .collect();
        let module_order = imports.order;

        let exports = visibility::compute_exports(&registry, &module_order, policy)?;
        visibility::validate_exports(&registry, &exports)?;

        let globals: Vec<ModuleId> = registry
            .iter()
            .filter(|descriptor| descriptor.global)
            .map(|descriptor| descriptor.id.clone())
            .collect();
        let mut visible = HashMap::with_capacity(registry.len());
        for descriptor in registry.iter() {
            let set = visibility::module_visibility(descriptor, &exports, &globals, policy)?;
            visible.insert(descriptor.id.clone(), set);
        }

        check_dependencies(&registry, &visible)?;

        let nodes: Vec<ProviderKey> = registry
            .iter()
            .flat_map(|descriptor| {
                descriptor
                    .providers
                    .iter()
                    .map(|provider| ProviderKey::new(&descriptor.id, &provider.token))
            })
            .collect();
        let providers = cycles::traverse(&nodes, |node: &ProviderKey| {
            dependency_edges(&registry, &visible, node)
        })
        .map_err(|path| Error::cycle(CycleKind::Dependency, path))?;

        deferred_cycles.extend(providers.deferred_cycles.iter().map(|path| DeferredCycle {
            kind: CycleKind::Dependency,
            path: path.iter().map(ToString::to_string).collect(),
        }));
        for cycle in &deferred_cycles {
            debug!(kind = %cycle.kind, path = %cycle.path.join(" -> "), "Deferred cycle tolerated");
        }

        info!(
            modules = module_order.len(),
            providers = providers.order.len(),
            deferred_cycles = deferred_cycles.len(),
            policy = ?policy,
            "Dependency graph built"
        );

        Ok(Self {
            registry,
            policy,
            module_order,
            exports,
            visibility: visible,
            provider_order: providers.order,
            deferred_cycles,
        })
    }

    /// Registry the graph was built from
    pub fn registry(&self) -> &FrozenRegistry {
        &self.registry
    }

    /// Conflict policy used for visibility
    pub fn policy(&self) -> ConflictPolicy {
        self.policy
    }

    /// Descriptor of a module
    pub fn module(&self, id: impl AsRef<str>) -> Option<&ModuleDescriptor> {
        self.registry.get(id)
    }

    /// Tokens visible inside `module`
    pub fn visible_providers(&self, module: impl AsRef<str>) -> Option<&TokenMap> {
        self.visibility.get(module.as_ref())
    }

    /// Tokens `module` exports
    pub fn exported_tokens(&self, module: impl AsRef<str>) -> Option<&TokenMap> {
        self.exports.get(module.as_ref())
    }

    /// Origin module of `token` as seen from `module`
    pub fn resolve_token(&self, module: &ModuleId, token: &Token) -> Result<ModuleId> {
        let visible = self
            .visibility
            .get(module)
            .ok_or_else(|| Error::configuration(format!("Module '{module}' is not registered")))?;
        visible
            .get(token)
            .cloned()
            .ok_or_else(|| Error::unresolvable(module, token))
    }

    /// Provider declared by `key.module` for `key.token`
    pub fn provider(&self, key: &ProviderKey) -> Option<&ProviderEntry> {
        self.registry
            .get(&key.module)
            .and_then(|descriptor| descriptor.provider(&key.token))
    }

    /// Modules with every import before its importer (deferred cycles aside)
    pub fn module_order(&self) -> &[ModuleId] {
        &self.module_order
    }

    /// Providers with every dependency before its dependent
    pub fn initialization_order(&self) -> &[ProviderKey] {
        &self.provider_order
    }

    /// Tolerated import and dependency cycles
    pub fn deferred_cycles(&self) -> &[DeferredCycle] {
        &self.deferred_cycles
    }
}

fn check_imports(registry: &FrozenRegistry) -> Result<()> {
    for descriptor in registry.iter() {
        for import in &descriptor.imports {
            if !registry.contains(&import.module) {
                return Err(Error::UnknownModule {
                    module: import.module.clone(),
                    referenced_by: descriptor.id.clone(),
                });
            }
        }
    }
    Ok(())
}

fn check_dependencies(
    registry: &FrozenRegistry,
    visible: &HashMap<ModuleId, TokenMap>,
) -> Result<()> {
    for descriptor in registry.iter() {
        let Some(set) = visible.get(&descriptor.id) else {
            continue;
        };
        let declared = descriptor.providers.iter().chain(&descriptor.entry_points);
        for dependency in declared.flat_map(|entry| &entry.dependencies) {
            if !dependency.optional && !set.contains(&dependency.token) {
                return Err(Error::unresolvable(&descriptor.id, &dependency.token));
            }
        }
    }
    Ok(())
}

fn dependency_edges(
    registry: &FrozenRegistry,
    visible: &HashMap<ModuleId, TokenMap>,
    node: &ProviderKey,
) -> Vec<(ProviderKey, bool)> {
    let (Some(descriptor), Some(set)) = (registry.get(&node.module), visible.get(&node.module))
    else {
        return Vec::new();
    };
    let Some(provider) = descriptor.provider(&node.token) else {
        return Vec::new();
    };
    provider
        .dependencies
        .iter()
        .filter_map(|dependency| {
            set.get(&dependency.token).map(|origin| {
                (
                    ProviderKey::new(origin, &dependency.token),
                    dependency.deferred,
                )
            })
        })
        .collect()
}
