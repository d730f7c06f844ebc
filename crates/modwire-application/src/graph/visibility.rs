//! Export and visibility computation

use std::collections::HashMap;

use modwire_domain::error::{Error, Result};
use modwire_domain::value_objects::{
    ConflictPolicy, ExportEntry, ModuleDescriptor, ModuleId, Token,
};
use tracing::{debug, warn};

use crate::registry::ModuleRegistry;

/// Tokens mapped to the module whose provider backs them, in insertion order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenMap {
    order: Vec<Token>,
    origins: HashMap<Token, ModuleId>,
}

impl TokenMap {
    /// Add `token` unless already present; returns whether it was added
    pub(crate) fn insert(&mut self, token: Token, origin: ModuleId) -> bool {
        if self.origins.contains_key(&token) {
            return false;
        }
        self.order.push(token.clone());
        self.origins.insert(token, origin);
        true
    }

    /// Origin module of `token`
    pub fn get(&self, token: &Token) -> Option<&ModuleId> {
        self.origins.get(token)
    }

    /// Whether `token` is present
    pub fn contains(&self, token: &Token) -> bool {
        self.origins.contains_key(token)
    }

    /// Tokens in insertion order
    pub fn tokens(&self) -> &[Token] {
        &self.order
    }

    /// `(token, origin)` pairs in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&Token, &ModuleId)> {
        self.order
            .iter()
            .filter_map(|token| self.origins.get(token).map(|origin| (token, origin)))
    }

    /// Number of tokens
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether the map is empty
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Origin of `token` among `descriptor`'s imports, chosen by `policy`
///
/// `Strict` ambiguities are reported by [`module_visibility`]; here the first
/// candidate stands in.
fn import_origin(
    descriptor: &ModuleDescriptor,
    token: &Token,
    exports: &HashMap<ModuleId, TokenMap>,
    policy: ConflictPolicy,
) -> Option<ModuleId> {
    let mut candidates = descriptor
        .imports
        .iter()
        .filter_map(|import| exports.get(&import.module))
        .filter_map(|set| set.get(token));

    match policy {
        ConflictPolicy::LastImport => candidates.last().cloned(),
        ConflictPolicy::FirstImport | ConflictPolicy::Strict => candidates.next().cloned(),
    }
}

/// Export set of one module given the current export sets of the others
fn module_exports(
    descriptor: &ModuleDescriptor,
    exports: &HashMap<ModuleId, TokenMap>,
    policy: ConflictPolicy,
) -> TokenMap {
    let mut out = TokenMap::default();
    for entry in &descriptor.exports {
        match entry {
            ExportEntry::Token(token) => {
                if descriptor.provides(token) {
                    out.insert(token.clone(), descriptor.id.clone());
                } else if let Some(origin) = import_origin(descriptor, token, exports, policy) {
                    out.insert(token.clone(), origin);
                }
            }
            ExportEntry::Module(module) => {
                if let Some(set) = exports.get(module) {
                    for (token, origin) in set.iter() {
                        out.insert(token.clone(), origin.clone());
                    }
                }
            }
        }
    }
    out
}

/// Export sets of every module, iterated over `order` until stable
///
/// For an acyclic graph in dependency-first order the second pass only
/// confirms the first; deferred import cycles need one extra pass per
/// module on the cycle.
pub(crate) fn compute_exports(
    registry: &ModuleRegistry,
    order: &[ModuleId],
    policy: ConflictPolicy,
) -> Result<HashMap<ModuleId, TokenMap>> {
    let mut exports: HashMap<ModuleId, TokenMap> = order
        .iter()
        .map(|id| (id.clone(), TokenMap::default()))
        .collect();

    let max_passes = order.len() + 2;
    for pass in 1..=max_passes {
        let mut changed = false;
        for id in order {
            let Some(descriptor) = registry.get(id) else {
                continue;
            };
            let computed = module_exports(descriptor, &exports, policy);
            if exports.get(id) != Some(&computed) {
                exports.insert(id.clone(), computed);
                changed = true;
            }
        }
        if !changed {
            debug!(passes = pass, "Export sets settled");
            return Ok(exports);
        }
    }

    Err(Error::internal(format!(
        "export sets did not settle after {max_passes} passes"
    )))
}

/// Every token export must be backed by an own provider or an import
pub(crate) fn validate_exports(
    registry: &ModuleRegistry,
    exports: &HashMap<ModuleId, TokenMap>,
) -> Result<()> {
    for descriptor in registry.iter() {
        let Some(set) = exports.get(&descriptor.id) else {
            continue;
        };
        for entry in &descriptor.exports {
            if let ExportEntry::Token(token) = entry
                && !set.contains(token)
            {
                return Err(Error::export_not_provided(&descriptor.id, entry.to_string()));
            }
        }
    }
    Ok(())
}

/// Tokens visible inside one module
///
/// Own providers first, then imported exports under `policy`, then exports
/// of global modules for tokens still missing.
pub(crate) fn module_visibility(
    descriptor: &ModuleDescriptor,
    exports: &HashMap<ModuleId, TokenMap>,
    globals: &[ModuleId],
    policy: ConflictPolicy,
) -> Result<TokenMap> {
    let mut visible = TokenMap::default();
    for provider in &descriptor.providers {
        visible.insert(provider.token.clone(), descriptor.id.clone());
    }

    let mut candidates: Vec<(Token, Vec<ModuleId>)> = Vec::new();
    let mut positions: HashMap<Token, usize> = HashMap::new();
    for import in &descriptor.imports {
        let Some(set) = exports.get(&import.module) else {
            continue;
        };
        for (token, origin) in set.iter() {
            if descriptor.provides(token) {
                if origin != &descriptor.id {
                    warn!(
                        module = %descriptor.id,
                        token = %token,
                        shadowed = %origin,
                        "Own provider shadows imported token"
                    );
                }
                continue;
            }
            let position = *positions.entry(token.clone()).or_insert_with(|| {
                candidates.push((token.clone(), Vec::new()));
                candidates.len() - 1
            });
            let origins = &mut candidates[position].1;
            if !origins.contains(origin) {
                origins.push(origin.clone());
            }
        }
    }

    for (token, origins) in candidates {
        let chosen = match (policy, origins.as_slice()) {
            (_, []) => continue,
            (_, [only]) => only.clone(),
            (ConflictPolicy::Strict, _) => {
                return Err(Error::AmbiguousToken {
                    module: descriptor.id.clone(),
                    token,
                    candidates: origins,
                });
            }
            (ConflictPolicy::FirstImport, [first, ..]) => first.clone(),
            (ConflictPolicy::LastImport, [.., last]) => last.clone(),
        };
        if origins.len() > 1 {
            warn!(
                module = %descriptor.id,
                token = %token,
                chosen = %chosen,
                candidates = ?origins,
                "Token exported by several imports"
            );
        }
        visible.insert(token, chosen);
    }

    for global in globals {
        if global == &descriptor.id {
            continue;
        }
        let Some(set) = exports.get(global) else {
            continue;
        };
        for (token, origin) in set.iter() {
            if visible.insert(token.clone(), origin.clone()) {
                debug!(
                    module = %descriptor.id,
                    token = %token,
                    global = %global,
                    "Token visible through global module"
                );
            }
        }
    }

    Ok(visible)
}
