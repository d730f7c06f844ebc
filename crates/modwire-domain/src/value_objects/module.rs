//! Module Descriptors
//!
//! Value objects describing how a module is composed: the modules it
//! imports, the providers it offers, what it exports, and the entry points
//! a hosting application constructs at startup.
//!
//! Static modules are declared with [`ModuleDescriptor::builder`]. Dynamic
//! modules are produced at runtime as a [`DynamicModuleDescriptor`], which
//! carries the same collections plus the identity-confirming `module` field
//! and converts losslessly into a [`ModuleDescriptor`].

use std::borrow::{Borrow, Cow};
use std::fmt;

use super::provider::ProviderEntry;
use super::token::Token;

/// Value Object: Module Identity
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleId(Cow<'static, str>);

impl ModuleId {
    /// Create a module identity
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    /// Identity as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for ModuleId {
    fn from(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }
}

impl From<String> for ModuleId {
    fn from(name: String) -> Self {
        Self(Cow::Owned(name))
    }
}

impl From<&ModuleId> for ModuleId {
    fn from(id: &ModuleId) -> Self {
        id.clone()
    }
}

impl AsRef<str> for ModuleId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for ModuleId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Reference to an imported module
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModuleImport {
    /// Imported module
    pub module: ModuleId,
    /// Deferred-reference marker; cycles are tolerated only when every
    /// edge of the cycle carries it
    pub deferred: bool,
}

/// An entry of a module's export list
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ExportEntry {
    /// Export a single token
    Token(Token),
    /// Re-export everything an imported module exports
    Module(ModuleId),
}

impl fmt::Display for ExportEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Token(token) => write!(f, "{token}"),
            Self::Module(module) => write!(f, "module {module}"),
        }
    }
}

/// Composition metadata of a resolved module
#[derive(Debug, Clone)]
pub struct ModuleDescriptor {
    /// Unique module identity
    pub id: ModuleId,
    /// Imported modules, in declaration order
    pub imports: Vec<ModuleImport>,
    /// Providers offered by this module
    pub providers: Vec<ProviderEntry>,
    /// Exported tokens and re-exported modules
    pub exports: Vec<ExportEntry>,
    /// Externally facing entry points (root-level modules)
    pub entry_points: Vec<ProviderEntry>,
    /// Exports are visible to every module without an import
    pub global: bool,
}

impl ModuleDescriptor {
    /// Start declaring a static module
    pub fn builder(id: impl Into<ModuleId>) -> ModuleBuilder {
        ModuleBuilder::new(id)
    }

    /// Whether this module declares a provider for `token`
    pub fn provides(&self, token: &Token) -> bool {
        self.provider(token).is_some()
    }

    /// Provider declared for `token`
    pub fn provider(&self, token: &Token) -> Option<&ProviderEntry> {
        self.providers.iter().find(|provider| &provider.token == token)
    }

    /// Whether this module imports `module`
    pub fn imports_module(&self, module: &ModuleId) -> bool {
        self.imports.iter().any(|import| &import.module == module)
    }

    /// Identity-and-token projection used for structural comparison
    pub fn shape(&self) -> ModuleShape {
        ModuleShape {
            id: self.id.clone(),
            imports: self.imports.clone(),
            providers: self
                .providers
                .iter()
                .map(|provider| provider.token.clone())
                .collect(),
            exports: self.exports.clone(),
            entry_points: self
                .entry_points
                .iter()
                .map(|entry| entry.token.clone())
                .collect(),
            global: self.global,
        }
    }
}

/// Composition metadata returned by a dynamic module factory
#[derive(Debug, Clone)]
pub struct DynamicModuleDescriptor {
    /// Identity of the module the factory belongs to
    pub module: ModuleId,
    /// Imported modules, in declaration order
    pub imports: Vec<ModuleImport>,
    /// Providers offered by this module
    pub providers: Vec<ProviderEntry>,
    /// Exported tokens and re-exported modules
    pub exports: Vec<ExportEntry>,
    /// Externally facing entry points
    pub entry_points: Vec<ProviderEntry>,
    /// Exports are visible to every module without an import
    pub global: bool,
}

impl DynamicModuleDescriptor {
    /// Start declaring the descriptor a dynamic factory returns
    pub fn builder(module: impl Into<ModuleId>) -> ModuleBuilder {
        ModuleBuilder::new(module)
    }

    /// Convert into the static descriptor shape
    pub fn into_descriptor(self) -> ModuleDescriptor {
        ModuleDescriptor {
            id: self.module,
            imports: self.imports,
            providers: self.providers,
            exports: self.exports,
            entry_points: self.entry_points,
            global: self.global,
        }
    }
}

/// Builder shared by static and dynamic module declarations
///
/// ## Example
///
/// ```rust
/// use modwire_domain::value_objects::{ModuleDescriptor, ProviderEntry};
///
/// let cats = ModuleDescriptor::builder("cats")
///     .import("database")
///     .provider(ProviderEntry::value("CATS_TABLE", "cats".to_string()))
///     .export("CATS_TABLE")
///     .build();
///
/// assert!(cats.provides(&"CATS_TABLE".into()));
/// ```
#[derive(Debug, Clone)]
pub struct ModuleBuilder {
    id: ModuleId,
    imports: Vec<ModuleImport>,
    providers: Vec<ProviderEntry>,
    exports: Vec<ExportEntry>,
    entry_points: Vec<ProviderEntry>,
    global: bool,
}

impl ModuleBuilder {
    /// Create a builder for `id`
    pub fn new(id: impl Into<ModuleId>) -> Self {
        Self {
            id: id.into(),
            imports: Vec::new(),
            providers: Vec::new(),
            exports: Vec::new(),
            entry_points: Vec::new(),
            global: false,
        }
    }

    /// Import a module
    pub fn import(mut self, module: impl Into<ModuleId>) -> Self {
        self.imports.push(ModuleImport {
            module: module.into(),
            deferred: false,
        });
        self
    }

    /// Import a module through a deferred reference
    pub fn import_deferred(mut self, module: impl Into<ModuleId>) -> Self {
        self.imports.push(ModuleImport {
            module: module.into(),
            deferred: true,
        });
        self
    }

    /// Offer a provider
    pub fn provider(mut self, provider: ProviderEntry) -> Self {
        self.providers.push(provider);
        self
    }

    /// Offer several providers
    pub fn providers(mut self, providers: impl IntoIterator<Item = ProviderEntry>) -> Self {
        self.providers.extend(providers);
        self
    }

    /// Export a token
    pub fn export(mut self, token: impl Into<Token>) -> Self {
        self.exports.push(ExportEntry::Token(token.into()));
        self
    }

    /// Re-export an imported module
    pub fn export_module(mut self, module: impl Into<ModuleId>) -> Self {
        self.exports.push(ExportEntry::Module(module.into()));
        self
    }

    /// Declare an entry point
    pub fn entry_point(mut self, entry: ProviderEntry) -> Self {
        self.entry_points.push(entry);
        self
    }

    /// Make the module's exports visible everywhere
    pub fn global(mut self) -> Self {
        self.global = true;
        self
    }

    /// Finish a static declaration
    pub fn build(self) -> ModuleDescriptor {
        ModuleDescriptor {
            id: self.id,
            imports: self.imports,
            providers: self.providers,
            exports: self.exports,
            entry_points: self.entry_points,
            global: self.global,
        }
    }

    /// Finish a dynamic declaration
    pub fn build_dynamic(self) -> DynamicModuleDescriptor {
        DynamicModuleDescriptor {
            module: self.id,
            imports: self.imports,
            providers: self.providers,
            exports: self.exports,
            entry_points: self.entry_points,
            global: self.global,
        }
    }
}

/// Structural projection of a descriptor (identities and tokens only)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleShape {
    /// Module identity
    pub id: ModuleId,
    /// Imports
    pub imports: Vec<ModuleImport>,
    /// Provider tokens
    pub providers: Vec<Token>,
    /// Export entries
    pub exports: Vec<ExportEntry>,
    /// Entry point tokens
    pub entry_points: Vec<Token>,
    /// Global flag
    pub global: bool,
}
