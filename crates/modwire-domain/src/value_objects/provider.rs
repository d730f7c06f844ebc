//! Provider Entries
//!
//! A provider binds a [`Token`] to a construction strategy and the tokens
//! that strategy depends on.

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

use super::dependencies::Dependencies;
use super::token::Token;
use crate::error::{Error, Result};

/// Type-erased provider instance
pub type Instance = Arc<dyn Any + Send + Sync>;

/// Synchronous constructor over resolved dependencies
pub type ConstructFn = Arc<dyn Fn(&Dependencies) -> Result<Instance> + Send + Sync>;

/// Asynchronous factory over resolved dependencies
pub type FactoryFn =
    Arc<dyn Fn(Dependencies) -> BoxFuture<'static, Result<Instance>> + Send + Sync>;

/// Hook invoked with the cached instance when the container shuts down
pub type ShutdownHook = Arc<dyn Fn(Instance) -> BoxFuture<'static, Result<()>> + Send + Sync>;

/// Downcast a type-erased instance to `T`
pub fn downcast_instance<T: Send + Sync + 'static>(
    token: &Token,
    instance: Instance,
) -> Result<Arc<T>> {
    instance
        .downcast::<T>()
        .map_err(|_| Error::type_mismatch::<T>(token))
}

/// How a provider produces its instance
#[derive(Clone)]
pub enum ProviderStrategy {
    /// Synchronous constructor (the "class" strategy)
    Class {
        /// Name of the constructed type
        type_name: &'static str,
        /// Constructor
        construct: ConstructFn,
    },
    /// Pre-built instance
    Value(Instance),
    /// Asynchronous factory
    Factory(FactoryFn),
    /// Alias of another visible token
    Existing(Token),
}

impl ProviderStrategy {
    /// Short name of the strategy for diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Class { .. } => "class",
            Self::Value(_) => "value",
            Self::Factory(_) => "factory",
            Self::Existing(_) => "existing",
        }
    }
}

impl fmt::Debug for ProviderStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Class { type_name, .. } => f.debug_tuple("Class").field(type_name).finish(),
            Self::Value(_) => f.write_str("Value"),
            Self::Factory(_) => f.write_str("Factory"),
            Self::Existing(target) => f.debug_tuple("Existing").field(target).finish(),
        }
    }
}

/// A declared dependency of a provider
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Dependency {
    /// Requested token
    pub token: Token,
    /// Missing optional dependencies are left out instead of failing
    pub optional: bool,
    /// Injected as a lazy handle instead of a constructed instance
    pub deferred: bool,
}

impl Dependency {
    /// A dependency that must resolve
    pub fn required(token: impl Into<Token>) -> Self {
        Self {
            token: token.into(),
            optional: false,
            deferred: false,
        }
    }

    /// A dependency that may be absent
    pub fn optional(token: impl Into<Token>) -> Self {
        Self {
            optional: true,
            ..Self::required(token)
        }
    }

    /// A dependency injected as a deferred reference
    pub fn deferred(token: impl Into<Token>) -> Self {
        Self {
            deferred: true,
            ..Self::required(token)
        }
    }
}

/// Instance lifetime within a module scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lifetime {
    /// One cached instance per (module scope, token)
    #[default]
    Singleton,
    /// A new instance for every request
    Transient,
}

/// Provider declaration
///
/// ## Example
///
/// ```rust
/// use modwire_domain::value_objects::{ProviderEntry, Token};
///
/// struct Greeter {
///     greeting: String,
/// }
///
/// let greeting = ProviderEntry::value("GREETING", "hello".to_string());
/// let greeter = ProviderEntry::class(Token::of::<Greeter>(), |deps| {
///     let greeting = deps.get::<String>("GREETING")?;
///     Ok(Greeter { greeting: greeting.to_string() })
/// })
/// .inject("GREETING");
///
/// assert_eq!(greeting.strategy.kind(), "value");
/// assert_eq!(greeter.dependencies.len(), 1);
/// ```
#[derive(Clone)]
pub struct ProviderEntry {
    /// Token the provider is bound to
    pub token: Token,
    /// Construction strategy
    pub strategy: ProviderStrategy,
    /// Declared dependencies, in injection order
    pub dependencies: Vec<Dependency>,
    /// Instance lifetime
    pub lifetime: Lifetime,
    /// Optional hook run on container shutdown
    pub on_shutdown: Option<ShutdownHook>,
}

impl ProviderEntry {
    /// Create an entry from a raw strategy
    pub fn with_strategy(token: impl Into<Token>, strategy: ProviderStrategy) -> Self {
        Self {
            token: token.into(),
            strategy,
            dependencies: Vec::new(),
            lifetime: Lifetime::Singleton,
            on_shutdown: None,
        }
    }

    /// Provider built by a synchronous constructor
    pub fn class<T, F>(token: impl Into<Token>, construct: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(&Dependencies) -> Result<T> + Send + Sync + 'static,
    {
        let construct: ConstructFn =
            Arc::new(move |deps: &Dependencies| Ok(Arc::new(construct(deps)?) as Instance));
        Self::with_strategy(
            token,
            ProviderStrategy::Class {
                type_name: std::any::type_name::<T>(),
                construct,
            },
        )
    }

    /// Provider bound to an existing value
    pub fn value<T: Send + Sync + 'static>(token: impl Into<Token>, value: T) -> Self {
        Self::with_strategy(token, ProviderStrategy::Value(Arc::new(value)))
    }

    /// Provider bound to an already shared value
    pub fn shared<T: Send + Sync + 'static>(token: impl Into<Token>, value: Arc<T>) -> Self {
        Self::with_strategy(token, ProviderStrategy::Value(value))
    }

    /// Provider built by an asynchronous factory
    pub fn factory<T, F, Fut>(token: impl Into<Token>, factory: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(Dependencies) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let factory: FactoryFn = Arc::new(move |deps: Dependencies| {
            let pending = factory(deps);
            async move { Ok(Arc::new(pending.await?) as Instance) }.boxed()
        });
        Self::with_strategy(token, ProviderStrategy::Factory(factory))
    }

    /// Provider aliasing another token; resolves to the aliased instance
    pub fn existing(token: impl Into<Token>, target: impl Into<Token>) -> Self {
        let target = target.into();
        let mut entry = Self::with_strategy(token, ProviderStrategy::Existing(target.clone()));
        entry.dependencies.push(Dependency::required(target));
        entry
    }

    /// Declare a required dependency
    pub fn inject(mut self, token: impl Into<Token>) -> Self {
        self.dependencies.push(Dependency::required(token));
        self
    }

    /// Declare an optional dependency
    pub fn inject_optional(mut self, token: impl Into<Token>) -> Self {
        self.dependencies.push(Dependency::optional(token));
        self
    }

    /// Declare a deferred dependency
    pub fn inject_deferred(mut self, token: impl Into<Token>) -> Self {
        self.dependencies.push(Dependency::deferred(token));
        self
    }

    /// Construct a new instance on every request
    pub fn transient(mut self) -> Self {
        self.lifetime = Lifetime::Transient;
        self
    }

    /// Register a hook run with the cached instance on shutdown
    pub fn on_shutdown<T, F, Fut>(mut self, hook: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(Arc<T>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let token = self.token.clone();
        let hook: ShutdownHook = Arc::new(move |instance: Instance| {
            match downcast_instance::<T>(&token, instance) {
                Ok(typed) => hook(typed).boxed(),
                Err(e) => async move { Err(e) }.boxed(),
            }
        });
        self.on_shutdown = Some(hook);
        self
    }

    /// Tokens this provider depends on
    pub fn dependency_tokens(&self) -> impl Iterator<Item = &Token> {
        self.dependencies.iter().map(|dependency| &dependency.token)
    }
}

impl fmt::Debug for ProviderEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderEntry")
            .field("token", &self.token)
            .field("strategy", &self.strategy)
            .field("dependencies", &self.dependencies)
            .field("lifetime", &self.lifetime)
            .field("on_shutdown", &self.on_shutdown.is_some())
            .finish()
    }
}
