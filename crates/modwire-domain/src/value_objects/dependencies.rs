//! Resolved dependencies handed to provider constructors

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};

use super::module::ModuleId;
use super::provider::{Instance, downcast_instance};
use super::token::Token;
use crate::error::{Error, Result};
use crate::ports::InstanceResolver;

/// Lazy handle to a provider injected through a deferred dependency
///
/// Holds a weak reference to the container, so the handle never keeps the
/// container alive. Resolution happens in the scope of the module that
/// declared the dependency.
#[derive(Clone)]
pub struct DeferredRef {
    module: ModuleId,
    token: Token,
    resolver: Weak<dyn InstanceResolver>,
}

impl DeferredRef {
    /// Create a deferred handle
    pub fn new(module: ModuleId, token: Token, resolver: Weak<dyn InstanceResolver>) -> Self {
        Self {
            module,
            token,
            resolver,
        }
    }

    /// Token this handle resolves
    pub fn token(&self) -> &Token {
        &self.token
    }

    /// Module scope the token is resolved in
    pub fn module(&self) -> &ModuleId {
        &self.module
    }

    /// Resolve the referenced instance
    pub async fn get<T: Send + Sync + 'static>(&self) -> Result<Arc<T>> {
        let resolver = self.resolver.upgrade().ok_or_else(|| {
            Error::lifecycle(format!(
                "container dropped before deferred '{}' was resolved",
                self.token
            ))
        })?;
        let instance = resolver.resolve(&self.module, &self.token).await?;
        downcast_instance(&self.token, instance)
    }
}

impl fmt::Debug for DeferredRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeferredRef")
            .field("module", &self.module)
            .field("token", &self.token)
            .finish_non_exhaustive()
    }
}

/// Dependencies resolved for one provider construction
#[derive(Clone, Default)]
pub struct Dependencies {
    resolved: HashMap<Token, Instance>,
    deferred: HashMap<Token, DeferredRef>,
}

impl Dependencies {
    /// Create an empty dependency set
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a resolved instance
    pub fn insert(&mut self, token: Token, instance: Instance) {
        self.resolved.insert(token, instance);
    }

    /// Add a deferred handle
    pub fn insert_deferred(&mut self, deferred: DeferredRef) {
        self.deferred.insert(deferred.token().clone(), deferred);
    }

    /// Typed access to a resolved dependency
    pub fn get<T: Send + Sync + 'static>(&self, token: impl Into<Token>) -> Result<Arc<T>> {
        let token = token.into();
        let instance = self.resolved.get(&token).cloned().ok_or_else(|| {
            Error::construction(&token, "dependency was not declared or did not resolve")
        })?;
        downcast_instance(&token, instance)
    }

    /// Typed access to an optional dependency
    pub fn get_optional<T: Send + Sync + 'static>(
        &self,
        token: impl Into<Token>,
    ) -> Result<Option<Arc<T>>> {
        let token = token.into();
        match self.resolved.get(&token) {
            Some(instance) => downcast_instance(&token, instance.clone()).map(Some),
            None => Ok(None),
        }
    }

    /// Deferred handle for a dependency declared as deferred
    pub fn deferred(&self, token: impl Into<Token>) -> Result<DeferredRef> {
        let token = token.into();
        self.deferred
            .get(&token)
            .cloned()
            .ok_or_else(|| Error::construction(&token, "dependency was not declared as deferred"))
    }

    /// Untyped access to a resolved dependency
    pub fn instance(&self, token: &Token) -> Option<&Instance> {
        self.resolved.get(token)
    }

    /// Whether a dependency resolved to an instance
    pub fn contains(&self, token: &Token) -> bool {
        self.resolved.contains_key(token)
    }

    /// Number of resolved instances
    pub fn len(&self) -> usize {
        self.resolved.len()
    }

    /// Whether no instance was resolved
    pub fn is_empty(&self) -> bool {
        self.resolved.is_empty()
    }
}

impl fmt::Debug for Dependencies {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dependencies")
            .field("resolved", &self.resolved.keys().collect::<Vec<_>>())
            .field("deferred", &self.deferred.keys().collect::<Vec<_>>())
            .finish()
    }
}
