//! Provider Container
//!
//! Lazily constructs provider instances on first request and caches
//! singletons per (origin module, token).
//!
//! ```text
//! get_in(module, token)
//!        │ graph.resolve_token
//!        ▼
//! ProviderKey(origin, token) ──► OnceCell ──► construct
//!                                                │ dependencies, depth-first
//!                                                ▼
//!                                  get_in(origin, dependency) ...
//! ```
//!
//! Concurrent requests for the same singleton wait on that singleton's
//! cell only. A failed construction leaves the cell empty, so the next
//! request retries it.
//!
//! Deferred dependencies are injected as [`DeferredRef`] handles backed by a
//! weak reference to the container. The construction path travels with the
//! task, so dereferencing a handle that would close a cycle during
//! construction reports a dependency cycle instead of waiting forever.
//!
//! Tasks register every singleton they are about to wait on in a shared
//! wait graph. A wait that would close a loop across tasks fails with a
//! dependency cycle before it blocks.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use async_trait::async_trait;
use dashmap::DashMap;
use futures::FutureExt;
use futures::future::BoxFuture;
use modwire_domain::error::{CycleKind, Error, Result};
use modwire_domain::ports::InstanceResolver;
use modwire_domain::value_objects::{
    DeferredRef, Dependencies, Dependency, Instance, Lifetime, ModuleId, ProviderEntry,
    ProviderStrategy, Token, downcast_instance,
};
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::graph::{DependencyGraph, ProviderKey};

tokio::task_local! {
    static CONSTRUCTION_PATH: Vec<ProviderKey>;
}

/// A constructed entry point
#[derive(Clone)]
pub struct EntryPoint {
    /// Declaring module
    pub module: ModuleId,
    /// Entry point token
    pub token: Token,
    /// Constructed instance
    pub instance: Instance,
}

impl std::fmt::Debug for EntryPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntryPoint")
            .field("module", &self.module)
            .field("token", &self.token)
            .finish_non_exhaustive()
    }
}

/// Explicitly owned provider container
///
/// Cloning is cheap; clones share the same singleton cache.
#[derive(Clone)]
pub struct ProviderContainer {
    inner: Arc<ContainerInner>,
}

struct ContainerInner {
    graph: Arc<DependencyGraph>,
    root: ModuleId,
    singletons: DashMap<ProviderKey, Arc<OnceCell<Instance>>>,
    constructed: Mutex<Vec<ProviderKey>>,
    /// Singletons each in-progress construction is waiting on
    waiting: Mutex<HashMap<ProviderKey, Vec<ProviderKey>>>,
    closed: AtomicBool,
    this: Weak<ContainerInner>,
}

impl ProviderContainer {
    /// Create a container serving `graph`, with `root` as the default scope
    pub fn new(graph: Arc<DependencyGraph>, root: impl Into<ModuleId>) -> Result<Self> {
        let root = root.into();
        if graph.module(&root).is_none() {
            return Err(Error::configuration(format!(
                "Root module '{root}' is not registered"
            )));
        }

        let inner = Arc::new_cyclic(|this| ContainerInner {
            graph,
            root,
            singletons: DashMap::new(),
            constructed: Mutex::new(Vec::new()),
            waiting: Mutex::new(HashMap::new()),
            closed: AtomicBool::new(false),
            this: this.clone(),
        });
        Ok(Self { inner })
    }

    /// Root module scope
    pub fn root(&self) -> &ModuleId {
        &self.inner.root
    }

    /// Graph the container serves
    pub fn graph(&self) -> &Arc<DependencyGraph> {
        &self.inner.graph
    }

    /// Resolve `token` in the root module's scope
    pub async fn get(&self, token: impl Into<Token>) -> Result<Instance> {
        let root = self.inner.root.clone();
        self.get_in(root, token).await
    }

    /// Resolve `token` in `module`'s scope
    pub async fn get_in(
        &self,
        module: impl Into<ModuleId>,
        token: impl Into<Token>,
    ) -> Result<Instance> {
        self.inner.ensure_open()?;
        self.inner
            .resolve_scoped(module.into(), token.into(), Vec::new())
            .await
    }

    /// Typed resolution in the root module's scope
    pub async fn resolve<T: Send + Sync + 'static>(
        &self,
        token: impl Into<Token>,
    ) -> Result<Arc<T>> {
        let token = token.into();
        let instance = self.get(token.clone()).await?;
        downcast_instance(&token, instance)
    }

    /// Typed resolution in `module`'s scope
    pub async fn resolve_in<T: Send + Sync + 'static>(
        &self,
        module: impl Into<ModuleId>,
        token: impl Into<Token>,
    ) -> Result<Arc<T>> {
        let token = token.into();
        let instance = self.get_in(module, token.clone()).await?;
        downcast_instance(&token, instance)
    }

    /// Already constructed singleton for `token` in `module`'s scope
    pub fn cached(&self, module: impl Into<ModuleId>, token: impl Into<Token>) -> Option<Instance> {
        let token = token.into();
        let origin = self.inner.graph.resolve_token(&module.into(), &token).ok()?;
        self.inner
            .singletons
            .get(&ProviderKey::new(origin, token))
            .and_then(|cell| cell.get().cloned())
    }

    /// Construct every singleton in initialization order
    ///
    /// # Returns
    /// Number of singletons constructed or already cached
    pub async fn instantiate_all(&self) -> Result<usize> {
        self.inner.ensure_open()?;
        let mut count = 0;
        for key in self.inner.graph.initialization_order() {
            let singleton = self
                .inner
                .graph
                .provider(key)
                .is_some_and(|provider| provider.lifetime == Lifetime::Singleton);
            if singleton {
                self.inner.instantiate(key.clone(), Vec::new()).await?;
                count += 1;
            }
        }
        info!(singletons = count, "Eager instantiation complete");
        Ok(count)
    }

    /// Construct every declared entry point, in module registration order
    ///
    /// Entry points are built in their declaring module's scope and are
    /// never cached or injectable.
    pub async fn construct_entry_points(&self) -> Result<Vec<EntryPoint>> {
        self.inner.ensure_open()?;
        let mut built = Vec::new();
        for descriptor in self.inner.graph.registry().iter() {
            for entry in &descriptor.entry_points {
                let key = ProviderKey::new(&descriptor.id, &entry.token);
                let instance = self.inner.construct(&key, entry, Vec::new()).await?;
                debug!(entry_point = %key, "Entry point constructed");
                built.push(EntryPoint {
                    module: descriptor.id.clone(),
                    token: entry.token.clone(),
                    instance,
                });
            }
        }
        Ok(built)
    }

    /// Singletons in the order they finished construction
    pub fn constructed(&self) -> Vec<ProviderKey> {
        self.inner.construction_log().clone()
    }

    /// Whether [`shutdown`](Self::shutdown) has run
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// Run shutdown hooks in reverse construction order and close the container
    ///
    /// Every hook runs even if an earlier one fails; the first failure is
    /// returned. Calling this twice is a no-op.
    pub async fn shutdown(&self) -> Result<()> {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let constructed = std::mem::take(&mut *self.inner.construction_log());
        let mut first_error = None;
        let mut hooks = 0;
        for key in constructed.iter().rev() {
            let Some(hook) = self
                .inner
                .graph
                .provider(key)
                .and_then(|provider| provider.on_shutdown.clone())
            else {
                continue;
            };
            let Some(instance) = self
                .inner
                .singletons
                .get(key)
                .and_then(|cell| cell.get().cloned())
            else {
                continue;
            };

            hooks += 1;
            if let Err(e) = hook(instance).await {
                warn!(provider = %key, error = %e, "Shutdown hook failed");
                first_error.get_or_insert(e);
            }
        }
        self.inner.singletons.clear();

        info!(
            providers = constructed.len(),
            hooks,
            failed = first_error.is_some(),
            "Provider container shut down"
        );
        first_error.map_or(Ok(()), Err)
    }
}

impl std::fmt::Debug for ProviderContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderContainer")
            .field("root", &self.inner.root)
            .field("singletons", &self.inner.singletons.len())
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl ContainerInner {
    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(Error::lifecycle("provider container is shut down"));
        }
        Ok(())
    }

    fn construction_log(&self) -> MutexGuard<'_, Vec<ProviderKey>> {
        self.constructed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn wait_graph(&self) -> MutexGuard<'_, HashMap<ProviderKey, Vec<ProviderKey>>> {
        self.waiting.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record that every construction on `path` waits on `target`
    ///
    /// Fails if `target` already waits, directly or through other tasks, on
    /// a key in `path`.
    fn enter_wait(&self, path: &[ProviderKey], target: &ProviderKey) -> Result<WaitGuard<'_>> {
        let waiters = path.to_vec();
        if !waiters.is_empty() {
            let mut waiting = self.wait_graph();
            if let Some(chain) = wait_chain(&waiting, target, path) {
                let closing = chain.last().and_then(|last| path.iter().position(|k| k == last));
                let cycle = path[closing.unwrap_or(0)..]
                    .iter()
                    .chain(&chain);
                return Err(Error::cycle(CycleKind::Dependency, cycle));
            }
            for waiter in &waiters {
                waiting.entry(waiter.clone()).or_default().push(target.clone());
            }
        }
        Ok(WaitGuard {
            inner: self,
            waiters,
            target: target.clone(),
        })
    }

    fn resolve_scoped(
        &self,
        module: ModuleId,
        token: Token,
        path: Vec<ProviderKey>,
    ) -> BoxFuture<'_, Result<Instance>> {
        async move {
            let origin = self.graph.resolve_token(&module, &token)?;
            self.instantiate(ProviderKey::new(origin, token), path).await
        }
        .boxed()
    }

    fn instantiate(
        &self,
        key: ProviderKey,
        path: Vec<ProviderKey>,
    ) -> BoxFuture<'_, Result<Instance>> {
        async move {
            if let Some(start) = path.iter().position(|node| node == &key) {
                let mut cycle: Vec<String> =
                    path[start..].iter().map(ToString::to_string).collect();
                cycle.push(key.to_string());
                return Err(Error::cycle(CycleKind::Dependency, cycle));
            }

            let provider = self.graph.provider(&key).ok_or_else(|| {
                Error::internal(format!("no provider registered for '{key}'"))
            })?;

            match provider.lifetime {
                Lifetime::Transient => self.construct(&key, provider, path).await,
                Lifetime::Singleton => {
                    let cell = self.singletons.entry(key.clone()).or_default().clone();
                    if let Some(instance) = cell.get() {
                        return Ok(instance.clone());
                    }
                    let _wait = self.enter_wait(&path, &key)?;
                    let instance = cell
                        .get_or_try_init(|| async move {
                            let instance = self.construct(&key, provider, path).await?;
                            self.construction_log().push(key.clone());
                            Ok::<_, Error>(instance)
                        })
                        .await?;
                    Ok(instance.clone())
                }
            }
        }
        .boxed()
    }

    async fn construct(
        &self,
        key: &ProviderKey,
        provider: &ProviderEntry,
        mut path: Vec<ProviderKey>,
    ) -> Result<Instance> {
        path.push(key.clone());
        let dependencies = self
            .resolve_dependencies(&key.module, &provider.dependencies, &path)
            .await?;

        debug!(provider = %key, strategy = provider.strategy.kind(), "Constructing provider");
        match &provider.strategy {
            ProviderStrategy::Class { construct, .. } => construct(&dependencies),
            ProviderStrategy::Value(instance) => Ok(instance.clone()),
            ProviderStrategy::Factory(factory) => {
                CONSTRUCTION_PATH.scope(path, factory(dependencies)).await
            }
            ProviderStrategy::Existing(target) => dependencies
                .instance(target)
                .cloned()
                .ok_or_else(|| Error::unresolvable(&key.module, target)),
        }
    }

    async fn resolve_dependencies(
        &self,
        module: &ModuleId,
        declared: &[Dependency],
        path: &[ProviderKey],
    ) -> Result<Dependencies> {
        let mut dependencies = Dependencies::new();
        for dependency in declared {
            let origin = match self.graph.resolve_token(module, &dependency.token) {
                Ok(origin) => origin,
                Err(Error::UnresolvableToken { .. }) if dependency.optional => {
                    debug!(
                        module = %module,
                        token = %dependency.token,
                        "Optional dependency absent"
                    );
                    continue;
                }
                Err(e) => return Err(e),
            };

            if dependency.deferred {
                let resolver: Weak<dyn InstanceResolver> = self.this.clone();
                dependencies.insert_deferred(DeferredRef::new(
                    module.clone(),
                    dependency.token.clone(),
                    resolver,
                ));
                continue;
            }

            let instance = self
                .instantiate(ProviderKey::new(origin, &dependency.token), path.to_vec())
                .await?;
            dependencies.insert(dependency.token.clone(), instance);
        }
        Ok(dependencies)
    }
}

#[async_trait]
impl InstanceResolver for ContainerInner {
    async fn resolve(&self, module: &ModuleId, token: &Token) -> Result<Instance> {
        self.ensure_open()?;
        let path = CONSTRUCTION_PATH
            .try_with(Clone::clone)
            .unwrap_or_default();
        self.resolve_scoped(module.clone(), token.clone(), path).await
    }
}

/// Wait chain from `from` to the first key in `path`, following the wait graph
fn wait_chain(
    waiting: &HashMap<ProviderKey, Vec<ProviderKey>>,
    from: &ProviderKey,
    path: &[ProviderKey],
) -> Option<Vec<ProviderKey>> {
    let mut seen = HashSet::new();
    let mut stack = vec![vec![from.clone()]];
    while let Some(chain) = stack.pop() {
        let Some(node) = chain.last() else {
            continue;
        };
        if path.contains(node) {
            return Some(chain);
        }
        if !seen.insert(node.clone()) {
            continue;
        }
        for next in waiting.get(node).into_iter().flatten() {
            let mut longer = chain.clone();
            longer.push(next.clone());
            stack.push(longer);
        }
    }
    None
}

/// Removes one registered wait from the wait graph when dropped
struct WaitGuard<'a> {
    inner: &'a ContainerInner,
    waiters: Vec<ProviderKey>,
    target: ProviderKey,
}

impl Drop for WaitGuard<'_> {
    fn drop(&mut self) {
        if self.waiters.is_empty() {
            return;
        }
        let mut waiting = self.inner.wait_graph();
        for waiter in &self.waiters {
            let Some(targets) = waiting.get_mut(waiter) else {
                continue;
            };
            if let Some(index) = targets.iter().position(|t| t == &self.target) {
                targets.swap_remove(index);
            }
            if targets.is_empty() {
                waiting.remove(waiter);
            }
        }
    }
}
