//! Application Bootstrap - Composition Root
//!
//! Drives module registration, dynamic module resolution, graph validation
//! and container startup, and hands back the serving [`AppContext`].
//!
//! ```text
//! AppConfig + modules ─► Resolve ─► Freeze ─► Serve ─► AppContext
//!                           ↑          │
//!                        linkme     DependencyGraph
//!                        catalog    + ProviderContainer
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! let context = ApplicationBuilder::new(config, app_module())
//!     .module(database_module())
//!     .dynamic_module("config", config_module, ConfigurationObject::new(options))
//!     .build()
//!     .await?;
//!
//! let service = context.resolve::<CatsService>(Token::of::<CatsService>()).await?;
//! context.close().await?;
//! ```

use std::sync::Arc;

use modwire_application::container::{EntryPoint, ProviderContainer};
use modwire_application::graph::DependencyGraph;
use modwire_application::registry::{ModuleRegistry, resolve_registered_module};
use modwire_domain::error::{Error, Result};
use modwire_domain::ports::DynamicModuleFactory;
use modwire_domain::value_objects::{
    ConfigurationObject, Instance, ModuleDescriptor, ModuleId, Token, downcast_instance,
};
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::di::lifecycle::{LifecyclePhase, PhaseTracker};

/// A module declared during `Init`, resolved during `Resolve`
enum PendingModule {
    Static(ModuleDescriptor),
    Dynamic {
        identity: ModuleId,
        factory: Box<dyn DynamicModuleFactory>,
        config: ConfigurationObject,
    },
    Cataloged {
        identity: String,
        config: ConfigurationObject,
    },
}

impl PendingModule {
    fn identity(&self) -> &str {
        match self {
            Self::Static(descriptor) => descriptor.id.as_str(),
            Self::Dynamic { identity, .. } => identity.as_str(),
            Self::Cataloged { identity, .. } => identity,
        }
    }

    fn register(self, registry: &mut ModuleRegistry) -> Result<()> {
        match self {
            Self::Static(descriptor) => registry.register(descriptor),
            Self::Dynamic {
                identity,
                factory,
                config,
            } => registry
                .register_dynamic(identity, factory.as_ref(), config)
                .map(|_| ()),
            Self::Cataloged { identity, config } => {
                registry.register(resolve_registered_module(&identity, config)?)
            }
        }
    }
}

/// Builder collecting module declarations for one application
pub struct ApplicationBuilder {
    config: AppConfig,
    root: ModuleId,
    pending: Vec<PendingModule>,
}

impl ApplicationBuilder {
    /// Start an application rooted at `root`
    pub fn new(config: AppConfig, root: ModuleDescriptor) -> Self {
        Self {
            config,
            root: root.id.clone(),
            pending: vec![PendingModule::Static(root)],
        }
    }

    /// Declare a static module
    pub fn module(mut self, descriptor: ModuleDescriptor) -> Self {
        self.pending.push(PendingModule::Static(descriptor));
        self
    }

    /// Declare a dynamic module resolved by `factory` with `config`
    pub fn dynamic_module<F>(
        mut self,
        identity: impl Into<ModuleId>,
        factory: F,
        config: ConfigurationObject,
    ) -> Self
    where
        F: DynamicModuleFactory + 'static,
    {
        self.pending.push(PendingModule::Dynamic {
            identity: identity.into(),
            factory: Box::new(factory),
            config,
        });
        self
    }

    /// Declare a cataloged dynamic module, configured from `modules.<identity>`
    pub fn registered_module(mut self, identity: impl Into<String>) -> Self {
        let identity = identity.into();
        let config = self.config.module_config(&identity);
        self.pending
            .push(PendingModule::Cataloged { identity, config });
        self
    }

    /// Declare every module configured under `modules` that is not declared yet
    pub fn with_configured_modules(mut self) -> Self {
        let configured: Vec<String> = self
            .config
            .modules
            .keys()
            .filter(|name| !self.pending.iter().any(|p| p.identity() == name.as_str()))
            .cloned()
            .collect();
        for identity in configured {
            self = self.registered_module(identity);
        }
        self
    }

    /// Resolve, validate and start the application
    pub async fn build(self) -> Result<AppContext> {
        let lifecycle = PhaseTracker::new();

        lifecycle.advance(LifecyclePhase::Resolve)?;
        info!(root = %self.root, modules = self.pending.len(), "Resolving modules");
        let mut registry = ModuleRegistry::new();
        for pending in self.pending {
            pending.register(&mut registry)?;
        }

        lifecycle.advance(LifecyclePhase::Freeze)?;
        let graph =
            DependencyGraph::build(registry.freeze(), self.config.container.conflict_policy)?;
        let container = ProviderContainer::new(Arc::new(graph), self.root)?;

        let entry_points = match start(&container, self.config.container.eager).await {
            Ok(entry_points) => entry_points,
            Err(e) => {
                if let Err(shutdown) = container.shutdown().await {
                    warn!(error = %shutdown, "Shutdown after failed startup reported an error");
                }
                lifecycle.advance(LifecyclePhase::Closed)?;
                return Err(e);
            }
        };

        lifecycle.advance(LifecyclePhase::Serve)?;
        info!(
            root = %container.root(),
            entry_points = entry_points.len(),
            "Application serving"
        );

        Ok(AppContext {
            config: Arc::new(self.config),
            container,
            entry_points,
            lifecycle,
        })
    }
}

async fn start(container: &ProviderContainer, eager: bool) -> Result<Vec<EntryPoint>> {
    if eager {
        container.instantiate_all().await?;
    }
    container.construct_entry_points().await
}

impl std::fmt::Debug for ApplicationBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApplicationBuilder")
            .field("root", &self.root)
            .field(
                "modules",
                &self.pending.iter().map(PendingModule::identity).collect::<Vec<_>>(),
            )
            .finish_non_exhaustive()
    }
}

/// Serving application: configuration, container and entry points
pub struct AppContext {
    config: Arc<AppConfig>,
    container: ProviderContainer,
    entry_points: Vec<EntryPoint>,
    lifecycle: PhaseTracker,
}

impl AppContext {
    /// Application configuration
    pub fn config(&self) -> Arc<AppConfig> {
        Arc::clone(&self.config)
    }

    /// Provider container
    pub fn container(&self) -> &ProviderContainer {
        &self.container
    }

    /// Validated module graph
    pub fn graph(&self) -> &DependencyGraph {
        self.container.graph()
    }

    /// Current lifecycle phase
    pub fn phase(&self) -> LifecyclePhase {
        self.lifecycle.current()
    }

    /// Resolve `token` in the root module's scope
    pub async fn get(&self, token: impl Into<Token>) -> Result<Instance> {
        self.lifecycle.require(LifecyclePhase::Serve)?;
        self.container.get(token).await
    }

    /// Resolve `token` in `module`'s scope
    pub async fn get_in(
        &self,
        module: impl Into<ModuleId>,
        token: impl Into<Token>,
    ) -> Result<Instance> {
        self.lifecycle.require(LifecyclePhase::Serve)?;
        self.container.get_in(module, token).await
    }

    /// Typed resolution in the root module's scope
    pub async fn resolve<T: Send + Sync + 'static>(
        &self,
        token: impl Into<Token>,
    ) -> Result<Arc<T>> {
        self.lifecycle.require(LifecyclePhase::Serve)?;
        self.container.resolve(token).await
    }

    /// Constructed entry points
    pub fn entry_points(&self) -> &[EntryPoint] {
        &self.entry_points
    }

    /// Typed access to a constructed entry point
    pub fn entry_point<T: Send + Sync + 'static>(&self, token: impl Into<Token>) -> Result<Arc<T>> {
        let token = token.into();
        let entry = self
            .entry_points
            .iter()
            .find(|entry| entry.token == token)
            .ok_or_else(|| Error::lifecycle(format!("no entry point named '{token}'")))?;
        downcast_instance(&token, Arc::clone(&entry.instance))
    }

    /// Shut the application down; later calls are no-ops
    pub async fn close(&self) -> Result<()> {
        if self.lifecycle.current() == LifecyclePhase::Closed {
            return Ok(());
        }
        self.lifecycle.advance(LifecyclePhase::Closed)?;
        self.container.shutdown().await
    }
}

impl std::fmt::Debug for AppContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppContext")
            .field("phase", &self.phase())
            .field("container", &self.container)
            .field("entry_points", &self.entry_points.len())
            .finish_non_exhaustive()
    }
}

/// Build an application from `config`, enabling every configured dynamic module
///
/// Creates:
/// - the root module and every cataloged module listed under `modules`
/// - the validated dependency graph
/// - the provider container, with entry points constructed
pub async fn init_app(config: AppConfig, root: ModuleDescriptor) -> Result<AppContext> {
    ApplicationBuilder::new(config, root)
        .with_configured_modules()
        .build()
        .await
}
