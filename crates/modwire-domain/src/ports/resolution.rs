//! Instance Resolution Port

use async_trait::async_trait;

use crate::error::Result;
use crate::value_objects::{Instance, ModuleId, Token};

/// Resolves tokens to instances within a module scope
///
/// Implemented by the provider container; deferred references resolve
/// through this port so the domain layer stays free of container details.
#[async_trait]
pub trait InstanceResolver: Send + Sync {
    /// Resolve `token` as seen from `module`
    async fn resolve(&self, module: &ModuleId, token: &Token) -> Result<Instance>;
}
