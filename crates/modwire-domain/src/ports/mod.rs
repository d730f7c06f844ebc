//! Domain Ports
//!
//! Interfaces the application layer implements.
//!
//! | Port | Description |
//! |------|-------------|
//! | [`DynamicModuleFactory`] | Produces a module's metadata from runtime configuration |
//! | [`InstanceResolver`] | Resolves a token to an instance inside a module scope |

/// Dynamic module factory port
pub mod dynamic;
/// Instance resolution port
pub mod resolution;

pub use dynamic::DynamicModuleFactory;
pub use resolution::InstanceResolver;
