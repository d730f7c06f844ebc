//! Configuration
//!
//! Layered application configuration loaded with Figment:
//! defaults, then a TOML file, then `MODWIRE_` environment variables.

pub mod loader;
pub mod types;

pub use loader::ConfigLoader;
pub use types::{AppConfig, ContainerConfig, LoggingConfig};
