//! # modwire Domain Layer
//!
//! Core types for module composition and dependency injection:
//!
//! - [`value_objects`]: tokens, module and provider descriptors, configuration objects
//! - [`ports`]: interfaces implemented by the application layer
//! - [`error`]: the crate-wide error type
//!
//! This crate has no knowledge of how modules are resolved or instances
//! are cached; see `modwire-application` for that.

pub mod constants;
pub mod error;
pub mod ports;
pub mod value_objects;

pub use error::{CycleKind, Error, Result};
pub use value_objects::*;
