//! Error handling types

use std::fmt;

use thiserror::Error;

use crate::value_objects::{ModuleId, Token};

/// Result type alias for operations that can fail
pub type Result<T> = std::result::Result<T, Error>;

/// Graph in which a cycle was found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CycleKind {
    /// Module import cycle
    Import,
    /// Provider dependency cycle
    Dependency,
}

impl fmt::Display for CycleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Import => write!(f, "Import"),
            Self::Dependency => write!(f, "Dependency"),
        }
    }
}

/// Main error type for modwire
#[derive(Error, Debug)]
pub enum Error {
    /// A provider or entry point depends on a token no visible module offers
    #[error("Unresolvable token '{token}' requested in module '{module}'")]
    UnresolvableToken {
        /// Module in whose scope the token was requested
        module: ModuleId,
        /// The missing token
        token: Token,
    },

    /// A module exports something it neither provides nor imports
    #[error("Module '{module}' exports '{export}' which it neither provides nor imports")]
    ExportNotProvided {
        /// The exporting module
        module: ModuleId,
        /// Description of the offending export entry
        export: String,
    },

    /// A dynamic module factory returned a descriptor for another module
    #[error(
        "Configuration error: dynamic module factory for '{expected}' returned a descriptor for '{actual}'"
    )]
    IdentityMismatch {
        /// Identity the factory was invoked for
        expected: ModuleId,
        /// Identity carried by the returned descriptor
        actual: ModuleId,
    },

    /// Import or dependency cycle without deferred markers on every edge
    #[error("{kind} cycle detected: {}", .path.join(" -> "))]
    Cycle {
        /// Which graph the cycle belongs to
        kind: CycleKind,
        /// Full cycle path, closed on its first element
        path: Vec<String>,
    },

    /// An import references a module that was never registered
    #[error("Unknown module '{module}' imported by '{referenced_by}'")]
    UnknownModule {
        /// The missing module
        module: ModuleId,
        /// The module declaring the import
        referenced_by: ModuleId,
    },

    /// A module identity was registered twice
    #[error("Module '{module}' is already registered")]
    DuplicateModule {
        /// The duplicated identity
        module: ModuleId,
    },

    /// A module declares the same provider token twice
    #[error("Module '{module}' declares provider '{token}' more than once")]
    DuplicateProvider {
        /// The declaring module
        module: ModuleId,
        /// The duplicated token
        token: Token,
    },

    /// Several imports expose different providers for one token
    #[error("Token '{token}' is ambiguous in module '{module}': exported by {candidates:?}")]
    AmbiguousToken {
        /// Module in which the token is ambiguous
        module: ModuleId,
        /// The ambiguous token
        token: Token,
        /// Origin modules of the competing providers
        candidates: Vec<ModuleId>,
    },

    /// A resolved instance is not of the requested type
    #[error("Instance for '{token}' is not of type {expected}")]
    TypeMismatch {
        /// Token that was resolved
        token: Token,
        /// Requested type name
        expected: &'static str,
    },

    /// A provider constructor or factory failed
    #[error("Failed to construct provider '{token}': {message}")]
    Construction {
        /// Token of the provider under construction
        token: Token,
        /// Description of the failure
        message: String,
        /// Optional source error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Operation not allowed in the current lifecycle phase
    #[error("Lifecycle error: {message}")]
    Lifecycle {
        /// Description of the lifecycle violation
        message: String,
    },

    /// Configuration-related error
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of the configuration error
        message: String,
        /// Optional source error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// I/O operation error
    #[error("I/O error: {message}")]
    Io {
        /// Description of the I/O error
        message: String,
        /// Optional source error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// JSON parsing or serialization error
    #[error("JSON parsing error: {source}")]
    Json {
        /// The underlying JSON error
        #[from]
        source: serde_json::Error,
    },

    /// Internal invariant violation
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the internal error
        message: String,
    },
}

// Resolution error creation methods
impl Error {
    /// Create an unresolvable token error
    pub fn unresolvable(module: &ModuleId, token: &Token) -> Self {
        Self::UnresolvableToken {
            module: module.clone(),
            token: token.clone(),
        }
    }

    /// Create an export-not-provided error
    pub fn export_not_provided<S: Into<String>>(module: &ModuleId, export: S) -> Self {
        Self::ExportNotProvided {
            module: module.clone(),
            export: export.into(),
        }
    }

    /// Create a cycle error from any displayable path
    pub fn cycle<I, D>(kind: CycleKind, path: I) -> Self
    where
        I: IntoIterator<Item = D>,
        D: fmt::Display,
    {
        Self::Cycle {
            kind,
            path: path.into_iter().map(|node| node.to_string()).collect(),
        }
    }

    /// Create a type mismatch error for `T`
    pub fn type_mismatch<T: ?Sized>(token: &Token) -> Self {
        Self::TypeMismatch {
            token: token.clone(),
            expected: std::any::type_name::<T>(),
        }
    }

    /// Create a construction error
    pub fn construction<S: Into<String>>(token: &Token, message: S) -> Self {
        Self::Construction {
            token: token.clone(),
            message: message.into(),
            source: None,
        }
    }

    /// Create a construction error with source
    pub fn construction_with_source<S, E>(token: &Token, message: S, source: E) -> Self
    where
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Construction {
            token: token.clone(),
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a lifecycle error
    pub fn lifecycle<S: Into<String>>(message: S) -> Self {
        Self::Lifecycle {
            message: message.into(),
        }
    }

    /// Whether this error reports a cycle
    pub fn is_cycle(&self) -> bool {
        matches!(self, Self::Cycle { .. })
    }

    /// Cycle path, when this error reports a cycle
    pub fn cycle_path(&self) -> Option<&[String]> {
        match self {
            Self::Cycle { path, .. } => Some(path),
            _ => None,
        }
    }
}

// Configuration error creation methods
impl Error {
    /// Create a configuration error
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
            source: None,
        }
    }

    /// Create a configuration error with source
    pub fn configuration_with_source<
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    >(
        message: S,
        source: E,
    ) -> Self {
        Self::Configuration {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

// I/O and internal error creation methods
impl Error {
    /// Create an I/O error
    pub fn io<S: Into<String>>(message: S) -> Self {
        Self::Io {
            message: message.into(),
            source: None,
        }
    }

    /// Create an I/O error with source
    pub fn io_with_source<S: Into<String>, E: std::error::Error + Send + Sync + 'static>(
        message: S,
        source: E,
    ) -> Self {
        Self::Io {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(source: std::io::Error) -> Self {
        Self::Io {
            message: source.to_string(),
            source: Some(Box::new(source)),
        }
    }
}
