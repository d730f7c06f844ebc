//! Domain layer constants

/// Separator between module and token in dependency-cycle paths
pub const SCOPE_SEPARATOR: &str = "::";
