//! Infrastructure layer constants
//!
//! Contains constants that are part of the infrastructure implementation.
//! Composition constants are defined in `modwire_domain::constants`.

// ============================================================================
// CONFIGURATION CONSTANTS
// ============================================================================

/// Default configuration file name
pub const DEFAULT_CONFIG_FILENAME: &str = "modwire.toml";

/// Default configuration directory name
pub const DEFAULT_CONFIG_DIR: &str = "modwire";

/// Environment variable prefix for configuration
pub const CONFIG_ENV_PREFIX: &str = "MODWIRE";

/// Separator between nested keys in environment variable names
pub const CONFIG_ENV_SEPARATOR: &str = "__";

// ============================================================================
// LOGGING CONSTANTS
// ============================================================================

/// Default log level
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Environment variable overriding the log filter
pub const LOG_FILTER_ENV: &str = "MODWIRE_LOG";

/// Maximum number of rotated log files to keep
pub const LOG_MAX_FILES: usize = 5;

/// File name prefix used when the configured log path has no stem
pub const DEFAULT_LOG_FILE_PREFIX: &str = "modwire";
