//! Container configuration types

use modwire_domain::value_objects::ConflictPolicy;
use serde::{Deserialize, Serialize};

/// Provider container configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerConfig {
    /// Tie-break when several imports export the same token
    pub conflict_policy: ConflictPolicy,

    /// Construct every singleton at startup instead of on first request
    pub eager: bool,
}
