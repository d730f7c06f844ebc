//! Application lifecycle phases
//!
//! ```text
//! Init ──► Resolve ──► Freeze ──► Serve
//!   │         │          │          │
//!   └─────────┴──────────┴──────────┴──► Closed
//! ```
//!
//! Phases only move forward. Registration happens in `Init`, dynamic
//! modules are resolved in `Resolve`, the registry is frozen and the graph
//! built in `Freeze`, and providers are served in `Serve`.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

use modwire_domain::error::{Error, Result};
use serde::Serialize;
use tracing::info;

/// Application lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum LifecyclePhase {
    /// Modules are being declared
    Init = 0,
    /// Dynamic modules are being resolved
    Resolve = 1,
    /// Registry frozen, graph being validated
    Freeze = 2,
    /// Providers are served
    Serve = 3,
    /// Shut down
    Closed = 4,
}

impl LifecyclePhase {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Init,
            1 => Self::Resolve,
            2 => Self::Freeze,
            3 => Self::Serve,
            _ => Self::Closed,
        }
    }

    /// Phase that follows this one on the success path
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Init => Some(Self::Resolve),
            Self::Resolve => Some(Self::Freeze),
            Self::Freeze => Some(Self::Serve),
            Self::Serve => Some(Self::Closed),
            Self::Closed => None,
        }
    }

    /// Whether moving from this phase to `target` is allowed
    pub fn can_advance_to(self, target: Self) -> bool {
        self.next() == Some(target) || (target == Self::Closed && self != Self::Closed)
    }
}

impl fmt::Display for LifecyclePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Init => "init",
            Self::Resolve => "resolve",
            Self::Freeze => "freeze",
            Self::Serve => "serve",
            Self::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Thread-safe, forward-only phase tracker
#[derive(Debug)]
pub struct PhaseTracker {
    phase: AtomicU8,
}

impl PhaseTracker {
    /// Start in [`LifecyclePhase::Init`]
    pub fn new() -> Self {
        Self {
            phase: AtomicU8::new(LifecyclePhase::Init as u8),
        }
    }

    /// Current phase
    pub fn current(&self) -> LifecyclePhase {
        LifecyclePhase::from_u8(self.phase.load(Ordering::SeqCst))
    }

    /// Move to `target`
    pub fn advance(&self, target: LifecyclePhase) -> Result<()> {
        let current = self.current();
        if !current.can_advance_to(target) {
            return Err(Error::lifecycle(format!(
                "cannot move from {current} to {target}"
            )));
        }
        self.phase
            .compare_exchange(
                current as u8,
                target as u8,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .map_err(|actual| {
                Error::lifecycle(format!(
                    "phase changed concurrently to {}",
                    LifecyclePhase::from_u8(actual)
                ))
            })?;

        info!(from = %current, to = %target, "Lifecycle phase changed");
        Ok(())
    }

    /// Fail unless the current phase is `expected`
    pub fn require(&self, expected: LifecyclePhase) -> Result<()> {
        let current = self.current();
        if current != expected {
            return Err(Error::lifecycle(format!(
                "operation requires phase {expected}, current phase is {current}"
            )));
        }
        Ok(())
    }
}

impl Default for PhaseTracker {
    fn default() -> Self {
        Self::new()
    }
}
