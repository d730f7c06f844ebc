//! Application composition root
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`bootstrap`] | [`ApplicationBuilder`], [`AppContext`] and [`init_app`] |
//! | [`lifecycle`] | Forward-only lifecycle phases |

pub mod bootstrap;
pub mod lifecycle;

pub use bootstrap::{AppContext, ApplicationBuilder, init_app};
pub use lifecycle::{LifecyclePhase, PhaseTracker};
